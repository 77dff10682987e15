//! Classification of gateway-reported payment statuses.
//!
//! Callbacks and browser redirects both carry a loosely named status
//! parameter. Both are reduced to a [`StatusBucket`] by the same pure lookup.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Keys consulted in order, first present and non-blank wins.
pub const STATUS_KEYS: [&str; 3] = ["payment_status", "transaction_status", "status"];

const FAILURE_STATUSES: &[&str] = &["failed", "failure", "error", "cancel", "cancelled"];
const SUCCESS_STATUSES: &[&str] = &["success", "settlement", "capture"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    Success,
    Failure,
    Unknown,
}

impl StatusBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Success => "success",
            StatusBucket::Failure => "failure",
            StatusBucket::Unknown => "unknown",
        }
    }
}

pub fn classify(status: Option<&str>) -> StatusBucket {
    let status = match status {
        Some(s) => s.trim().to_ascii_lowercase(),
        None => return StatusBucket::Unknown,
    };
    if FAILURE_STATUSES.contains(&status.as_str()) {
        StatusBucket::Failure
    } else if SUCCESS_STATUSES.contains(&status.as_str()) {
        StatusBucket::Success
    } else {
        StatusBucket::Unknown
    }
}

/// Flat string parameters received from the gateway, from a JSON body, a form
/// body or a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFields(HashMap<String, String>);

impl StatusFields {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    /// Keeps the scalar members of a JSON object. Anything else yields no fields.
    pub fn from_json(value: &Value) -> Self {
        let fields = match value.as_object() {
            Some(object) => object
                .iter()
                .filter_map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((key.clone(), value))
                })
                .collect(),
            None => HashMap::new(),
        };
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        STATUS_KEYS
            .iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.trim().is_empty())
    }

    pub fn order_id(&self) -> Option<&str> {
        self.get("order_id").filter(|v| !v.trim().is_empty())
    }
}

/// First status found across `sources`, consulted in the given order.
pub fn extract_status<'a>(sources: &[&'a StatusFields]) -> Option<&'a str> {
    sources.iter().find_map(|fields| fields.status())
}
