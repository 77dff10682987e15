use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payment intent sent by the storefront page, forwarded to the gateway as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Fields the gateway accepts that we do not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw reply from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayment {
    pub redirect_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lookup(body: &Value, keys: &[&str]) -> Option<String> {
    let content = body.get("content");
    keys.iter().find_map(|key| {
        content
            .and_then(|c| c.get(key))
            .and_then(as_text)
            .or_else(|| body.get(key).and_then(as_text))
    })
}

impl CreatedPayment {
    /// Pulls the redirect URL and order id out of the gateway's create reply,
    /// whether wrapped in `content` or not.
    pub fn from_gateway_body(body: &Value, fallback_order_id: Option<&str>) -> Option<Self> {
        let redirect_url = lookup(body, &["redirectUrl", "redirect_url"])?;
        let order_id = lookup(body, &["order_id", "orderId"])
            .or_else(|| fallback_order_id.map(str::to_string));
        Some(Self {
            redirect_url,
            order_id,
        })
    }
}
