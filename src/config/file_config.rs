use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub files_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub base_url: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<String>,
    pub session_secret: Option<String>,

    // Feature configs
    pub downloads: Option<DownloadsConfig>,
    pub payment_gateway: Option<PaymentGatewayConfig>,
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DownloadsConfig {
    pub link_ttl_hours: Option<i64>,
    pub api_prefix: Option<String>,
    pub send_email_on_issue: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PaymentGatewayConfig {
    pub url: Option<String>,
    pub create_timeout_secs: Option<u64>,
    pub update_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MailConfig {
    /// Well-known service name ("gmail", "outlook", ...) or "custom".
    pub service: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
