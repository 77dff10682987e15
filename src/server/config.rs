use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Public origin used to build absolute redemption URLs.
    pub base_url: String,
    pub api_prefix: String,
    pub link_ttl_hours: i64,
    pub send_email_on_issue: bool,
    /// HS256 secret for admin session tokens. Admin routes refuse every
    /// request when unset.
    pub session_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            base_url: "http://localhost:3001".to_string(),
            api_prefix: "/api".to_string(),
            link_ttl_hours: 24,
            send_email_on_issue: true,
            session_secret: None,
        }
    }
}
