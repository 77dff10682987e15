/// Builds redemption paths and absolute URLs from a token.
#[derive(Debug, Clone)]
pub struct DownloadLinks {
    base_url: String,
    api_prefix: String,
}

impl DownloadLinks {
    pub fn new(base_url: &str, api_prefix: &str) -> Self {
        let api_prefix = api_prefix.trim_end_matches('/');
        let api_prefix = if api_prefix.is_empty() || api_prefix.starts_with('/') {
            api_prefix.to_string()
        } else {
            format!("/{}", api_prefix)
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix,
        }
    }

    pub fn path(&self, token: &str) -> String {
        format!("{}/downloads/download/{}", self.api_prefix, token)
    }

    pub fn url(&self, token: &str) -> String {
        format!("{}{}", self.base_url, self.path(token))
    }

    /// Absolute URL for a previously stored link path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
