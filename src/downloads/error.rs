use super::resend::ResendDenied;
use thiserror::Error;

/// Failures of the download-link lifecycle.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Download link has expired")]
    Expired,

    #[error("Format {0} is not available for this book")]
    FormatUnavailable(String),

    #[error("No file is configured for format {0}")]
    UnsupportedFormat(String),

    #[error("Book file is missing from storage")]
    FileNotFound,

    #[error(transparent)]
    Throttled(#[from] ResendDenied),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DownloadError {
    /// Stable machine readable name, used in API responses and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::InvalidRequest(_) => "InvalidRequest",
            DownloadError::NotFound(_) => "NotFound",
            DownloadError::Expired => "Expired",
            DownloadError::FormatUnavailable(_) => "FormatUnavailable",
            DownloadError::UnsupportedFormat(_) => "UnsupportedFormat",
            DownloadError::FileNotFound => "FileNotFound",
            DownloadError::Throttled(_) => "ResendThrottled",
            DownloadError::Internal(_) => "Internal",
        }
    }
}
