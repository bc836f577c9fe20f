// errors.rs
use thiserror::Error;

/// Everything that can abort a run. Per-row parse failures are not here:
/// the merger counts and skips them.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("token page unavailable: {0}")]
    TokenNotFound(String),

    #[error("export request failed (HTTP {status}): {excerpt}")]
    Fetch { status: u16, excerpt: String },

    #[error("could not write output: {0}")]
    Write(String),
}

impl ScrapeError {
    /// Pipeline stage the error belongs to, for the operator-facing message.
    pub fn stage(&self) -> &'static str {
        match self {
            ScrapeError::Configuration(_) => "settings",
            ScrapeError::Authentication(_) => "login",
            ScrapeError::Network(_) | ScrapeError::Timeout(_) => "network",
            ScrapeError::TokenNotFound(_) => "token",
            ScrapeError::Fetch { .. } => "export",
            ScrapeError::Write(_) => "write",
        }
    }

    /// Errors worth another attempt under the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Network(_) | ScrapeError::Timeout(_) | ScrapeError::Fetch { .. }
        )
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout(e.to_string())
        } else {
            ScrapeError::Network(e.to_string())
        }
    }
}
