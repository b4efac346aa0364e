/// Shared error type used across all signalhouse crates.
///
/// Mirrors spec §7's error kinds. `retryable()` implements the advertised
/// retryability rule: only `Upstream` and `Timeout` are retryable.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal: {0}")]
    Internal(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Per spec §7: only upstream failures and timeouts are advertised
    /// as retryable; everything else is not.
    pub fn retryable(&self) -> bool {
        matches!(self, Error::Upstream(_) | Error::Timeout(_))
    }

    /// Render as the `{error, code?}` shape tool responses carry (§6).
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Upstream(_) => "upstream_failure",
            Error::Timeout(_) => "timeout",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal",
            Error::Io(_) => "internal",
            Error::Json(_) => "internal",
            Error::Config(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
