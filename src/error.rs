use thiserror::Error;

/// Error taxonomy for API calls and configuration loading
///
/// Only `Authentication` and `ConfigParse` are fatal for a run. Everything
/// else is recorded at the per-mapping or per-repository boundary and
/// processing continues.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Token is missing, invalid, or rejected. No further API call can succeed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A repository or branch named in the configuration does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// GitHub signalled rate limiting. Retried once before being recorded.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Transport-level or otherwise unclassified API failure
    #[error("network error: {0}")]
    Network(String),

    /// The configuration file is malformed. Nothing is processed.
    #[error("config parse error: {0}")]
    ConfigParse(String),
}

impl Error {
    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::ConfigParse(_))
    }
}
