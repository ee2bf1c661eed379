use thiserror::Error;

/// OCI Purge error types
#[derive(Error, Debug)]
pub enum PurgeError {
    /// Missing or invalid setting, detected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry rejected the credentials (401/403)
    #[error("Unauthorized: {url}")]
    Unauthorized { url: String },

    /// Registry answered 404
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, TLS, timeout or body read failure
    #[error("Network error: {url} - {message}")]
    Network { url: String, message: String },

    /// Response body was not the expected JSON document
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An instant could not be parsed as RFC 3339
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Every creation-date fallback was exhausted
    #[error("No creation date for {repository}:{reference}")]
    DateNotFound {
        repository: String,
        reference: String,
    },

    /// Manifest response carried no Docker-Content-Digest header
    #[error("No digest for {repository}:{reference}")]
    DigestMissing {
        repository: String,
        reference: String,
    },

    /// Manifest list / image index had no entry usable by the selected strategy
    #[error("Manifest list error: {0}")]
    ManifestList(String),
}

impl PurgeError {
    /// True for errors raised by the HTTP transport (status or network failures).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PurgeError::Unauthorized { .. }
                | PurgeError::NotFound { .. }
                | PurgeError::HttpStatus { .. }
                | PurgeError::Network { .. }
        )
    }

    /// True when no creation instant could be determined for an artifact.
    ///
    /// Unparseable timestamps and unusable manifest lists count as a missing
    /// date rather than as an outright error.
    pub fn is_date_resolution_failure(&self) -> bool {
        matches!(
            self,
            PurgeError::DateNotFound { .. }
                | PurgeError::InvalidTimestamp { .. }
                | PurgeError::ManifestList(_)
        )
    }
}

impl From<serde_json::Error> for PurgeError {
    fn from(err: serde_json::Error) -> Self {
        PurgeError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for PurgeError {
    fn from(err: regex::Error) -> Self {
        PurgeError::Config(format!("invalid filter pattern: {}", err))
    }
}

/// Result type alias for OCI Purge operations
pub type Result<T> = std::result::Result<T, PurgeError>;
