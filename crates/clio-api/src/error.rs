//! Error types for API fetch operations

/// Errors from paginated API fetches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal non-2xx response (other than the single retried 401).
    /// The body is carried verbatim for the caller to surface.
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("authentication error: {0}")]
    Auth(#[from] clio_auth::Error),

    #[error("response decode error: {0}")]
    Decode(String),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
