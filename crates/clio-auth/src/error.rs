//! Error types for OAuth authentication operations

/// Errors from OAuth authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Callback `state` missing, expired, or not matching the pending
    /// flow. Fatal for that flow: the caller restarts authorization.
    #[error("state mismatch: {0}")]
    StateMismatch(String),

    /// Token endpoint rejected a grant with a non-2xx response.
    #[error("token exchange failed ({status}): {body}")]
    ExchangeFailed { status: u16, body: String },

    /// No usable credential and no way to refresh one. Only a fresh
    /// authorization flow can recover.
    #[error("reauthorization required: {0}")]
    ReauthorizationRequired(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
