//! OAuth client application settings
//!
//! Identifies this application to Clio: the client ID and secret from the
//! firm's developer-portal registration plus the redirect URI registered
//! with it. Endpoint URLs default to Clio's hosted servers and are plain
//! public fields so tests can substitute a local mock endpoint.

use common::Secret;

use crate::constants::{AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};

/// OAuth client configuration for the Clio connection.
///
/// The client secret is wrapped in `Secret` so a logged or debug-printed
/// config never exposes it.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Redirect URI registered with the Clio application
    pub redirect_uri: String,
    /// Authorization endpoint (defaults to Clio's hosted page)
    pub authorize_url: String,
    /// Token endpoint (defaults to Clio's hosted endpoint)
    pub token_url: String,
}

impl OAuthConfig {
    /// Config pointing at Clio's hosted OAuth endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret: Secret::new(client_secret),
            redirect_uri,
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }
}
