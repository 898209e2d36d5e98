//! Authorization-URL construction with CSRF state nonces
//!
//! The `state` parameter ties a callback to the flow that initiated it: a
//! random nonce goes out with the authorization URL and must come back
//! unchanged. Clio's grant is a confidential-client code exchange (the
//! client secret authenticates the token request), so there is no PKCE
//! challenge; the state nonce is the CSRF defense.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::config::OAuthConfig;
use crate::constants::SCOPES;

/// Generate a cryptographically random state nonce.
///
/// Produces 32 random bytes encoded as URL-safe base64 (no padding),
/// 43 characters.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the full authorization URL with all required OAuth parameters.
///
/// The authorization server returns `state` unchanged in the callback;
/// `AuthSession::complete_authorization` compares it against the pending
/// flow before exchanging the code.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        config.authorize_url,
        config.client_id,
        urlencoded(&config.redirect_uri),
        urlencoded(SCOPES),
        state,
    )
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
}
