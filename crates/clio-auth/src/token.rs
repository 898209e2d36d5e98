//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (initial OAuth flow completion)
//! 2. Token refresh (request-time refresh of an expiring access token)
//!
//! Both operations POST form-encoded grants to the configured token
//! endpoint. This is a confidential-client setup: the client secret goes
//! in both grant bodies, and `redirect_uri` only in the code exchange.

use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. The caller
/// converts this to an absolute unix millisecond timestamp when storing
/// the credential. `refresh_token` may be absent on refresh responses;
/// the session keeps the previous one in that case.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

/// Exchange an authorization code for tokens (initial OAuth flow).
///
/// This is the second step of the flow: the user has authorized in their
/// browser and the callback delivered the code. The client secret plus
/// the registered `redirect_uri` prove the request comes from this
/// application.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::ExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::CredentialParse(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// Called by the session when the stored token is inside the expiry
/// margin, and after an API request 401s despite an apparently valid
/// token.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // A dead refresh token comes back as 401/403, or as the OAuth2
        // `invalid_grant` error with status 400
        let code = status.as_u16();
        if code == 401 || code == 403 || (code == 400 && body.contains("invalid_grant")) {
            return Err(Error::ReauthorizationRequired(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::ExchangeFailed {
            status: code,
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::CredentialParse(format!("invalid refresh response: {e}")))
}
