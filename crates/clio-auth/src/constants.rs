//! Clio OAuth constants
//!
//! Default endpoints for Clio's hosted OAuth flow. These are the same for
//! every installation; the client ID and secret are per-firm registrations
//! and come from configuration. `OAuthConfig` carries the endpoints as
//! overridable defaults so tests can point at a local mock server.

/// Authorization endpoint where the user grants access
pub const AUTHORIZE_ENDPOINT: &str = "https://app.clio.com/oauth/authorize";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://app.clio.com/oauth/token";

/// OAuth scopes requested during authorization.
/// `offline_access` makes the token endpoint issue a refresh token;
/// without it the session cannot outlive the first access token.
pub const SCOPES: &str = "contacts.read matters.read offline_access";
