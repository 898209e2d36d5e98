//! Clio OAuth authentication library
//!
//! Provides authorization-URL construction with CSRF state nonces, token
//! exchange/refresh against Clio's token endpoint, credential persistence,
//! and the `AuthSession` state machine that keeps an access token valid
//! across calls. This crate is a standalone library with no dependency on
//! the service binary — it can be tested and used independently.
//!
//! Credential flow:
//! 1. Service calls `AuthSession::begin_authorization()` and sends the
//!    user to the returned URL
//! 2. Clio redirects back to the registered URI with `code` + `state`
//! 3. Service calls `AuthSession::complete_authorization()` to verify the
//!    state nonce, exchange the code, and persist the credential
//! 4. `AuthSession::access_token()` serves every API call thereafter,
//!    refreshing through the token endpoint when expiry is near
//! 5. A rejected refresh clears the store; the user authorizes again

pub mod authorize;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use authorize::{build_authorization_url, generate_state};
pub use config::OAuthConfig;
pub use constants::*;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use session::{AuthSession, SessionState};
pub use token::{TokenResponse, exchange_code, refresh_token};
