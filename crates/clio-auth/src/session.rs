//! AuthSession state machine
//!
//! Owns the OAuth client config and the credential store, and exposes the
//! operations the rest of the workspace calls:
//! - `begin_authorization` / `complete_authorization` for the initial grant
//! - `access_token` for every API call thereafter
//! - `refresh_after_unauthorized` when a request 401s despite an
//!   apparently valid token (clock skew or remote revocation)
//!
//! Refresh is single-flight: a Mutex guards the token-endpoint section,
//! and a caller that waited re-checks the store after acquiring the lock,
//! so the winner's refresh serves every waiter without a duplicate grant.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authorize::{build_authorization_url, generate_state};
use crate::config::OAuthConfig;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::token::{self, TokenResponse};

/// In-memory state for an in-progress authorization flow.
///
/// Created by `begin_authorization` and consumed by
/// `complete_authorization`. Expires after `STATE_EXPIRY_SECS` so an
/// abandoned flow cannot be completed days later.
struct PendingFlow {
    state: String,
    created_at: Instant,
}

/// Maximum age of a pending authorization flow before it expires.
const STATE_EXPIRY_SECS: u64 = 600; // 10 minutes

/// Refresh when the stored token expires within this margin.
const EXPIRY_MARGIN_MILLIS: u64 = 30_000;

/// Observable session state, derived from stored data at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No credential and no flow in progress
    Unauthenticated,
    /// Authorization URL issued, waiting for the callback
    PendingAuthorization,
    /// Credential on hand with comfortable time to expiry
    Authorized,
    /// Credential present but past (or within the margin of) expiry
    Expired,
}

impl SessionState {
    /// State label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::PendingAuthorization => "pending_authorization",
            SessionState::Authorized => "authorized",
            SessionState::Expired => "expired",
        }
    }
}

/// OAuth session over a pluggable credential store.
pub struct AuthSession {
    config: OAuthConfig,
    store: Arc<dyn CredentialStore>,
    http_client: reqwest::Client,
    pending: Mutex<Option<PendingFlow>>,
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    pub fn new(
        config: OAuthConfig,
        store: Arc<dyn CredentialStore>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            store,
            http_client,
            pending: Mutex::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current state, derived from the stored credential and pending flow.
    /// A stored credential takes precedence over an abandoned flow.
    pub async fn state(&self) -> SessionState {
        if let Ok(Some(credential)) = self.store.load().await {
            if credential.expires_at > now_millis() + EXPIRY_MARGIN_MILLIS {
                return SessionState::Authorized;
            }
            return SessionState::Expired;
        }
        let pending = self.pending.lock().await;
        let active = pending
            .as_ref()
            .is_some_and(|flow| flow.created_at.elapsed().as_secs() < STATE_EXPIRY_SECS);
        if active {
            SessionState::PendingAuthorization
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Start an authorization flow.
    ///
    /// Generates a fresh state nonce, stashes it (replacing any prior
    /// pending flow), and returns the URL to send the user to.
    pub async fn begin_authorization(&self) -> String {
        let state = generate_state();
        let url = build_authorization_url(&self.config, &state);

        let mut pending = self.pending.lock().await;
        *pending = Some(PendingFlow {
            state,
            created_at: Instant::now(),
        });
        info!("authorization flow initiated");

        url
    }

    /// Complete an authorization flow with the callback's `code` + `state`.
    ///
    /// The pending nonce is consumed on the way in: pass or fail, a second
    /// callback for the same flow is a state mismatch. On a verified state
    /// the code is exchanged and the credential persisted.
    pub async fn complete_authorization(&self, code: &str, returned_state: &str) -> Result<()> {
        let flow = {
            let mut pending = self.pending.lock().await;
            pending.take()
        };

        let Some(flow) = flow else {
            return Err(Error::StateMismatch(
                "no authorization flow in progress".into(),
            ));
        };

        if flow.created_at.elapsed() > Duration::from_secs(STATE_EXPIRY_SECS) {
            return Err(Error::StateMismatch(
                "authorization flow expired (>10 minutes), restart authorization".into(),
            ));
        }

        if flow.state != returned_state {
            warn!("callback state does not match the pending flow");
            return Err(Error::StateMismatch(
                "callback state does not match the pending flow".into(),
            ));
        }

        let response = token::exchange_code(&self.http_client, &self.config, code).await?;
        self.store
            .save(credential_from_response(response, None))
            .await?;
        info!("authorization complete, credential stored");
        Ok(())
    }

    /// A valid access token for API calls.
    ///
    /// Returns the stored token when it is comfortably inside its lifetime
    /// (zero network calls). Within 30 seconds of expiry, refreshes
    /// through the token endpoint first. A rejected refresh clears the
    /// store: only a fresh authorization can recover.
    pub async fn access_token(&self) -> Result<String> {
        let credential = self
            .store
            .load()
            .await?
            .ok_or_else(|| Error::ReauthorizationRequired("no stored credential".into()))?;

        if credential.expires_at > now_millis() + EXPIRY_MARGIN_MILLIS {
            return Ok(credential.access_token);
        }

        debug!("access token inside expiry margin, refreshing");
        self.refresh_credential(None).await
    }

    /// Force a refresh after a request was rejected with the given token.
    ///
    /// If a concurrent caller already replaced it, the stored token is
    /// returned without another grant.
    pub async fn refresh_after_unauthorized(&self, stale_token: &str) -> Result<String> {
        self.refresh_credential(Some(stale_token)).await
    }

    /// Refresh the stored credential through the token endpoint.
    ///
    /// Serialized by `refresh_lock`. The double-check after acquiring the
    /// lock is what makes this single-flight: waiters observe the winner's
    /// persisted credential and skip their own grant. `stale_token` is the
    /// force-refresh dedup key; without it, freshness decides.
    async fn refresh_credential(&self, stale_token: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = self
            .store
            .load()
            .await?
            .ok_or_else(|| Error::ReauthorizationRequired("no stored credential".into()))?;

        let already_refreshed = match stale_token {
            Some(stale) => current.access_token != stale,
            None => current.expires_at > now_millis() + EXPIRY_MARGIN_MILLIS,
        };
        if already_refreshed {
            debug!("credential already refreshed by a concurrent caller");
            return Ok(current.access_token);
        }

        let Some(refresh) = current.refresh_token.clone() else {
            warn!("stored credential has no refresh token, clearing store");
            self.store.clear().await?;
            return Err(Error::ReauthorizationRequired(
                "stored credential has no refresh token".into(),
            ));
        };

        match token::refresh_token(&self.http_client, &self.config, &refresh).await {
            Ok(response) => {
                let credential = credential_from_response(response, Some(refresh));
                let access_token = credential.access_token.clone();
                self.store.save(credential).await?;
                metrics::counter!("oauth_token_refreshes_total", "outcome" => "success")
                    .increment(1);
                info!("access token refreshed");
                Ok(access_token)
            }
            Err(Error::ReauthorizationRequired(reason)) => {
                warn!(%reason, "refresh token rejected, clearing stored credential");
                metrics::counter!("oauth_token_refreshes_total", "outcome" => "rejected")
                    .increment(1);
                self.store.clear().await?;
                Err(Error::ReauthorizationRequired(reason))
            }
            // Transport and server-side failures leave the credential
            // untouched; a later caller retries the refresh
            Err(e) => {
                metrics::counter!("oauth_token_refreshes_total", "outcome" => "error")
                    .increment(1);
                Err(e)
            }
        }
    }
}

/// Convert a token response into a stored credential.
///
/// The response's `expires_in` seconds delta becomes an absolute unix
/// millisecond timestamp. A refresh response without a refresh token
/// keeps the previous one, so single-use rotation still works when the
/// server does send a new token.
fn credential_from_response(
    response: TokenResponse,
    previous_refresh: Option<String>,
) -> Credential {
    Credential {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or(previous_refresh),
        expires_at: now_millis() + response.expires_in * 1000,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use axum::routing::post;
    use tokio::net::TcpListener;

    use crate::credentials::MemoryCredentialStore;

    fn test_config(token_url: String) -> OAuthConfig {
        let mut config = OAuthConfig::new(
            "test-client-id".into(),
            "test-client-secret".into(),
            "http://localhost:8788/auth/callback".into(),
        );
        config.token_url = token_url;
        config
    }

    fn test_credential(access: &str, expires_at: u64) -> Credential {
        Credential {
            access_token: access.into(),
            refresh_token: Some("rt_current".into()),
            expires_at,
        }
    }

    fn future_expiry() -> u64 {
        now_millis() + 3_600_000
    }

    fn imminent_expiry() -> u64 {
        // Inside the 30-second margin but not yet past
        now_millis() + 10_000
    }

    /// Start a mock token endpoint counting hits and answering with the
    /// given status/body. The optional delay holds each grant open long
    /// enough for concurrent callers to pile up on the refresh lock.
    async fn start_token_endpoint(
        hits: Arc<AtomicUsize>,
        status: StatusCode,
        body: serde_json::Value,
        delay: Duration,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}/oauth/token");

        tokio::spawn(async move {
            let app = axum::Router::new().route(
                "/oauth/token",
                post(move || {
                    let hits = hits.clone();
                    let body = body.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(delay).await;
                        (status, axum::Json(body))
                    }
                }),
            );
            axum::serve(listener, app).await.unwrap();
        });

        url
    }

    fn refreshed_token_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at_new",
            "refresh_token": "rt_new",
            "expires_in": 3600
        })
    }

    fn session_with(store: Arc<dyn CredentialStore>, token_url: String) -> AuthSession {
        AuthSession::new(test_config(token_url), store, reqwest::Client::new())
    }

    fn query_param(url: &str, name: &str) -> String {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
            .unwrap_or_else(|| panic!("missing {name} in {url}"))
            .to_string()
    }

    async fn start_ok_endpoint(hits: Arc<AtomicUsize>) -> String {
        start_token_endpoint(hits, StatusCode::OK, refreshed_token_json(), Duration::ZERO).await
    }

    #[tokio::test]
    async fn valid_token_returned_without_network() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_ok_endpoint(hits.clone()).await;

        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", future_expiry()))
            .await
            .unwrap();
        let session = session_with(store, url);

        let token = session.access_token().await.unwrap();
        assert_eq!(token, "at_current");
        assert_eq!(
            hits.load(Ordering::SeqCst),
            0,
            "a comfortably valid token must not hit the token endpoint"
        );
    }

    #[tokio::test]
    async fn expiring_token_refreshed_exactly_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_ok_endpoint(hits.clone()).await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", imminent_expiry()))
            .await
            .unwrap();
        let session = session_with(store.clone(), url);

        let token = session.access_token().await.unwrap();
        assert_eq!(token, "at_new");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // New credential persisted wholesale
        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at_new");
        assert_eq!(stored.refresh_token.as_deref(), Some("rt_new"));
        assert!(stored.expires_at > now_millis() + EXPIRY_MARGIN_MILLIS);
        assert_eq!(session.state().await, SessionState::Authorized);
    }

    #[tokio::test]
    async fn rejected_refresh_clears_credential() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_token_endpoint(
            hits.clone(),
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"error": "invalid_token"}),
            Duration::ZERO,
        )
        .await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", imminent_expiry()))
            .await
            .unwrap();
        let session = session_with(store.clone(), url);

        let result = session.access_token().await;
        assert!(matches!(result, Err(Error::ReauthorizationRequired(_))));
        assert!(
            store.load().await.unwrap().is_none(),
            "a rejected refresh must clear the stored credential"
        );
        assert_eq!(session.state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn server_error_during_refresh_keeps_credential() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_token_endpoint(
            hits.clone(),
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": "try_again"}),
            Duration::ZERO,
        )
        .await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", imminent_expiry()))
            .await
            .unwrap();
        let session = session_with(store.clone(), url);

        let result = session.access_token().await;
        assert!(matches!(result, Err(Error::ExchangeFailed { status: 500, .. })));
        let stored = store.load().await.unwrap();
        assert_eq!(
            stored.unwrap().access_token,
            "at_current",
            "a transient refresh failure must not clear the credential"
        );
    }

    #[tokio::test]
    async fn missing_refresh_token_requires_reauthorization() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_ok_endpoint(hits.clone()).await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(Credential {
                access_token: "at_current".into(),
                refresh_token: None,
                expires_at: imminent_expiry(),
            })
            .await
            .unwrap();
        let session = session_with(store.clone(), url);

        let result = session.access_token().await;
        assert!(matches!(result, Err(Error::ReauthorizationRequired(_))));
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0, "nothing to send to the endpoint");
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_omitted() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_token_endpoint(
            hits.clone(),
            StatusCode::OK,
            serde_json::json!({"access_token": "at_new", "expires_in": 3600}),
            Duration::ZERO,
        )
        .await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", imminent_expiry()))
            .await
            .unwrap();
        let session = session_with(store.clone(), url);

        session.access_token().await.unwrap();
        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some("rt_current"),
            "a refresh response without a refresh token keeps the previous one"
        );
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let hits = Arc::new(AtomicUsize::new(0));
        // Hold each grant open so every caller reaches the refresh path
        let url = start_token_endpoint(
            hits.clone(),
            StatusCode::OK,
            refreshed_token_json(),
            Duration::from_millis(100),
        )
        .await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", imminent_expiry()))
            .await
            .unwrap();
        let session = Arc::new(session_with(store, url));

        let mut handles = vec![];
        for _ in 0..5 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.access_token().await }));
        }

        for h in handles {
            let token = h.await.unwrap().unwrap();
            assert_eq!(token, "at_new");
        }
        assert_eq!(
            hits.load(Ordering::SeqCst),
            1,
            "five concurrent callers must produce exactly one refresh grant"
        );
    }

    #[tokio::test]
    async fn forced_refresh_deduplicates_on_stale_token() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_ok_endpoint(hits.clone()).await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        // Token looks fresh but the remote rejected it
        store
            .save(test_credential("at_stale", future_expiry()))
            .await
            .unwrap();
        let session = session_with(store, url);

        let token = session.refresh_after_unauthorized("at_stale").await.unwrap();
        assert_eq!(token, "at_new");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Second caller reporting the same stale token gets the stored
        // replacement without another grant
        let token = session.refresh_after_unauthorized("at_stale").await.unwrap();
        assert_eq!(token, "at_new");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn complete_authorization_roundtrip() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_ok_endpoint(hits.clone()).await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store.clone(), url);

        assert_eq!(session.state().await, SessionState::Unauthenticated);
        let auth_url = session.begin_authorization().await;
        assert_eq!(session.state().await, SessionState::PendingAuthorization);

        let state = query_param(&auth_url, "state");
        session
            .complete_authorization("auth-code-1", &state)
            .await
            .unwrap();

        assert_eq!(session.state().await, SessionState::Authorized);
        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at_new");
    }

    #[tokio::test]
    async fn complete_authorization_rejects_wrong_state() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store, "http://127.0.0.1:1/oauth/token".into());

        let auth_url = session.begin_authorization().await;
        let real_state = query_param(&auth_url, "state");

        let result = session
            .complete_authorization("code", "forged-state")
            .await;
        assert!(matches!(result, Err(Error::StateMismatch(_))));

        // The nonce was consumed: even the real state no longer completes
        let result = session.complete_authorization("code", &real_state).await;
        assert!(
            matches!(result, Err(Error::StateMismatch(_))),
            "a consumed flow must not be completable"
        );
    }

    #[tokio::test]
    async fn complete_authorization_without_flow_is_a_mismatch() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store, "http://127.0.0.1:1/oauth/token".into());

        let result = session.complete_authorization("code", "any-state").await;
        assert!(matches!(result, Err(Error::StateMismatch(_))));
    }

    #[tokio::test]
    async fn complete_authorization_rejects_expired_flow() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store, "http://127.0.0.1:1/oauth/token".into());

        // Manually insert an expired pending flow
        {
            let mut pending = session.pending.lock().await;
            *pending = Some(PendingFlow {
                state: "old-state".into(),
                created_at: Instant::now() - Duration::from_secs(STATE_EXPIRY_SECS + 60),
            });
        }

        let result = session.complete_authorization("code", "old-state").await;
        match result {
            Err(Error::StateMismatch(message)) => {
                assert!(message.contains("expired"), "got: {message}");
            }
            other => panic!("expected StateMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_failure_leaves_store_empty() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = start_token_endpoint(
            hits.clone(),
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "invalid_request"}),
            Duration::ZERO,
        )
        .await;

        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store.clone(), url);

        let auth_url = session.begin_authorization().await;
        let state = query_param(&auth_url, "state");
        let result = session.complete_authorization("bad-code", &state).await;

        match result {
            Err(Error::ExchangeFailed { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_request"));
            }
            other => panic!("expected ExchangeFailed, got {other:?}"),
        }
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(session.state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn state_reports_expired_credential() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        store
            .save(test_credential("at_current", now_millis().saturating_sub(1000)))
            .await
            .unwrap();
        let session = session_with(store, "http://127.0.0.1:1/oauth/token".into());

        assert_eq!(session.state().await, SessionState::Expired);
        assert_eq!(session.state().await.label(), "expired");
    }

    #[tokio::test]
    async fn access_token_without_credential_requires_reauthorization() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = session_with(store, "http://127.0.0.1:1/oauth/token".into());

        let result = session.access_token().await;
        assert!(matches!(result, Err(Error::ReauthorizationRequired(_))));
    }
}
