//! Credential storage for the OAuth token
//!
//! Manages the single active credential for the Clio connection. The
//! conflict screen authenticates as one firm user, so the store holds at
//! most one record and every save is a wholesale replace (last write wins).
//!
//! Two backends implement the same trait: a file-backed store whose writes
//! use atomic temp-file + rename to prevent corruption on crash, and an
//! in-memory store for tests and session-scoped deployments. Behavior is
//! identical apart from durability.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The stored OAuth credential.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute, not a
/// delta). Computed at storage time from `TokenResponse.expires_in`
/// (seconds delta) plus the current time. `refresh_token` is absent when
/// the authorization server did not issue one; refresh then fails over to
/// reauthorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token (Bearer token for API calls)
    pub access_token: String,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: Option<String>,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at: u64,
}

/// Pluggable persistence for the active credential.
///
/// `load` returns the last saved record, `save` replaces it wholesale,
/// `clear` removes it. Uses `Pin<Box<dyn Future>>` return types for
/// dyn-compatibility (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    /// The last saved credential, if any.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Credential>>> + Send + '_>>;

    /// Replace the stored credential.
    fn save(
        &self,
        credential: Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove the stored credential. A no-op when nothing is stored.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// File-backed credential store.
///
/// The file holds a single pretty-printed JSON record. The Mutex guards
/// the in-memory copy and serializes writers, so a reader never observes
/// a partial record; disk is rewritten on every save and clear.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<Option<Credential>>,
}

impl FileCredentialStore {
    /// Open a store at the given file path.
    ///
    /// A missing file is a clean empty state (cold start before the first
    /// authorization); the file is not created until the first save.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let credential: Credential = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), "loaded stored credential");
            Some(credential)
        } else {
            info!(path = %path.display(), "credential file not found, starting unauthenticated");
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Credential>>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.clone())
        })
    }

    fn save(
        &self,
        credential: Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            write_atomic(&self.path, &credential).await?;
            *state = Some(credential);
            debug!("credential saved");
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = None;
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => debug!(path = %self.path.display(), "credential file removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(format!("removing credential file: {e}"))),
            }
            Ok(())
        })
    }
}

/// In-memory credential store for tests and session-scoped deployments.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Credential>>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.clone())
        })
    }

    fn save(
        &self,
        credential: Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = Some(credential);
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = None;
            Ok(())
        })
    }
}

/// Write the credential to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains OAuth tokens.
async fn write_atomic(path: &Path, credential: &Credential) -> Result<()> {
    let json = serde_json::to_string_pretty(credential)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
