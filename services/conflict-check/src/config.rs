//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret is loaded from the CLIO_CLIENT_SECRET env var
//! or client_secret_file, never stored in the TOML directly to avoid
//! leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub api: ApiSettings,
    pub server: ServerSettings,
}

/// Clio OAuth application settings
#[derive(Debug, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// CLIO_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Redirect URI registered with the Clio application
    pub redirect_uri: String,
    /// Where the credential JSON is persisted between runs
    #[serde(default = "default_credential_path")]
    pub credential_path: PathBuf,
}

/// Clio API fetch settings
#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Records per page; Clio caps this at 200
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Page cap per resource; hitting it yields a truncated corpus
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_base_url() -> String {
    clio_api::DEFAULT_BASE_URL.to_string()
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("clio-credential.json")
}

fn default_page_size() -> u32 {
    200
}

fn default_max_pages() -> u32 {
    25
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    100
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. CLIO_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.oauth.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        // Validate redirect_uri is a valid URL with http(s) scheme
        if !config.oauth.redirect_uri.starts_with("http://")
            && !config.oauth.redirect_uri.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {}",
                config.oauth.redirect_uri
            )));
        }

        if config.api.page_size == 0 || config.api.page_size > 200 {
            return Err(common::Error::Config(format!(
                "page_size must be between 1 and 200, got: {}",
                config.api.page_size
            )));
        }

        if config.api.max_pages == 0 {
            return Err(common::Error::Config(
                "max_pages must be greater than 0".into(),
            ));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        // Resolve the client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("CLIO_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("conflict-check.toml")
    }
}
