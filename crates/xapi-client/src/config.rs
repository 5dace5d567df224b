//! Application configuration loading
//!
//! TOML config for apps embedding the client. The client secret is never
//! stored in the TOML itself: it resolves from the `XAPI_CLIENT_SECRET`
//! env var or from `client_secret_file`, in that order, and lands in a
//! redacting [`Secret`] wrapper.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::Deserialize;

use xapi_auth::AppCredentials;

/// App-level OAuth configuration.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// XAPI_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Callback registered with the provider for this app
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_scopes() -> Vec<String> {
    ["tweet.read", "users.read", "offline.access"]
        .map(String::from)
        .to_vec()
}

fn default_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from a TOML file, then overlay the environment.
    ///
    /// Secret resolution order:
    /// 1. XAPI_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)?;

        if config.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        if !config.redirect_uri.starts_with("http://")
            && !config.redirect_uri.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {}",
                config.redirect_uri
            )));
        }
        if config.scopes.is_empty() {
            return Err(common::Error::Config(
                "scopes must not be empty; the refresh flow needs offline.access".into(),
            ));
        }
        if config.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        // Resolve the secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("XAPI_CLIENT_SECRET") {
            config.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client_secret = Some(Secret::new(secret));
            }
        }

        if let Some(ref secret) = config.client_secret
            && secret.is_empty()
        {
            return Err(common::Error::Config(
                "client secret resolved to an empty value".into(),
            ));
        }

        Ok(config)
    }

    /// Space-joined scope string for the authorize URL.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    /// App credentials for exchange and refresh, present only when a secret
    /// was resolved.
    pub fn app_credentials(&self) -> Option<AppCredentials> {
        self.client_secret.as_ref().map(|secret| AppCredentials {
            client_id: self.client_id.clone(),
            client_secret: secret.clone(),
        })
    }
}
