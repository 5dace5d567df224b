//! HTTP plumbing shared by the token endpoint and wrapped API calls

use serde_json::Value;

use crate::constants::{API_BASE_URL, AUTHORIZE_URL};
use crate::error::{Error, Result};

/// Provider endpoint roots.
///
/// Defaults to the public X API; overridable so the wire paths can run
/// against a local server in tests or a mock deployment.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Root for the token endpoint, identity endpoint, and wrapped calls
    pub api_base: String,
    /// Browser-navigated authorization endpoint
    pub authorize_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE_URL.to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at a non-default API base (the authorize URL keeps
    /// its public default).
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    /// Absolute URL for an API path such as `/oauth2/token`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}

/// Map a transport failure into the taxonomy, keeping elapsed deadlines
/// distinct from connection-level errors.
pub fn transport_error(err: reqwest::Error, context: &str) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{context}: {err}"))
    } else {
        Error::Http(format!("{context}: {err}"))
    }
}

/// Pass a successful response through; turn any non-success status into a
/// normalized [`Error::Api`] carrying status, request path, and the decoded
/// body. Non-JSON error bodies decode to `Value::Null`.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let path = response.url().path().to_string();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Err(Error::api(status.as_u16(), path, body))
}
