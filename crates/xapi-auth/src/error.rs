//! Closed error taxonomy for credential and request operations
//!
//! A tagged enum rather than an exception hierarchy: callers pattern-match
//! on the variant to distinguish recoverable failures (a rejected call, a
//! timeout) from terminal ones (a credential set that can only be replaced
//! by a new authorization flow).

use serde_json::Value;

/// Errors from credential-lifecycle and authorized-request operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller misuse, detected before any network call.
    #[error("{0}")]
    User(String),

    /// Transport-level failure (connect, TLS, read, decode).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A configured deadline elapsed. Kept distinct from `Http` so callers
    /// can treat cancellation differently from connection failures.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-success response from the provider. Never retried automatically.
    #[error("API error [{status}] at {path}: {message}")]
    Api {
        status: u16,
        path: String,
        /// Normalized from the provider's error envelope, see [`Error::api`].
        message: String,
        /// Decoded response body, `Value::Null` when it was not JSON.
        body: Value,
    },

    /// The credential set fails a refresh precondition and can never be
    /// refreshed: app credentials, the refresh token, or the issuance
    /// timestamp is missing.
    #[error("credentials not refreshable: {reason}")]
    NonRefreshable { reason: String },

    /// The refresh token aged past its absolute lifetime window. The end
    /// user must redo the full authorization flow.
    #[error("refresh token expired at epoch {expired_at}")]
    ExpiredRefreshToken { expired_at: u64 },
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::Api`] from a non-success response, collapsing the
    /// provider's error envelope into one message. Understands both envelope
    /// shapes the API emits: `{"errors": [{title, detail}, ..]}` and a bare
    /// `{title, detail, status}` problem object.
    pub fn api(status: u16, path: impl Into<String>, body: Value) -> Self {
        let message = normalize_error_body(&body);
        Error::Api {
            status,
            path: path.into(),
            message,
            body,
        }
    }

    /// Whether this error means the credential set is unrecoverable without
    /// a fresh authorization-code flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::NonRefreshable { .. } | Error::ExpiredRefreshToken { .. }
        )
    }
}

fn normalize_error_body(body: &Value) -> String {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let parts: Vec<String> = errors.iter().map(title_and_detail).collect();
        if !parts.is_empty() {
            return parts.join(", ");
        }
    }
    if body.get("title").is_some() {
        return title_and_detail(body);
    }
    "Unknown error".to_string()
}

fn title_and_detail(entry: &Value) -> String {
    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error");
    match entry.get("detail").and_then(Value::as_str) {
        Some(detail) => format!("{title} ({detail})"),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_error_list() {
        let body = json!({
            "errors": [
                {"title": "Not Found Error", "detail": "Could not find user"},
                {"title": "Forbidden", "detail": "Not authorized"}
            ]
        });
        let err = Error::api(404, "/users/me", body);
        match err {
            Error::Api {
                status,
                path,
                message,
                ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(path, "/users/me");
                assert_eq!(
                    message,
                    "Not Found Error (Could not find user), Forbidden (Not authorized)"
                );
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn normalizes_single_problem_object() {
        let body = json!({"title": "Unauthorized", "detail": "Bad token", "status": 401});
        let err = Error::api(401, "/oauth2/token", body);
        match err {
            Error::Api { message, .. } => assert_eq!(message, "Unauthorized (Bad token)"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_detail_keeps_title_only() {
        let body = json!({"errors": [{"title": "Rate limit exceeded"}]});
        let err = Error::api(429, "/posts", body);
        match err {
            Error::Api { message, .. } => assert_eq!(message, "Rate limit exceeded"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_body_is_unknown_error() {
        for body in [json!({"foo": "bar"}), json!(null), json!("oops")] {
            let err = Error::api(500, "/posts", body);
            match err {
                Error::Api { message, .. } => assert_eq!(message, "Unknown error"),
                other => panic!("expected Api error, got {other:?}"),
            }
        }
    }

    #[test]
    fn display_carries_status_and_path() {
        let err = Error::api(429, "/usage/tweets", json!({"title": "Too Many Requests"}));
        assert_eq!(
            err.to_string(),
            "API error [429] at /usage/tweets: Too Many Requests"
        );
    }

    #[test]
    fn terminal_classification() {
        assert!(
            Error::NonRefreshable {
                reason: "no refresh token".into()
            }
            .is_terminal()
        );
        assert!(Error::ExpiredRefreshToken { expired_at: 1 }.is_terminal());
        assert!(!Error::User("bad argument".into()).is_terminal());
        assert!(!Error::api(500, "/posts", Value::Null).is_terminal());
        assert!(!Error::Timeout("api request".into()).is_terminal());
    }
}
