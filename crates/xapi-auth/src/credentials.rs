//! Credential data model
//!
//! `Credentials` is the token-endpoint payload plus a locally stamped
//! issuance timestamp. The provider's own notion of issuance time is never
//! trusted: `created_at` is always `now - backdate` on this side of the
//! wire, so `expires_at = created_at + expires_in` holds for any value the
//! subsystem hands out.

use common::Secret;
use serde::{Deserialize, Serialize};

/// One account's OAuth credential set.
///
/// Decoded directly from the token endpoint (where `refresh_token` may be
/// absent and `created_at` always is), then stamped. A set without a
/// `refresh_token` or without `created_at` is usable until expiry but can
/// never be refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Expected constant "bearer"
    pub token_type: String,
    /// Seconds until the access token expires (delta from issuance)
    pub expires_in: u64,
    /// Opaque bearer token for API calls
    pub access_token: String,
    /// Space-separated granted scopes
    pub scope: String,
    /// Rotating single-use refresh token; absence means non-refreshable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Locally stamped issuance time, epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl Credentials {
    /// Absolute access-token expiry, epoch seconds. An unstamped set counts
    /// as issued at epoch 0 and is therefore always stale.
    pub fn expires_at(&self) -> u64 {
        self.created_at.unwrap_or(0) + self.expires_in
    }

    /// Whether the access token is still usable at `now`, with a safety
    /// margin so callers refresh slightly before true expiry.
    pub fn is_fresh(&self, now: u64, skew_secs: u64) -> bool {
        self.expires_at() > now + skew_secs
    }

    /// Stamp the issuance time as `now - backdate`. Called exactly once per
    /// acquisition or refresh, before the set is visible to anyone.
    pub fn stamp_created_at(&mut self, now: u64, backdate_secs: u64) {
        self.created_at = Some(now.saturating_sub(backdate_secs));
    }

    /// Absolute refresh-token expiry for a given lifetime window, or `None`
    /// when the set was never stamped.
    pub fn refresh_expires_at(&self, lifetime_secs: u64) -> Option<u64> {
        self.created_at.map(|created| created + lifetime_secs)
    }
}

/// Application-level OAuth credentials, required for code exchange and
/// token refresh. Both fields travel together by construction, so there is
/// no half-configured state to validate at call time.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl AppCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
        }
    }
}

/// Current unix time in whole seconds.
pub fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(expires_in: u64, created_at: Option<u64>) -> Credentials {
        Credentials {
            token_type: "bearer".into(),
            expires_in,
            access_token: "at_test".into(),
            scope: "tweet.read users.read offline.access".into(),
            refresh_token: Some("rt_test".into()),
            created_at,
        }
    }

    #[test]
    fn fresh_with_wide_margin() {
        // 200 seconds remaining, well past the 10 second skew
        let now = 1_700_000_000;
        let set = credentials(7200, Some(now - 7000));
        assert!(set.is_fresh(now, 10));
    }

    #[test]
    fn stale_inside_skew_window() {
        // 5 seconds remaining is inside the 10 second skew, treat as expired
        let now = 1_700_000_000;
        let set = credentials(7200, Some(now - 7195));
        assert!(!set.is_fresh(now, 10));
    }

    #[test]
    fn unstamped_set_is_always_stale() {
        let set = credentials(7200, None);
        assert_eq!(set.expires_at(), 7200);
        assert!(!set.is_fresh(1_700_000_000, 10));
    }

    #[test]
    fn stamp_backdates_against_clock_drift() {
        let now = 1_700_000_000;
        let mut set = credentials(7200, None);
        set.stamp_created_at(now, 10);
        assert_eq!(set.created_at, Some(now - 10));
        assert_eq!(set.expires_at(), now - 10 + 7200);
    }

    #[test]
    fn refresh_expiry_requires_stamp() {
        let set = credentials(7200, Some(1_700_000_000));
        assert_eq!(
            set.refresh_expires_at(15_552_000),
            Some(1_700_000_000 + 15_552_000)
        );
        assert_eq!(credentials(7200, None).refresh_expires_at(15_552_000), None);
    }

    #[test]
    fn decodes_token_endpoint_payload() {
        let json = r#"{
            "token_type": "bearer",
            "expires_in": 7200,
            "access_token": "at_abc",
            "scope": "tweet.read offline.access",
            "refresh_token": "rt_def"
        }"#;
        let set: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(set.access_token, "at_abc");
        assert_eq!(set.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(set.created_at, None);
    }

    #[test]
    fn decodes_payload_without_refresh_token() {
        let json = r#"{
            "token_type": "bearer",
            "expires_in": 7200,
            "access_token": "at_abc",
            "scope": "tweet.read"
        }"#;
        let set: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(set.refresh_token, None);
    }

    #[test]
    fn serializes_without_absent_options() {
        let set = credentials(7200, None);
        let mut stripped = set.clone();
        stripped.refresh_token = None;
        let json = serde_json::to_string(&stripped).unwrap();
        assert!(!json.contains("refresh_token"));
        assert!(!json.contains("created_at"));
    }

    #[test]
    fn app_credentials_redact_secret() {
        let app = AppCredentials::new("client-1", "hunter2");
        let debug = format!("{app:?}");
        assert!(debug.contains("client-1"));
        assert!(!debug.contains("hunter2"));
    }
}
