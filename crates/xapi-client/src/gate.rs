//! Credential cache and refresh gate
//!
//! Holds the single mutable credential set per client instance and decides,
//! before every authorized request, whether the cached access token is
//! still usable or must be refreshed. Readers always see a fully-old or
//! fully-new set. Refreshers are serialized: the provider rotates the
//! refresh token on every use, so two competing refresh calls would
//! invalidate each other; concurrent callers instead share the outcome of
//! the one in-flight refresh.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use xapi_auth::constants::{
    CREATED_AT_BACKDATE_SECS, EXPIRY_SKEW_SECS, REFRESH_TOKEN_LIFETIME_SECS,
};
use xapi_auth::{AppCredentials, Credentials, Endpoints, Error, Result, now_epoch, token};

use crate::rotate::RotationHook;

/// Named lifecycle tunables. The defaults match the public API's observed
/// behavior; none of them are load-bearing protocol constants.
#[derive(Debug, Clone)]
pub struct RefreshTuning {
    /// Margin added to `now` when judging access-token freshness
    pub expiry_skew_secs: u64,
    /// Backdate applied to locally stamped `created_at`
    pub created_at_backdate_secs: u64,
    /// Absolute refresh-token lifetime, measured from `created_at`
    pub refresh_token_lifetime_secs: u64,
}

impl Default for RefreshTuning {
    fn default() -> Self {
        Self {
            expiry_skew_secs: EXPIRY_SKEW_SECS,
            created_at_backdate_secs: CREATED_AT_BACKDATE_SECS,
            refresh_token_lifetime_secs: REFRESH_TOKEN_LIFETIME_SECS,
        }
    }
}

/// Lifecycle of the cached credential set.
///
/// Transitions:
/// - Valid → Refreshing (gate decided the set is stale)
/// - Refreshing → Valid (rotation committed, or the provider rejected the
///   call and the stale set stays usable for an explicit later retry)
/// - Refreshing → Terminal (a refresh precondition failed; only a new
///   authorization flow recovers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Valid,
    Refreshing,
    Terminal,
}

/// What a refresh needs once the preconditions hold.
#[derive(Debug)]
struct RefreshInputs<'a> {
    app: &'a AppCredentials,
    refresh_token: &'a str,
}

/// Refresh preconditions, evaluated in fixed order; the first failing check
/// determines the error even when several hold at once. Pure: callers pass
/// `now`, nothing here touches the network or the clock.
fn check_refreshable<'a>(
    app: Option<&'a AppCredentials>,
    credentials: &'a Credentials,
    now: u64,
    lifetime_secs: u64,
) -> Result<RefreshInputs<'a>> {
    let Some(app) = app else {
        return Err(Error::NonRefreshable {
            reason: "client credentials not configured".into(),
        });
    };
    let Some(refresh_token) = credentials.refresh_token.as_deref() else {
        return Err(Error::NonRefreshable {
            reason: "no refresh token".into(),
        });
    };
    let Some(expires_at) = credentials.refresh_expires_at(lifetime_secs) else {
        return Err(Error::NonRefreshable {
            reason: "no issuance timestamp".into(),
        });
    };
    if expires_at < now {
        return Err(Error::ExpiredRefreshToken {
            expired_at: expires_at,
        });
    }
    Ok(RefreshInputs { app, refresh_token })
}

/// Owner of one account's credential set.
///
/// Only this type writes the set after construction: wholesale replacement
/// on successful refresh, never a partial update.
pub struct CredentialGuard {
    account_id: String,
    app: Option<AppCredentials>,
    endpoints: Endpoints,
    tuning: RefreshTuning,
    http: reqwest::Client,
    hook: Arc<dyn RotationHook>,
    credentials: RwLock<Credentials>,
    state: RwLock<CredentialState>,
    /// Serializes refreshers. `get_or_refresh` re-checks freshness after
    /// acquiring, so lock losers reuse the winner's rotation.
    refresh_lock: Mutex<()>,
}

impl CredentialGuard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: impl Into<String>,
        credentials: Credentials,
        app: Option<AppCredentials>,
        endpoints: Endpoints,
        tuning: RefreshTuning,
        http: reqwest::Client,
        hook: Arc<dyn RotationHook>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            app,
            endpoints,
            tuning,
            http,
            hook,
            credentials: RwLock::new(credentials),
            state: RwLock::new(CredentialState::Valid),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Snapshot of the current credential set, fresh or not.
    pub async fn current(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub async fn state(&self) -> CredentialState {
        *self.state.read().await
    }

    /// Return the cached set if still fresh, otherwise refresh.
    ///
    /// The fresh path is idempotent and performs no network I/O. The stale
    /// path funnels through the refresh lock; whoever loses the race finds
    /// rotated credentials on re-check and returns them without a second
    /// token-endpoint call.
    pub async fn get_or_refresh(&self) -> Result<Credentials> {
        {
            let credentials = self.credentials.read().await;
            if credentials.is_fresh(now_epoch(), self.tuning.expiry_skew_secs) {
                return Ok(credentials.clone());
            }
        }

        let _refresh = self.refresh_lock.lock().await;
        {
            let credentials = self.credentials.read().await;
            if credentials.is_fresh(now_epoch(), self.tuning.expiry_skew_secs) {
                debug!(account_id = %self.account_id, "rotated by concurrent refresh while waiting");
                return Ok(credentials.clone());
            }
        }
        self.refresh_locked().await
    }

    /// Force a refresh regardless of freshness, serialized with any
    /// in-flight refresh.
    pub async fn refresh(&self) -> Result<Credentials> {
        let _refresh = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Precondition checks, the refresh grant, wholesale replacement, and
    /// the rotation hook. Caller holds `refresh_lock`.
    async fn refresh_locked(&self) -> Result<Credentials> {
        *self.state.write().await = CredentialState::Refreshing;

        let snapshot = self.credentials.read().await.clone();
        let now = now_epoch();
        let inputs = match check_refreshable(
            self.app.as_ref(),
            &snapshot,
            now,
            self.tuning.refresh_token_lifetime_secs,
        ) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(account_id = %self.account_id, error = %e, "credential set is not refreshable");
                *self.state.write().await = CredentialState::Terminal;
                return Err(e);
            }
        };

        debug!(account_id = %self.account_id, "access token stale, refreshing");
        let refreshed = match token::refresh_grant(
            &self.http,
            &self.endpoints,
            inputs.app,
            inputs.refresh_token,
            self.tuning.created_at_backdate_secs,
        )
        .await
        {
            Ok(credentials) => credentials,
            Err(e) => {
                // Rotation state is ambiguous after a rejected refresh; the
                // stale set is kept as-is and nothing is retried here.
                warn!(account_id = %self.account_id, error = %e, "token refresh failed");
                *self.state.write().await = CredentialState::Valid;
                return Err(e);
            }
        };

        {
            let mut slot = self.credentials.write().await;
            *slot = refreshed.clone();
        }

        // The previous refresh token is already invalid server-side; the
        // hook must persist the replacement before anyone observes this
        // refresh as complete.
        let persisted = self
            .hook
            .credentials_rotated(&self.account_id, &refreshed)
            .await;
        *self.state.write().await = CredentialState::Valid;
        persisted?;

        info!(account_id = %self.account_id, "credential set rotated");
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotate::NoopRotation;

    const LIFETIME: u64 = REFRESH_TOKEN_LIFETIME_SECS;

    fn credentials(refresh_token: Option<&str>, created_at: Option<u64>) -> Credentials {
        Credentials {
            token_type: "bearer".into(),
            expires_in: 7200,
            access_token: "at_test".into(),
            scope: "tweet.read offline.access".into(),
            refresh_token: refresh_token.map(String::from),
            created_at,
        }
    }

    fn app() -> Option<AppCredentials> {
        Some(AppCredentials::new("client-1", "secret-1"))
    }

    /// Guard pointing at a black-hole endpoint: any test that reaches the
    /// network fails loudly with a transport error instead of passing.
    fn offline_guard(set: Credentials, app: Option<AppCredentials>) -> CredentialGuard {
        CredentialGuard::new(
            "acct-1",
            set,
            app,
            Endpoints::with_api_base("http://127.0.0.1:9/2"),
            RefreshTuning::default(),
            reqwest::Client::new(),
            Arc::new(NoopRotation),
        )
    }

    #[test]
    fn preconditions_require_app_credentials_first() {
        // Everything is missing at once; the app-credential check still wins.
        let set = credentials(None, None);
        let err = check_refreshable(None, &set, now_epoch(), LIFETIME).unwrap_err();
        match err {
            Error::NonRefreshable { reason } => {
                assert_eq!(reason, "client credentials not configured")
            }
            other => panic!("expected NonRefreshable, got {other:?}"),
        }
    }

    #[test]
    fn preconditions_then_refresh_token() {
        let set = credentials(None, None);
        let err = check_refreshable(app().as_ref(), &set, now_epoch(), LIFETIME).unwrap_err();
        match err {
            Error::NonRefreshable { reason } => assert_eq!(reason, "no refresh token"),
            other => panic!("expected NonRefreshable, got {other:?}"),
        }
    }

    #[test]
    fn preconditions_then_issuance_timestamp() {
        let set = credentials(Some("rt_test"), None);
        let err = check_refreshable(app().as_ref(), &set, now_epoch(), LIFETIME).unwrap_err();
        match err {
            Error::NonRefreshable { reason } => assert_eq!(reason, "no issuance timestamp"),
            other => panic!("expected NonRefreshable, got {other:?}"),
        }
    }

    #[test]
    fn preconditions_then_lifetime_window() {
        let now = now_epoch();
        let created = now - LIFETIME - 100;
        let set = credentials(Some("rt_test"), Some(created));
        let err = check_refreshable(app().as_ref(), &set, now, LIFETIME).unwrap_err();
        match err {
            Error::ExpiredRefreshToken { expired_at } => {
                assert_eq!(expired_at, created + LIFETIME, "reported expiry must be created_at + window");
            }
            other => panic!("expected ExpiredRefreshToken, got {other:?}"),
        }
    }

    #[test]
    fn lifetime_window_is_inclusive_at_the_boundary() {
        let now = now_epoch();
        let set = credentials(Some("rt_test"), Some(now - LIFETIME));
        assert!(check_refreshable(app().as_ref(), &set, now, LIFETIME).is_ok());
    }

    #[test]
    fn passing_preconditions_yield_refresh_inputs() {
        let now = now_epoch();
        let set = credentials(Some("rt_test"), Some(now - 7200));
        let app = app();
        let inputs = check_refreshable(app.as_ref(), &set, now, LIFETIME).unwrap();
        assert_eq!(inputs.refresh_token, "rt_test");
        assert_eq!(inputs.app.client_id, "client-1");
    }

    #[tokio::test]
    async fn fresh_credentials_return_without_network() {
        // 200 seconds of life left: the black-hole endpoint proves the fast
        // path never leaves the process.
        let set = credentials(Some("rt_test"), Some(now_epoch() - 7000));
        let guard = offline_guard(set, app());
        let got = guard.get_or_refresh().await.unwrap();
        assert_eq!(got.access_token, "at_test");
        assert_eq!(guard.state().await, CredentialState::Valid);
    }

    #[tokio::test]
    async fn five_seconds_left_is_inside_skew_and_triggers_refresh() {
        // With no refresh token the triggered refresh fails on the
        // precondition, before any network call, which is exactly how we
        // observe that the gate decided to refresh.
        let set = credentials(None, Some(now_epoch() - 7195));
        let guard = offline_guard(set, app());
        let err = guard.get_or_refresh().await.unwrap_err();
        match err {
            Error::NonRefreshable { reason } => assert_eq!(reason, "no refresh token"),
            other => panic!("expected NonRefreshable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn precondition_failure_is_terminal_state() {
        let set = credentials(None, Some(now_epoch() - 8000));
        let guard = offline_guard(set, app());
        let _ = guard.get_or_refresh().await;
        assert_eq!(guard.state().await, CredentialState::Terminal);
    }

    #[tokio::test]
    async fn expired_window_reports_exact_epoch_without_network() {
        let created = now_epoch() - LIFETIME - 3600;
        let set = credentials(Some("rt_test"), Some(created));
        let guard = offline_guard(set, app());
        let err = guard.refresh().await.unwrap_err();
        match err {
            Error::ExpiredRefreshToken { expired_at } => assert_eq!(expired_at, created + LIFETIME),
            other => panic!("expected ExpiredRefreshToken, got {other:?}"),
        }
        assert_eq!(guard.state().await, CredentialState::Terminal);
    }

    #[tokio::test]
    async fn stale_set_with_preconditions_met_reaches_the_wire() {
        // Preconditions pass, so the black-hole endpoint is actually hit and
        // the failure is transport-level; the lifecycle returns to Valid.
        let set = credentials(Some("rt_test"), Some(now_epoch() - 8000));
        let guard = offline_guard(set, app());
        let err = guard.get_or_refresh().await.unwrap_err();
        match err {
            Error::Http(_) => {}
            other => panic!("expected Http error, got {other:?}"),
        }
        assert_eq!(guard.state().await, CredentialState::Valid);
        // The stale set must be untouched after a failed refresh.
        assert_eq!(guard.current().await.access_token, "at_test");
    }
}
