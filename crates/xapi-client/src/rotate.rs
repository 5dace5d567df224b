//! Rotation collaborator notified when the credential set changes
//!
//! Refresh tokens rotate: the provider invalidates the previous token the
//! moment it issues a replacement. The hook is how the caller persists the
//! replacement durably: the refresh that produced it does not resolve
//! until the hook completes, so there is no window where the only copy of
//! a live refresh token exists in process memory alone.

use std::future::Future;
use std::pin::Pin;

use xapi_auth::{Credentials, Result};

/// Collaborator invoked exactly once per successful refresh and once per
/// initial code exchange, with the account the credentials are bound to.
///
/// An error from the hook propagates out of the refresh; the rotated set is
/// already committed in memory at that point (the provider has rotated
/// regardless), so the caller decides whether to retry persistence.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn RotationHook>`).
pub trait RotationHook: Send + Sync {
    fn credentials_rotated<'a>(
        &'a self,
        account_id: &'a str,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Hook for callers without durable persistence (tests, one-shot tools).
pub struct NoopRotation;

impl RotationHook for NoopRotation {
    fn credentials_rotated<'a>(
        &'a self,
        _account_id: &'a str,
        _credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}
