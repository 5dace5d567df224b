//! X API v2 endpoint roots and credential-lifecycle tunables
//!
//! The URL constants identify the public API surface; they are not secrets.
//! The lifecycle values are defaults; the client crate exposes them as
//! named tunables rather than baking them in at call sites.

/// X API v2 root (token endpoint, identity endpoint, and all wrapped calls)
pub const API_BASE_URL: &str = "https://api.x.com/2";

/// Authorization endpoint the user's browser is sent to for consent
pub const AUTHORIZE_URL: &str = "https://x.com/i/oauth2/authorize";

/// Token endpoint path, relative to the API root
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Identity endpoint path, relative to the API root
pub const IDENTITY_PATH: &str = "/users/me";

/// Safety margin added to `now` when judging access-token freshness, so a
/// token is refreshed slightly before true expiry rather than raced against it.
pub const EXPIRY_SKEW_SECS: u64 = 10;

/// Backdate applied when stamping `created_at` locally, absorbing clock
/// drift and request latency between issuance and first use.
pub const CREATED_AT_BACKDATE_SECS: u64 = 10;

/// Absolute refresh-token lifetime measured from `created_at`, independent
/// of the access token's `expires_in`. Six months.
pub const REFRESH_TOKEN_LIFETIME_SECS: u64 = 60 * 60 * 24 * 30 * 6;
