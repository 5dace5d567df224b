//! OAuth2 credential subsystem for the X API v2
//!
//! Implements the authorization-code-with-PKCE handshake, the token-endpoint
//! wire calls, and the credential data model. This crate is a standalone
//! library with no dependency on the request-wrapping client, so it can be
//! tested and used independently.
//!
//! Credential flow:
//! 1. App calls `authorize::build_authorization_url()` and sends the user there
//! 2. User grants access; the redirect carries `code` and `state` back
//! 3. App calls `token::exchange_code()` with the code and retained verifier
//! 4. The exchange resolves the account identity via `/users/me`
//! 5. The client crate refreshes the credential set through
//!    `token::refresh_grant()` for as long as the refresh token lives

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod http;
pub mod pkce;
pub mod token;

pub use authorize::{AuthorizationRequest, build_authorization_url};
pub use credentials::{AppCredentials, Credentials, now_epoch};
pub use error::{Error, Result};
pub use http::{Endpoints, check_response, transport_error};
pub use pkce::{PkcePair, compute_challenge};
pub use token::{AuthorizedAccount, exchange_code, lookup_account_id, refresh_grant};
