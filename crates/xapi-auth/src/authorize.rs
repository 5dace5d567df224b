//! Authorization URL construction for the user-consent redirect

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::Endpoints;
use crate::pkce::PkcePair;

/// Everything the caller needs to track one authorization attempt.
///
/// `state` comes back unmodified on the redirect and correlates the
/// callback to this attempt; `verifier` must be retained until the code
/// exchange. Persisting `state -> verifier` until the callback arrives is
/// the caller's responsibility; nothing is stored here.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub state: String,
    pub verifier: String,
    pub url: String,
}

/// Build the GET URL a user visits to grant access.
///
/// Pure construction: a fresh UUIDv4 `state` and a fresh PKCE pair per
/// call, no side effects. The challenge travels in the URL; the verifier
/// never does.
pub fn build_authorization_url(
    endpoints: &Endpoints,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
) -> Result<AuthorizationRequest> {
    if client_id.is_empty() {
        return Err(Error::User("client_id must not be empty".into()));
    }
    if redirect_uri.is_empty() {
        return Err(Error::User("redirect_uri must not be empty".into()));
    }

    let state = Uuid::new_v4().to_string();
    let pair = PkcePair::generate();

    let mut url = reqwest::Url::parse(&endpoints.authorize_url)
        .map_err(|e| Error::User(format!("invalid authorize URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("scope", scope)
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", &state)
        .append_pair("code_challenge", &pair.challenge)
        .append_pair("code_challenge_method", "S256");

    Ok(AuthorizationRequest {
        state,
        verifier: pair.verifier,
        url: url.to_string(),
    })
}
