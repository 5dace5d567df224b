//! Token endpoint interactions and identity resolution
//!
//! Two grant types POST to the same endpoint with HTTP Basic app
//! authentication: the one-time authorization-code exchange and the
//! recurring refresh grant. Both stamp `created_at` locally before the
//! credential set is visible to anyone; the provider's clock is never
//! trusted for lifetime math.

use serde::Deserialize;
use tracing::debug;

use crate::constants::{IDENTITY_PATH, TOKEN_PATH};
use crate::credentials::{AppCredentials, Credentials, now_epoch};
use crate::error::{Error, Result};
use crate::http::{Endpoints, check_response, transport_error};

/// Outcome of a completed authorization-code exchange: the credential set
/// and the account it is bound to.
#[derive(Debug, Clone)]
pub struct AuthorizedAccount {
    pub account_id: String,
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    data: IdentityData,
}

#[derive(Debug, Deserialize)]
struct IdentityData {
    id: String,
}

/// Exchange an authorization code (plus the retained PKCE verifier) for the
/// first credential set, then resolve the account bound to it.
///
/// A non-success token response fails with an API error carrying the token
/// path; nothing is retried. A failure of the follow-up identity lookup is
/// reported with the identity path instead. The exchange is not rolled
/// back: the tokens were already issued server-side, and the lookup can be
/// retried with the same credential set.
pub async fn exchange_code(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    app: &AppCredentials,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
    backdate_secs: u64,
) -> Result<AuthorizedAccount> {
    let response = client
        .post(endpoints.api_url(TOKEN_PATH))
        .basic_auth(&app.client_id, Some(app.client_secret.expose()))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", app.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .map_err(|e| transport_error(e, "token exchange"))?;
    let response = check_response(response).await?;

    let mut credentials: Credentials = response
        .json()
        .await
        .map_err(|e| Error::Http(format!("decoding token response: {e}")))?;
    credentials.stamp_created_at(now_epoch(), backdate_secs);

    let account_id = lookup_account_id(client, endpoints, &credentials.access_token).await?;
    debug!(account_id, "authorization code exchanged");

    Ok(AuthorizedAccount {
        account_id,
        credentials,
    })
}

/// Resolve the account identifier bound to an access token via the
/// identity endpoint.
pub async fn lookup_account_id(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    access_token: &str,
) -> Result<String> {
    let response = client
        .get(endpoints.api_url(IDENTITY_PATH))
        .query(&[("user.fields", "id")])
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| transport_error(e, "identity lookup"))?;
    let response = check_response(response).await?;

    let envelope: IdentityEnvelope = response
        .json()
        .await
        .map_err(|e| Error::Http(format!("decoding identity response: {e}")))?;
    Ok(envelope.data.id)
}

/// Redeem a refresh token for a new credential set.
///
/// The returned set is stamped but not stored anywhere; committing it (and
/// honoring rotation) is the caller's job. A non-success status becomes an
/// API error and is never retried here: the old refresh token's rotation
/// state is ambiguous after a failure, so blind retries risk replaying an
/// invalidated token.
pub async fn refresh_grant(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    app: &AppCredentials,
    refresh_token: &str,
    backdate_secs: u64,
) -> Result<Credentials> {
    let response = client
        .post(endpoints.api_url(TOKEN_PATH))
        .basic_auth(&app.client_id, Some(app.client_secret.expose()))
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", app.client_id.as_str()),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .map_err(|e| transport_error(e, "token refresh"))?;
    let response = check_response(response).await?;

    let mut credentials: Credentials = response
        .json()
        .await
        .map_err(|e| Error::Http(format!("decoding refresh response: {e}")))?;
    credentials.stamp_created_at(now_epoch(), backdate_secs);
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_envelope_decodes() {
        let json = r#"{"data": {"id": "2244994945", "name": "ignored"}}"#;
        let envelope: IdentityEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.id, "2244994945");
    }

    #[test]
    fn identity_envelope_requires_data() {
        let result = serde_json::from_str::<IdentityEnvelope>(r#"{"id": "123"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        // Port 9 (discard) refuses connections; the error must surface as
        // transport failure, not as an API or credential error.
        let endpoints = Endpoints::with_api_base("http://127.0.0.1:9/2");
        let app = AppCredentials::new("client-1", "secret-1");
        let result = refresh_grant(&reqwest::Client::new(), &endpoints, &app, "rt_x", 10).await;
        match result {
            Err(Error::Http(_)) => {}
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
