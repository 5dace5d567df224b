//! Client construction and the authorized request wrapper

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use xapi_auth::{
    AppCredentials, AuthorizationRequest, Credentials, Endpoints, Error, Result,
    build_authorization_url, check_response, token, transport_error,
};

use crate::gate::{CredentialGuard, CredentialState, RefreshTuning};
use crate::rotate::{NoopRotation, RotationHook};

/// Request payload shapes understood by the wrapper.
///
/// Content type follows the shape: JSON gets `application/json`, form
/// fields get `application/x-www-form-urlencoded`, multipart keeps its own
/// boundary type, and empty requests carry no body at all.
pub enum Payload {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(reqwest::multipart::Form),
}

/// A query parameter value; lists collapse to the API's comma-joined form.
#[derive(Debug, Clone)]
pub enum QueryValue {
    Single(String),
    List(Vec<String>),
}

impl QueryValue {
    fn render(&self) -> String {
        match self {
            QueryValue::Single(value) => value.clone(),
            QueryValue::List(values) => values.join(","),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

/// Assemble query parameters for an endpoint wrapper, rejecting calls that
/// miss a required parameter before any network I/O happens.
pub fn build_query(
    params: &[(&str, QueryValue)],
    required: &[&str],
) -> Result<Vec<(String, String)>> {
    for name in required {
        if !params.iter().any(|(key, _)| key == name) {
            return Err(Error::User(format!("missing required parameter: {name}")));
        }
    }
    Ok(params
        .iter()
        .map(|(key, value)| (key.to_string(), value.render()))
        .collect())
}

/// Builder for [`Client`].
///
/// App credentials are optional: without them an existing credential set is
/// usable until it expires, but can never be refreshed or exchanged.
pub struct ClientBuilder {
    app: Option<AppCredentials>,
    endpoints: Endpoints,
    tuning: RefreshTuning,
    hook: Arc<dyn RotationHook>,
    timeout: Option<Duration>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            app: None,
            endpoints: Endpoints::default(),
            tuning: RefreshTuning::default(),
            hook: Arc::new(NoopRotation),
            timeout: None,
        }
    }

    pub fn app_credentials(mut self, app: AppCredentials) -> Self {
        self.app = Some(app);
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn tuning(mut self, tuning: RefreshTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Inject the collaborator that persists rotated credentials.
    pub fn rotation_hook(mut self, hook: Arc<dyn RotationHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Deadline applied to every outbound call this client makes, the
    /// token endpoint and wrapped API calls alike. Elapsing surfaces as
    /// [`Error::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the consent URL for a new authorization attempt. Requires app
    /// credentials; fails before any network call without them.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        scope: &str,
    ) -> Result<AuthorizationRequest> {
        let Some(app) = self.app.as_ref() else {
            return Err(Error::User(
                "client_id and client_secret are required to build an authorization URL".into(),
            ));
        };
        build_authorization_url(&self.endpoints, &app.client_id, redirect_uri, scope)
    }

    /// Complete the authorization-code flow: redeem the code with the
    /// retained PKCE verifier, resolve the account identity, hand the first
    /// credential set to the rotation hook, and return a ready client.
    pub async fn exchange_code(
        self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Client> {
        let Some(app) = self.app.clone() else {
            return Err(Error::User(
                "client_id and client_secret are required to exchange an authorization code".into(),
            ));
        };
        if code.is_empty() {
            return Err(Error::User("authorization code must not be empty".into()));
        }
        if verifier.is_empty() {
            return Err(Error::User("PKCE verifier must not be empty".into()));
        }

        let http = self.http_client()?;
        let authorized = token::exchange_code(
            &http,
            &self.endpoints,
            &app,
            code,
            verifier,
            redirect_uri,
            self.tuning.created_at_backdate_secs,
        )
        .await?;

        // Same contract as refresh rotation: the first credential set must
        // be durably persisted before the exchange resolves.
        self.hook
            .credentials_rotated(&authorized.account_id, &authorized.credentials)
            .await?;

        self.assemble(authorized.account_id, authorized.credentials, http)
    }

    /// Wrap a credential set from an earlier exchange.
    pub fn connect(
        self,
        account_id: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Client> {
        let account_id = account_id.into();
        if account_id.is_empty() {
            return Err(Error::User("account_id must not be empty".into()));
        }
        let http = self.http_client()?;
        self.assemble(account_id, credentials, http)
    }

    fn assemble(
        self,
        account_id: String,
        credentials: Credentials,
        http: reqwest::Client,
    ) -> Result<Client> {
        let guard = CredentialGuard::new(
            account_id,
            credentials,
            self.app,
            self.endpoints.clone(),
            self.tuning,
            http.clone(),
            self.hook,
        );
        Ok(Client {
            guard: Arc::new(guard),
            endpoints: self.endpoints,
            http,
        })
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))
    }
}

/// Authorized transport for one account.
///
/// All methods take `&self` and may be called concurrently; the credential
/// gate serializes what must be serialized.
pub struct Client {
    guard: Arc<CredentialGuard>,
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn account_id(&self) -> &str {
        self.guard.account_id()
    }

    /// Snapshot of the current credential set, fresh or not.
    pub async fn credentials(&self) -> Credentials {
        self.guard.current().await
    }

    pub async fn credential_state(&self) -> CredentialState {
        self.guard.state().await
    }

    /// Shared access to the gate, for callers coordinating their own tasks.
    pub fn credential_guard(&self) -> Arc<CredentialGuard> {
        Arc::clone(&self.guard)
    }

    /// Force a refresh now, outside any request.
    pub async fn refresh(&self) -> Result<Credentials> {
        self.guard.refresh().await
    }

    /// Perform an authorized API call and return the raw response for the
    /// caller to decode.
    ///
    /// Obtains valid credentials (refreshing through the gate if needed),
    /// attaches the bearer header, applies the payload's content type, and
    /// normalizes any non-success response into [`Error::Api`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: Payload,
    ) -> Result<reqwest::Response> {
        let credentials = self.guard.get_or_refresh().await?;

        let mut request = self
            .http
            .request(method, self.endpoints.api_url(path))
            .bearer_auth(&credentials.access_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(&body),
            Payload::Form(fields) => request.form(&fields),
            Payload::Multipart(form) => request.multipart(form),
        };

        debug!(account_id = %self.guard.account_id(), path, "sending authorized request");
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, "api request"))?;
        check_response(response).await
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<reqwest::Response> {
        self.request(Method::GET, path, query, Payload::Empty).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<reqwest::Response> {
        self.request(Method::POST, path, &[], Payload::Json(body))
            .await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
    ) -> Result<reqwest::Response> {
        self.request(Method::POST, path, &[], Payload::Form(fields))
            .await
    }
}
