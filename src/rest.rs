use crate::auth::AuthClient;
use crate::client::{Config, Credentials};
use crate::documents::DocumentsApi;
use crate::error::{FinaError, Result};
use crate::loyalty::LoyaltyApi;
use crate::payload::{Payload, PayloadValidator, Validator};
use crate::reference::ReferenceApi;
use crate::reporting::ReportingApi;
use crate::response::Response;
use crate::token::{cache_key, KeyValueStore, MemoryStore, TokenCache};
use crate::transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport};
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client for the FINA Web API.
///
/// Every protected call goes through [`FinaClient::execute`], which attaches
/// the cached bearer token and recovers once from an HTTP 401 by forcing a
/// fresh login.
#[derive(Clone)]
pub struct FinaClient {
    config: Config,
    credentials: Credentials,
    transport: Arc<dyn HttpTransport>,
    auth: AuthClient,
    store: Arc<dyn KeyValueStore>,
    validator: Arc<dyn Validator>,
}

impl FinaClient {
    /// Create a client with the reqwest transport and a process-local token store
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Self::with_parts(config, transport, Arc::new(MemoryStore::new()))
    }

    /// Create a client from explicit transport and token store
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let credentials = config.credentials()?;

        let key = cache_key(
            &config.token_cache_key_prefix,
            credentials.base_url(),
            credentials.login(),
        );
        let cache = TokenCache::new(store.clone(), key, config.token_ttl);
        let auth_url = join_url(
            credentials.base_url(),
            &format!("{}/authenticate", config.prefixes.authentication.trim_end_matches('/')),
        );
        let auth = AuthClient::new(transport.clone(), cache, auth_url);

        Ok(FinaClient {
            config,
            credentials,
            transport,
            auth,
            store,
            validator: Arc::new(PayloadValidator),
        })
    }

    /// Replace the pre-send payload validator
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn token_cache(&self) -> &TokenCache {
        self.auth.cache()
    }

    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    /// Store shared by the token cache and the doc type cache
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Document save/get endpoints
    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi::new(self)
    }

    /// Reference data endpoints
    pub fn reference(&self) -> ReferenceApi<'_> {
        ReferenceApi::new(self)
    }

    /// Loyalty card and bonus endpoints
    pub fn loyalty(&self) -> LoyaltyApi<'_> {
        LoyaltyApi::new(self)
    }

    /// Journal and report endpoints, including chunked range fetches
    pub fn reporting(&self) -> ReportingApi<'_> {
        ReportingApi::new(self)
    }

    /// Send an authenticated call and decode the JSON object it returns.
    ///
    /// `path` is relative to the base URL, e.g. `/api/operation/getStores`.
    /// A 401 is retried exactly once after forcing a new login; any other
    /// failure is returned as [`FinaError::Http`] with status and raw body.
    /// The `ex` field is not inspected here.
    pub fn execute(&self, method: Method, path: &str, payload: Map<String, Value>) -> Result<Response> {
        let url = join_url(self.credentials.base_url(), path);
        let mut request = HttpRequest::new(method, url).with_body(payload);

        let token = self.auth.token(&self.credentials)?;
        let reply = self.dispatch(&mut request, token)?;

        if reply.is_success() {
            return Ok(Response::from_body(&reply.body));
        }

        if reply.status != 401 {
            return Err(FinaError::http(reply.status, reply.body, None));
        }

        info!("{} {} rejected with 401, re-authenticating", request.method, path);
        self.auth.forget_token()?;
        let token = self.auth.authenticate(&self.credentials)?;
        let reply = self.dispatch(&mut request, token)?;

        if reply.is_success() {
            return Ok(Response::from_body(&reply.body));
        }

        warn!(
            "{} {} failed after re-authentication with {}",
            request.method, path, reply.status
        );
        Err(FinaError::http(reply.status, reply.body, None))
    }

    /// Authorized GET that fails with [`FinaError::Remote`] if `ex` is set
    pub fn get(&self, path: &str, query: Map<String, Value>, context: &str) -> Result<Response> {
        self.execute(Method::GET, path, query)?.ensure_ok(context)
    }

    /// Authorized POST that fails with [`FinaError::Remote`] if `ex` is set
    pub fn post(&self, path: &str, body: Map<String, Value>, context: &str) -> Result<Response> {
        self.execute(Method::POST, path, body)?.ensure_ok(context)
    }

    /// Validate `payload`, then POST it with the `ex` guard.
    /// A rejected payload is never sent.
    pub fn post_payload(&self, path: &str, payload: Payload, context: &str) -> Result<Response> {
        self.validator.validate(&payload)?;
        self.post(path, payload.to_map(), context)
    }

    fn dispatch(&self, request: &mut HttpRequest, token: String) -> Result<HttpReply> {
        request.bearer = Some(token);
        let start = std::time::Instant::now();
        let reply = self.transport.send(request)?;
        debug!(
            "[fina] {} {} => {:?} (status: {})",
            request.method,
            request.url,
            start.elapsed(),
            reply.status
        );
        Ok(reply)
    }
}

impl std::fmt::Debug for FinaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinaClient")
            .field("credentials", &self.credentials)
            .field("token_cache", self.auth.cache())
            .finish()
    }
}

/// Module path under a prefix, e.g. (`/api/operation`, `getStores`)
pub(crate) fn module_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
