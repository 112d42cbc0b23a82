use crate::client::Credentials;
use crate::error::{FinaError, Result};
use crate::response::Response;
use crate::token::TokenCache;
use crate::transport::{HttpRequest, HttpTransport};
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Body of `POST /api/authentication/authenticate`
#[derive(Debug, Clone, PartialEq)]
pub struct AuthTokenResponse {
    /// `None` when missing, blank or not a string
    pub token: Option<String>,
    pub ex: Option<Value>,
}

impl AuthTokenResponse {
    pub fn from_response(response: &Response) -> Self {
        AuthTokenResponse {
            token: response
                .get_str("token")
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string),
            ex: response.ex().cloned(),
        }
    }
}

/// Fetches bearer tokens and stores them in the token cache
#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn HttpTransport>,
    cache: TokenCache,
    /// Full URL of the authenticate endpoint
    url: String,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: TokenCache, url: impl Into<String>) -> Self {
        AuthClient {
            transport,
            cache,
            url: url.into(),
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Log in and cache the new token before returning it
    pub fn authenticate(&self, credentials: &Credentials) -> Result<String> {
        info!(login = credentials.login(), "authenticating against {}", self.url);

        let mut body = Map::new();
        body.insert("login".to_string(), Value::String(credentials.login().to_string()));
        body.insert(
            "password".to_string(),
            Value::String(credentials.password().to_string()),
        );

        let reply = self
            .transport
            .send(&HttpRequest::new(Method::POST, self.url.clone()).with_body(body))?;
        if !reply.is_success() {
            return Err(FinaError::http(reply.status, reply.body, None));
        }

        let response = Response::from_body(&reply.body);
        let dto = AuthTokenResponse::from_response(&response);

        if let Some(ex) = dto.ex {
            return Err(FinaError::remote(ex, "FINA authenticate returned ex"));
        }

        let token = match dto.token {
            Some(token) => token,
            None => {
                return Err(FinaError::remote(
                    Value::Object(response.into_raw()),
                    "FINA authenticate did not return token",
                ))
            }
        };

        self.cache.put(&token)?;
        debug!("token cached under {}", self.cache.key());

        Ok(token)
    }

    /// Cached token, authenticating first on a miss
    pub fn token(&self, credentials: &Credentials) -> Result<String> {
        match self.cache.get() {
            Some(token) => Ok(token),
            None => self.authenticate(credentials),
        }
    }

    pub fn forget_token(&self) -> Result<()> {
        self.cache.forget()
    }
}
