use crate::client::{create_rest_client, Config};
use crate::error::{FinaError, Result};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{Map, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One physical HTTP call
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Bearer token, if the call is protected
    pub bearer: Option<String>,
    /// JSON body for POST/PUT/PATCH, query parameters otherwise
    pub body: Map<String, Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            bearer: None,
            body: Map::new(),
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }
}

/// Status and raw body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpReply {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP calls for the client.
///
/// Any response, whatever its status, is `Ok`. `Err` means no response was
/// obtained at all, after whatever low-level retries the transport does.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply>;
}

/// Blocking reqwest transport retrying connection failures
pub struct ReqwestTransport {
    client: Client,
    attempts: u32,
    retry_sleep: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(ReqwestTransport {
            client: create_rest_client(config)?,
            attempts: config.retry_times.max(1),
            retry_sleep: config.retry_sleep,
        })
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::blocking::RequestBuilder> {
        let mut url = Url::parse(&request.url)?;

        let sends_body = matches!(request.method, Method::POST | Method::PUT | Method::PATCH);
        if !sends_body && !request.body.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.body {
                match value {
                    Value::String(s) => pairs.append_pair(key, s),
                    Value::Null => pairs.append_pair(key, ""),
                    other => pairs.append_pair(key, &other.to_string()),
                };
            }
        }

        let mut builder = self
            .client
            .request(request.method.clone(), url.as_str())
            .header("Accept", "application/json");

        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        if sends_body {
            builder = builder.json(&request.body);
        }

        Ok(builder)
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply> {
        let mut attempt = 1;
        loop {
            let start = std::time::Instant::now();
            match self.build(request)?.send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .map_err(|e| FinaError::http(status, String::new(), Some(Box::new(e))))?;
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status,
                        elapsed = ?start.elapsed(),
                        "request completed"
                    );
                    return Ok(HttpReply { status, body });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.attempts => {
                    warn!(
                        "transport attempt {}/{} to {} failed: {}",
                        attempt, self.attempts, request.url, e
                    );
                    thread::sleep(self.retry_sleep);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("request to {} failed: {}", request.url, e);
                    return Err(FinaError::http(0, String::new(), Some(Box::new(e))));
                }
            }
        }
    }
}
