#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fina::{Config, FinaClient, HttpReply, HttpRequest, HttpTransport, KeyValueStore, MemoryStore};
use std::sync::{Arc, Mutex};

type Handler = Box<dyn Fn(&HttpRequest) -> fina::Result<HttpReply> + Send + Sync>;

/// In-process transport answering from a closure and recording every request
pub struct ScriptedTransport {
    handler: Handler,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> fina::Result<HttpReply> + Send + Sync + 'static,
    {
        Arc::new(ScriptedTransport {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests whose URL contains `needle`
    pub fn sent_to(&self, needle: &str) -> Vec<HttpRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.url.contains(needle))
            .collect()
    }

    pub fn auth_calls(&self) -> usize {
        self.sent_to("/api/authentication/authenticate").len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> fina::Result<HttpReply> {
        self.sent.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn reply(status: u16, body: &str) -> fina::Result<HttpReply> {
    Ok(HttpReply::new(status, body))
}

pub fn is_auth(request: &HttpRequest) -> bool {
    request.url.ends_with("/api/authentication/authenticate")
}

pub fn config() -> Config {
    Config::new("https://fina.test", "user", "secret")
}

pub fn client(transport: Arc<ScriptedTransport>) -> FinaClient {
    client_with_store(transport, Arc::new(MemoryStore::new()))
}

pub fn client_with_store(
    transport: Arc<ScriptedTransport>,
    store: Arc<dyn KeyValueStore>,
) -> FinaClient {
    FinaClient::with_parts(config(), transport, store).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
