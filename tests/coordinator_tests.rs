mod common;

use common::{client, client_with_store, init_tracing, is_auth, reply, ScriptedTransport};
use fina::{FinaError, KeyValueStore, MemoryStore, Method};
use serde_json::{json, Map};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const STORES: &str = "/api/operation/getStores";

#[test]
fn test_second_call_reuses_cached_token() {
    init_tracing();
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "fake-token-123", "ex": null}"#)
        } else {
            reply(200, r#"{"stores": [], "ex": null}"#)
        }
    });
    let client = client(transport.clone());

    let first = client.execute(Method::GET, STORES, Map::new()).unwrap();
    assert_eq!(first.get("stores"), Some(&json!([])));
    assert_eq!(client.token_cache().get().as_deref(), Some("fake-token-123"));

    client.execute(Method::GET, STORES, Map::new()).unwrap();

    assert_eq!(transport.auth_calls(), 1);
    assert_eq!(transport.sent().len(), 3);
    for request in transport.sent_to(STORES) {
        assert_eq!(request.bearer.as_deref(), Some("fake-token-123"));
    }
}

#[test]
fn test_401_reauthenticates_and_retries_once() {
    let logins = Arc::new(AtomicUsize::new(0));
    let counter = logins.clone();
    let transport = ScriptedTransport::new(move |req| {
        if is_auth(req) {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let token = if n == 0 { "old-token" } else { "new-token" };
            return reply(200, &json!({"token": token, "ex": null}).to_string());
        }
        match req.bearer.as_deref() {
            Some("old-token") => reply(401, r#"{"error": "Unauthorized"}"#),
            _ => reply(200, r#"{"stores": ["refreshed"], "ex": null}"#),
        }
    });
    let client = client(transport.clone());

    let response = client.execute(Method::GET, STORES, Map::new()).unwrap();

    assert_eq!(response.get("stores"), Some(&json!(["refreshed"])));
    assert_eq!(transport.auth_calls(), 2);
    assert_eq!(transport.sent_to(STORES).len(), 2);
    assert_eq!(client.token_cache().get().as_deref(), Some("new-token"));
}

#[test]
fn test_second_401_is_fatal() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let transport = ScriptedTransport::new(move |req| {
        if is_auth(req) {
            return reply(200, r#"{"token": "tok"}"#);
        }
        let n = counter.fetch_add(1, Ordering::SeqCst);
        reply(401, if n == 0 { "first denial" } else { "second denial" })
    });
    let client = client(transport.clone());

    let err = client.execute(Method::GET, STORES, Map::new()).unwrap_err();

    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.body(), Some("second denial"));
    assert_eq!(transport.sent_to(STORES).len(), 2);
    assert_eq!(transport.auth_calls(), 2);
}

#[test]
fn test_retry_failing_with_other_status_reports_second_attempt() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let transport = ScriptedTransport::new(move |req| {
        if is_auth(req) {
            return reply(200, r#"{"token": "tok"}"#);
        }
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 => reply(401, ""),
            _ => reply(503, "busy"),
        }
    });
    let client = client(transport);

    let err = client.execute(Method::GET, STORES, Map::new()).unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.body(), Some("busy"));
}

#[test]
fn test_non_401_failure_is_not_retried() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "tok"}"#)
        } else {
            reply(400, "Bad Request Body")
        }
    });
    let client = client(transport.clone());

    match client.execute(Method::POST, STORES, Map::new()) {
        Err(FinaError::Http { status, body, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "Bad Request Body");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
    assert_eq!(transport.sent_to(STORES).len(), 1);
    assert_eq!(transport.auth_calls(), 1);
    assert_eq!(client.token_cache().get().as_deref(), Some("tok"));
}

#[test]
fn test_network_failure_surfaces_status_zero() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "tok"}"#)
        } else {
            Err(FinaError::http(0, "", None))
        }
    });
    let client = client(transport.clone());

    let err = client.execute(Method::GET, STORES, Map::new()).unwrap_err();
    assert_eq!(err.status_code(), Some(0));
    assert_eq!(transport.sent_to(STORES).len(), 1);
}

#[test]
fn test_malformed_success_body_decodes_as_empty() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "tok"}"#)
        } else {
            reply(200, "OK")
        }
    });
    let client = client(transport);

    let response = client.execute(Method::GET, STORES, Map::new()).unwrap();
    assert!(response.raw().is_empty());
}

#[test]
fn test_execute_ignores_ex_but_get_raises_remote_error() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "tok"}"#)
        } else {
            reply(200, r#"{"stores": null, "ex": {"message": "no access"}}"#)
        }
    });
    let client = client(transport);

    let raw = client.execute(Method::GET, STORES, Map::new()).unwrap();
    assert_eq!(raw.ex(), Some(&json!({"message": "no access"})));

    let err = client
        .get(STORES, Map::new(), "operation.getStores returned ex")
        .unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.ex(), Some(&json!({"message": "no access"})));
}

#[test]
fn test_failed_login_stops_the_call() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": null, "ex": "wrong password"}"#)
        } else {
            reply(200, "{}")
        }
    });
    let client = client(transport.clone());

    let err = client.execute(Method::GET, STORES, Map::new()).unwrap_err();
    assert!(err.is_remote());
    assert!(transport.sent_to(STORES).is_empty());
}

#[test]
fn test_clients_sharing_a_store_share_the_token() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "shared"}"#)
        } else {
            reply(200, "{}")
        }
    });
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = client_with_store(transport.clone(), store.clone());
    let second = client_with_store(transport.clone(), store);

    first.execute(Method::GET, STORES, Map::new()).unwrap();
    second.execute(Method::GET, STORES, Map::new()).unwrap();

    assert_eq!(transport.auth_calls(), 1);
    assert_eq!(first.token_cache().key(), second.token_cache().key());
}

#[test]
fn test_post_sends_payload_as_body() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "tok"}"#)
        } else {
            reply(200, r#"{"id": 11, "ex": null}"#)
        }
    });
    let client = client(transport.clone());

    let mut body = Map::new();
    body.insert("code".to_string(), json!("C-1"));
    client
        .post("/api/operation/saveDocCustomerOrder", body, "ctx")
        .unwrap();

    let sent = transport.sent_to("saveDocCustomerOrder");
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].body.get("code"), Some(&json!("C-1")));
}

#[test]
fn test_unbounded_token_ttl_still_caches() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "long-lived"}"#)
        } else {
            reply(200, "{}")
        }
    });
    let config = common::config().with_token_ttl(std::time::Duration::from_secs(u64::MAX));
    let client =
        fina::FinaClient::with_parts(config, transport.clone(), Arc::new(MemoryStore::new()))
            .unwrap();

    client.execute(Method::GET, STORES, Map::new()).unwrap();
    client.execute(Method::GET, STORES, Map::new()).unwrap();

    assert_eq!(transport.auth_calls(), 1);
}

#[test]
fn test_blank_login_token_fails_every_call() {
    let transport = ScriptedTransport::new(|req| {
        if is_auth(req) {
            reply(200, r#"{"token": "   ", "ex": null}"#)
        } else {
            reply(200, "{}")
        }
    });
    let client = client(transport.clone());

    assert!(client.execute(Method::GET, STORES, Map::new()).unwrap_err().is_remote());
    assert!(client.execute(Method::GET, STORES, Map::new()).unwrap_err().is_remote());

    assert_eq!(transport.auth_calls(), 2);
    assert!(transport.sent_to(STORES).is_empty());
    assert_eq!(client.token_cache().get(), None);
}
