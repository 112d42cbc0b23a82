use crate::error::{FinaError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Key/value store with per-entry TTL, shared by every client that points at
/// the same account.
pub trait KeyValueStore: Send + Sync {
    /// Value for `key`, or `None` if absent or expired
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    fn forget(&self, key: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Value and expiry; `None` when the TTL reaches past what `Instant` can hold
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((value, expires_at)) if expires_at.map_or(true, |at| Instant::now() < at) => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl);
        lock(&self.entries).insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    value: String,
    /// Unix timestamp in milliseconds
    expires_at: i64,
}

/// Expiry `ttl` from `now_ms`, saturating instead of overflowing
fn expiry_millis(now_ms: i64, ttl: Duration) -> i64 {
    now_ms.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

/// JSON file store that survives process restarts.
///
/// The whole file is rewritten on every change. A missing or unreadable file
/// is an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, FileEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return HashMap::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring unreadable token store {}: {}", self.path.display(), e);
            HashMap::new()
        })
    }

    fn save(&self, entries: &HashMap<String, FileEntry>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = lock(&self.guard);
        let now = Utc::now().timestamp_millis();
        self.load()
            .remove(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value)
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let _guard = lock(&self.guard);
        let now = Utc::now().timestamp_millis();
        let mut entries = self.load();
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(
            key.to_string(),
            FileEntry {
                value: value.to_string(),
                expires_at: expiry_millis(now, ttl),
            },
        );
        self.save(&entries)
    }

    fn forget(&self, key: &str) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Cache slot for an account: `prefix` + SHA-256 of `base_url|login`.
/// The password never takes part in the key.
pub fn cache_key(prefix: &str, base_url: &str, login: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update(b"|");
    hasher.update(login.as_bytes());
    format!("{}{:x}", prefix, hasher.finalize())
}

/// Bearer token slot bound to one cache key and TTL
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
}

impl TokenCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, ttl: Duration) -> Self {
        TokenCache {
            store,
            key: key.into(),
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cached token. Blank values count as absent.
    pub fn get(&self) -> Option<String> {
        let token = self.store.get(&self.key).filter(|t| !t.trim().is_empty());
        debug!(key = %self.key, hit = token.is_some(), "token cache lookup");
        token
    }

    /// Store `token`; a blank token is refused
    pub fn put(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(FinaError::Other("refusing to cache a blank token".to_string()));
        }
        self.store.put(&self.key, token, self.ttl)
    }

    pub fn forget(&self) -> Result<()> {
        debug!(key = %self.key, "forgetting cached token");
        self.store.forget(&self.key)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}
