use crate::error::{FinaError, Result};
use reqwest::blocking::{Client, ClientBuilder};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Token lifetime on the FINA side is about 36 hours; the cache expires first.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(35 * 3600);

/// Create the HTTP client used for every FINA call
/// with connection pooling and the configured timeouts
pub fn create_rest_client(config: &Config) -> Result<Client> {
    let client = ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()?;
    Ok(client)
}

/// Path prefixes of the FINA Web API modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixes {
    pub authentication: String,
    pub operation: String,
    pub reporting: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Prefixes {
            authentication: "/api/authentication".to_string(),
            operation: "/api/operation".to_string(),
            reporting: "/api/reporting".to_string(),
        }
    }
}

/// Configuration for the FINA API client
#[derive(Clone)]
pub struct Config {
    /// Base URL, e.g. `https://fina-host:5007`
    pub base_url: String,
    /// Login used for authentication
    pub login: String,
    /// Password used for authentication
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Total transport attempts for one physical call (connection failures only)
    pub retry_times: u32,
    /// Pause between transport attempts
    pub retry_sleep: Duration,
    /// How long a bearer token stays in the cache
    pub token_ttl: Duration,
    /// Prefix of the token cache key
    pub token_cache_key_prefix: String,
    /// How long the doc type list stays in the store
    pub doc_types_ttl: Duration,
    /// Prefix of the doc type cache key
    pub doc_types_cache_key_prefix: String,
    /// API module prefixes
    pub prefixes: Prefixes,
    /// Default chunk size for the entries journal
    pub entries_chunk_days: i64,
    /// Default chunk size for money, order, return and production journals
    pub journal_chunk_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: String::new(),
            login: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            retry_times: 2,
            retry_sleep: Duration::from_millis(300),
            token_ttl: DEFAULT_TOKEN_TTL,
            token_cache_key_prefix: "fina:sdk:token:".to_string(),
            doc_types_ttl: Duration::from_secs(3600),
            doc_types_cache_key_prefix: "fina:sdk:doc-types:".to_string(),
            prefixes: Prefixes::default(),
            entries_chunk_days: 7,
            journal_chunk_days: 14,
        }
    }
}

impl Config {
    /// Create a new configuration with the given base URL and credentials
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Config {
            base_url: base_url.into(),
            login: login.into(),
            password: password.into(),
            ..Config::default()
        }
    }

    /// Load configuration from `FINA_*` environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            base_url: env::var("FINA_BASE_URL").unwrap_or_default(),
            login: env::var("FINA_LOGIN").unwrap_or_default(),
            password: env::var("FINA_PASSWORD").unwrap_or_default(),
            timeout: Duration::from_secs(env_or("FINA_TIMEOUT", defaults.timeout.as_secs())?),
            retry_times: env_or("FINA_RETRY_TIMES", defaults.retry_times)?,
            retry_sleep: Duration::from_millis(env_or(
                "FINA_RETRY_SLEEP_MS",
                defaults.retry_sleep.as_millis() as u64,
            )?),
            token_ttl: Duration::from_secs(env_or("FINA_TOKEN_TTL", defaults.token_ttl.as_secs())?),
            token_cache_key_prefix: env::var("FINA_TOKEN_CACHE_PREFIX")
                .unwrap_or(defaults.token_cache_key_prefix.clone()),
            doc_types_ttl: Duration::from_secs(env_or(
                "FINA_DOC_TYPES_TTL",
                defaults.doc_types_ttl.as_secs(),
            )?),
            ..defaults
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set transport retry attempts and the pause between them
    pub fn with_retry(mut self, times: u32, sleep: Duration) -> Self {
        self.retry_times = times;
        self.retry_sleep = sleep;
        self
    }

    /// Set the token cache TTL
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the token cache key prefix
    pub fn with_token_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.token_cache_key_prefix = prefix.into();
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    /// Validate and extract the immutable credentials
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(&self.base_url, &self.login, &self.password)
    }
}

/// Base URL plus login/password, validated once at construction
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    base_url: String,
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(base_url: &str, login: &str, password: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(FinaError::Config(
                "FINA base_url is missing. Set FINA_BASE_URL".to_string(),
            ));
        }
        if login.is_empty() || password.is_empty() {
            return Err(FinaError::Config(
                "FINA credentials are missing. Set FINA_LOGIN and FINA_PASSWORD".to_string(),
            ));
        }

        Ok(Credentials {
            base_url: base_url.to_string(),
            login: login.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry_times", &self.retry_times)
            .field("token_ttl", &self.token_ttl)
            .field("doc_types_ttl", &self.doc_types_ttl)
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

// Keep the password out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| FinaError::Config(format!("invalid value for {}: {}", key, raw))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new("https://fina.local:5007/", "user", "secret");
        assert_eq!(config.base_url(), "https://fina.local:5007");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.retry_times, 2);
        assert_eq!(config.token_ttl, Duration::from_secs(126_000));
        assert_eq!(config.prefixes.reporting, "/api/reporting");
    }

    #[test]
    fn test_credentials_missing_fields() {
        for (base, login, password) in [
            ("", "user", "secret"),
            ("https://fina.local", "", "secret"),
            ("https://fina.local", "user", ""),
            ("  /", "user", "secret"),
        ] {
            let result = Credentials::new(base, login, password);
            assert!(matches!(result, Err(FinaError::Config(_))), "{base:?} {login:?}");
        }
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("https://fina.local/", "user", "secret").unwrap();
        assert_eq!(creds.base_url(), "https://fina.local");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));

        let config = Config::new("https://fina.local", "user", "secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
