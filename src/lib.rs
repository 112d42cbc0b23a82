//! # fina - blocking client for the FINA accounting Web API
//!
//! Authenticates with login/password, caches the bearer token, re-authenticates
//! transparently when the service answers 401, and fetches large journal
//! ranges in sequential windows that are merged and deduplicated client-side.
//!
//! ## Features
//!
//! - Token cache keyed by base URL and login, shared by every client of the
//!   same account (in-memory or JSON file store)
//! - One self-healing retry per call on HTTP 401, never more
//! - Chunked range fetch with first-seen deduplication
//! - Distinct errors for transport failures, remote `ex` rejections and
//!   invalid payloads
//!
//! ## Basic Usage
//!
//! ```no_run
//! use fina::{Config, FinaClient};
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), fina::FinaError> {
//!     let client = FinaClient::new(Config::from_env()?)?;
//!
//!     let stores = client.reference().stores()?;
//!     println!("stores: {:?}", stores.get("stores"));
//!
//!     let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!     let to = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!     let journal = client.reporting().entries_journal_chunked(from, to)?;
//!     println!("{} journal rows", journal.items.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Saving documents
//!
//! ```no_run
//! use fina::{Config, FinaClient, FinaDateTime, MoneyPayload};
//! use chrono::NaiveDate;
//!
//! let client = FinaClient::new(Config::new("https://fina.local:5007", "user", "secret"))?;
//! let date = FinaDateTime::from_date(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
//! let payload = MoneyPayload::customer(10, date, "invoice 42", 150.0)
//!     .with_place(1, 1, 1)
//!     .with_currency("GEL", 1.0);
//!
//! let saved = client.documents().save_customer_money_in(payload)?;
//! println!("saved document {}", saved.id);
//! # Ok::<(), fina::FinaError>(())
//! ```

pub mod auth;
pub mod client;
pub mod documents;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod payload;
pub mod reference;
pub mod reporting;
pub mod response;
pub mod rest;
pub mod time;
pub mod token;
pub mod transport;

// Re-export main types for convenience
pub use auth::AuthClient;
pub use client::{Config, Credentials, Prefixes};
pub use documents::{DocumentsApi, SaveDocResponse};
pub use error::{FinaError, Result};
pub use loyalty::{BonusCoeffResponse, BonusOperationPayload, BonusOperationResponse, LoyaltyApi};
pub use money::{AddField, EntityRole, MoneyPayload};
pub use payload::{FieldErrors, Payload, PayloadValidator, StructuredPayload, Validator};
pub use reference::{DocType, ReferenceApi};
pub use reporting::{default_dedupe_key, windows, MergedResult, ReportingApi, Window};
pub use response::Response;
pub use rest::FinaClient;
pub use time::FinaDateTime;
pub use token::{cache_key, FileStore, KeyValueStore, MemoryStore, TokenCache};
pub use transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport};

// Re-export for building requests and payloads
pub use reqwest::Method;
pub use serde_json::json;
