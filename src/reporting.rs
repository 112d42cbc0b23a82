//! Reporting endpoints and chunked range fetching.
//!
//! FINA times out on journal queries over long periods, so large ranges are
//! split into fixed-size windows, fetched one after another in ascending
//! order, and merged client-side with duplicates removed.

use crate::error::{FinaError, Result};
use crate::response::Response;
use crate::rest::{module_path, FinaClient};
use crate::time::to_fina;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use reqwest::Method;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;
use url::form_urlencoded;

/// Dedupe key function applied to each item of a chunked fetch
pub type DedupeKeyFn<'f> = &'f dyn Fn(&Value) -> String;

/// One sub-interval of a chunked fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Split `[from, to]` into consecutive windows of `chunk`.
///
/// The first window starts at midnight of `from`'s day, the last one ends
/// exactly at `to`. Empty when `from >= to` or `chunk` is not positive.
pub fn windows(from: NaiveDateTime, to: NaiveDateTime, chunk: Duration) -> Vec<Window> {
    let mut out = Vec::new();
    if from >= to || chunk <= Duration::zero() {
        return out;
    }

    let mut cursor = from.date().and_time(NaiveTime::MIN);
    while cursor < to {
        // past the calendar range means past `to`
        let end = match cursor.checked_add_signed(chunk) {
            Some(next) if next < to => next,
            _ => to,
        };
        out.push(Window { start: cursor, end });
        cursor = end;
    }
    out
}

/// Default merge identity of an item:
/// `idv:<id>:<version>`, else `id:<id>`, else `h:` + SHA-256 of its canonical JSON.
pub fn default_dedupe_key(item: &Value) -> String {
    let field = |name: &str| item.get(name).filter(|v| !v.is_null());

    match (field("id"), field("version")) {
        (Some(id), Some(version)) => format!("idv:{}:{}", scalar(id), scalar(version)),
        (Some(id), None) => format!("id:{}", scalar(id)),
        _ => {
            let mut canonical = String::new();
            write_canonical(item, &mut canonical);
            format!("h:{:x}", Sha256::digest(canonical.as_bytes()))
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON with object keys sorted at every level
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// First-seen-wins accumulator shared by all windows of one fetch
#[derive(Debug, Default)]
pub struct Merger {
    seen: HashSet<String>,
    items: Vec<Value>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the items whose key was not seen before, keeping their order
    pub fn extend<'v>(
        &mut self,
        items: impl IntoIterator<Item = &'v Value>,
        dedupe_key: Option<DedupeKeyFn<'_>>,
    ) {
        for item in items {
            let key = match dedupe_key {
                Some(f) => f(item),
                None => default_dedupe_key(item),
            };
            if self.seen.insert(key) {
                self.items.push(item.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

/// Merged collection of a chunked fetch
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResult {
    pub collection_key: String,
    /// Deduplicated items in first-seen order
    pub items: Vec<Value>,
    /// `ex` of the last window fetched; earlier windows' values are dropped
    pub trailing_error: Option<Value>,
}

impl MergedResult {
    /// `{ <collection_key>: [...], "ex": ... }`, the shape of a single-call response
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert(self.collection_key, Value::Array(self.items));
        map.insert("ex".to_string(), self.trailing_error.unwrap_or(Value::Null));
        Value::Object(map)
    }

    /// Deserialize the merged response shape into a typed DTO
    pub fn apply<T>(self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.into_value()).map_err(|e| e.into())
    }
}

/// `/api/reporting` endpoints
pub struct ReportingApi<'a> {
    client: &'a FinaClient,
}

impl<'a> ReportingApi<'a> {
    pub fn new(client: &'a FinaClient) -> Self {
        ReportingApi { client }
    }

    /// `<prefix>/<method>/<from>/<to>` with both dates URL-encoded
    pub fn range_path(&self, method: &str, from: &NaiveDateTime, to: &NaiveDateTime) -> String {
        let encode = |dt: &NaiveDateTime| -> String {
            form_urlencoded::byte_serialize(to_fina(dt).as_bytes()).collect()
        };
        module_path(
            &self.client.config().prefixes.reporting,
            &format!("{}/{}/{}", method, encode(from), encode(to)),
        )
    }

    /// Single call over the whole range; fails if `ex` is set
    pub fn get_range(&self, method: &str, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.client.get(
            &self.range_path(method, &from, &to),
            Map::new(),
            &format!("reporting.{} returned ex", method),
        )
    }

    /// Fetch `[from, to]` window by window and merge `collection_key`.
    ///
    /// Windows are requested sequentially. Any failing window aborts the
    /// whole fetch; nothing accumulated so far is returned.
    pub fn get_range_chunked(
        &self,
        method: &str,
        collection_key: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        chunk: Duration,
        dedupe_key: Option<DedupeKeyFn<'_>>,
    ) -> Result<MergedResult> {
        if chunk <= Duration::zero() {
            return Err(FinaError::Other(format!(
                "chunk size must be positive, got {}",
                chunk
            )));
        }

        let mut merger = Merger::new();
        let mut trailing_error = None;

        for window in windows(from, to, chunk) {
            let response = self.client.execute(
                Method::GET,
                &self.range_path(method, &window.start, &window.end),
                Map::new(),
            )?;

            let items = response.collection(collection_key);
            debug!(
                "{} window {} .. {}: {} items",
                method,
                to_fina(&window.start),
                to_fina(&window.end),
                items.len()
            );
            merger.extend(items, dedupe_key);
            trailing_error = response.ex().cloned();
        }

        Ok(MergedResult {
            collection_key: collection_key.to_string(),
            items: merger.into_items(),
            trailing_error,
        })
    }

    fn journal_chunked(
        &self,
        method: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        days: i64,
    ) -> Result<MergedResult> {
        self.get_range_chunked(method, "journals", from, to, Duration::days(days), None)
    }

    /// getEntriesJournal (raw)
    pub fn entries_journal(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.get_range("getEntriesJournal", from, to)
    }

    /// getCustomersMoneyJournal (raw)
    pub fn customers_money_journal(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.get_range("getCustomersMoneyJournal", from, to)
    }

    /// getVendorsMoneyJournal (raw)
    pub fn vendors_money_journal(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.get_range("getVendorsMoneyJournal", from, to)
    }

    /// getCustomersCycleReport (raw)
    pub fn customers_cycle_report(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.get_range("getCustomersCycleReport", from, to)
    }

    /// getVendorsCycleReport (raw)
    pub fn vendors_cycle_report(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Response> {
        self.get_range("getVendorsCycleReport", from, to)
    }

    pub fn entries_journal_chunked(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<MergedResult> {
        self.journal_chunked("getEntriesJournal", from, to, self.client.config().entries_chunk_days)
    }

    pub fn customers_money_journal_chunked(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<MergedResult> {
        let days = self.client.config().journal_chunk_days;
        self.journal_chunked("getCustomersMoneyJournal", from, to, days)
    }

    pub fn vendors_money_journal_chunked(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<MergedResult> {
        let days = self.client.config().journal_chunk_days;
        self.journal_chunked("getVendorsMoneyJournal", from, to, days)
    }

    pub fn customers_order_journal_chunked(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<MergedResult> {
        let days = self.client.config().journal_chunk_days;
        self.journal_chunked("getCustomersOrderJournal", from, to, days)
    }

    pub fn customers_return_journal_chunked(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<MergedResult> {
        let days = self.client.config().journal_chunk_days;
        self.journal_chunked("getCustomersReturnJournal", from, to, days)
    }

    pub fn productions_journal_chunked(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<MergedResult> {
        let days = self.client.config().journal_chunk_days;
        self.journal_chunked("getProductionsJournal", from, to, days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_windows_two_weeks_in_weekly_chunks() {
        let w = windows(day(2025, 1, 1), day(2025, 1, 14), Duration::days(7));
        assert_eq!(
            w,
            vec![
                Window { start: day(2025, 1, 1), end: day(2025, 1, 8) },
                Window { start: day(2025, 1, 8), end: day(2025, 1, 14) },
            ]
        );
    }

    #[test]
    fn test_windows_empty_range() {
        assert!(windows(day(2025, 1, 5), day(2025, 1, 5), Duration::days(7)).is_empty());
        assert!(windows(day(2025, 1, 6), day(2025, 1, 5), Duration::days(7)).is_empty());
        assert!(windows(day(2025, 1, 1), day(2025, 1, 5), Duration::zero()).is_empty());
    }

    #[test]
    fn test_windows_single_day_with_long_chunk() {
        let from = day(2025, 3, 2);
        let to = from + Duration::hours(23);
        assert_eq!(
            windows(from, to, Duration::days(14)),
            vec![Window { start: from, end: to }]
        );
    }

    #[test]
    fn test_windows_start_at_midnight_and_stay_contiguous() {
        let from = day(2025, 1, 1) + Duration::hours(15);
        let to = day(2025, 2, 3) + Duration::hours(6);
        let w = windows(from, to, Duration::days(7));

        assert_eq!(w[0].start, day(2025, 1, 1));
        assert_eq!(w.last().unwrap().end, to);
        for pair in w.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn test_windows_huge_chunk_is_clamped() {
        let w = windows(day(2025, 1, 1), day(2025, 1, 14), Duration::max_value());
        assert_eq!(w, vec![Window { start: day(2025, 1, 1), end: day(2025, 1, 14) }]);
    }

    #[test]
    fn test_windows_at_end_of_calendar() {
        let to = NaiveDateTime::MAX;
        let from = to - Duration::days(3);
        let w = windows(from, to, Duration::days(7));
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].start, from.date().and_time(NaiveTime::MIN));
        assert_eq!(w[0].end, to);

        let w = windows(to - Duration::days(20), to, Duration::days(7));
        assert_eq!(w.len(), 3);
        assert_eq!(w.last().unwrap().end, to);
    }

    #[test]
    fn test_default_dedupe_key_tiers() {
        assert_eq!(default_dedupe_key(&json!({"id": 1, "version": "a"})), "idv:1:a");
        assert_eq!(default_dedupe_key(&json!({"id": "X-1", "version": 3})), "idv:X-1:3");
        assert_eq!(default_dedupe_key(&json!({"id": 1, "version": null})), "id:1");
        assert_eq!(default_dedupe_key(&json!({"id": 7, "value": "v"})), "id:7");

        let hashed = default_dedupe_key(&json!({"amount": 5, "date": "2025-01-01"}));
        assert!(hashed.starts_with("h:"));
        assert_eq!(hashed.len(), 2 + 64);
    }

    #[test]
    fn test_hash_key_ignores_field_order() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": {"x": [1, 2], "y": null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": {"y": null, "x": [1, 2]}, "a": 1}"#).unwrap();
        let c: Value = serde_json::from_str(r#"{"b": {"y": null, "x": [2, 1]}, "a": 1}"#).unwrap();
        assert_eq!(default_dedupe_key(&a), default_dedupe_key(&b));
        assert_ne!(default_dedupe_key(&a), default_dedupe_key(&c));
    }

    #[test]
    fn test_merger_keeps_first_copy_in_order() {
        let window_a = vec![json!({"id": 1, "version": "a"}), json!({"id": 2, "version": "b"})];
        let window_b = vec![json!({"id": 1, "version": "a"}), json!({"id": 3, "version": "c"})];

        let mut merger = Merger::new();
        merger.extend(&window_a, None);
        merger.extend(&window_b, None);

        assert_eq!(
            merger.into_items(),
            vec![
                json!({"id": 1, "version": "a"}),
                json!({"id": 2, "version": "b"}),
                json!({"id": 3, "version": "c"}),
            ]
        );
    }

    #[test]
    fn test_merger_id_only_fallback() {
        let mut merger = Merger::new();
        merger.extend(&[json!({"id": 1, "value": "first"})], None);
        merger.extend(&[json!({"id": 1, "value": "first-dup"})], None);
        assert_eq!(merger.into_items(), vec![json!({"id": 1, "value": "first"})]);
    }

    #[test]
    fn test_merger_custom_key() {
        let by_doc = |item: &Value| item["doc_num"].to_string();
        let mut merger = Merger::new();
        merger.extend(
            &[
                json!({"id": 1, "doc_num": "D1"}),
                json!({"id": 2, "doc_num": "D1"}),
                json!({"id": 3, "doc_num": "D2"}),
            ],
            Some(&by_doc),
        );
        assert_eq!(merger.len(), 2);
    }

    #[test]
    fn test_merged_result_into_value() {
        let merged = MergedResult {
            collection_key: "reports".to_string(),
            items: vec![json!({"id": 1})],
            trailing_error: None,
        };
        assert_eq!(merged.into_value(), json!({"reports": [{"id": 1}], "ex": null}));
    }
}
