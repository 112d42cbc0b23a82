use crate::error::Result;
use crate::response::Response;
use crate::rest::{module_path, FinaClient};
use crate::token::cache_key;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Document type as listed by `getDocTypes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocType {
    /// Semantic type code; lookups match on this, not on any row id
    #[serde(rename = "type", default)]
    pub type_code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_supported: bool,
}

/// `/api/operation` reference data endpoints
pub struct ReferenceApi<'a> {
    client: &'a FinaClient,
}

impl<'a> ReferenceApi<'a> {
    pub fn new(client: &'a FinaClient) -> Self {
        ReferenceApi { client }
    }

    fn get(&self, method: &str) -> Result<Response> {
        self.client.get(
            &module_path(&self.client.config().prefixes.operation, method),
            Map::new(),
            &format!("operation.{} returned ex", method),
        )
    }

    /// getStores (raw)
    pub fn stores(&self) -> Result<Response> {
        self.get("getStores")
    }

    /// getCustomers, items of `contragents`
    pub fn customers(&self) -> Result<Vec<Value>> {
        Ok(self.get("getCustomers")?.collection("contragents").to_vec())
    }

    /// getVendors, items of `contragents`
    pub fn vendors(&self) -> Result<Vec<Value>> {
        Ok(self.get("getVendors")?.collection("contragents").to_vec())
    }

    /// getDocTypes; the list comes under `doc_types`
    pub fn doc_types(&self) -> Result<Vec<DocType>> {
        self.get("getDocTypes")?
            .collection("doc_types")
            .iter()
            .map(|t| serde_json::from_value(t.clone()).map_err(Into::into))
            .collect()
    }

    pub fn supported_doc_types(&self) -> Result<Vec<DocType>> {
        Ok(supported(self.doc_types()?))
    }

    /// Store slot of the doc type list, one per base URL and login
    pub fn doc_types_cache_key(&self) -> String {
        let credentials = self.client.credentials();
        cache_key(
            &self.client.config().doc_types_cache_key_prefix,
            credentials.base_url(),
            credentials.login(),
        )
    }

    /// getDocTypes through the client's store.
    ///
    /// `ttl` defaults to `Config::doc_types_ttl`. An unreadable cached value is
    /// refetched.
    pub fn doc_types_cached(&self, ttl: Option<Duration>) -> Result<Vec<DocType>> {
        let store = self.client.store();
        let key = self.doc_types_cache_key();

        if let Some(raw) = store.get(&key) {
            match serde_json::from_str(&raw) {
                Ok(types) => {
                    debug!("doc types served from cache");
                    return Ok(types);
                }
                Err(e) => warn!("discarding unreadable cached doc types: {}", e),
            }
        }

        let types = self.doc_types()?;
        let ttl = ttl.unwrap_or(self.client.config().doc_types_ttl);
        store.put(&key, &serde_json::to_string(&types)?, ttl)?;
        Ok(types)
    }

    pub fn supported_doc_types_cached(&self, ttl: Option<Duration>) -> Result<Vec<DocType>> {
        Ok(supported(self.doc_types_cached(ttl)?))
    }

    /// Doc type with the given `type` code
    pub fn find_doc_type(&self, type_code: i64) -> Result<Option<DocType>> {
        Ok(self
            .doc_types()?
            .into_iter()
            .find(|t| t.type_code == type_code))
    }

    pub fn is_doc_type_supported(&self, type_code: i64) -> Result<bool> {
        Ok(self
            .find_doc_type(type_code)?
            .map(|t| t.api_supported)
            .unwrap_or(false))
    }
}

fn supported(types: Vec<DocType>) -> Vec<DocType> {
    types.into_iter().filter(|t| t.api_supported).collect()
}
