use crate::error::Result;
use crate::money::MoneyPayload;
use crate::payload::Payload;
use crate::response::Response;
use crate::rest::{module_path, FinaClient};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Result of a `saveDoc*` call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveDocResponse {
    /// Id of the saved document
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub ex: Option<Value>,
}

/// `/api/operation` document endpoints
pub struct DocumentsApi<'a> {
    client: &'a FinaClient,
}

impl<'a> DocumentsApi<'a> {
    pub fn new(client: &'a FinaClient) -> Self {
        DocumentsApi { client }
    }

    fn path(&self, method: &str) -> String {
        module_path(&self.client.config().prefixes.operation, method)
    }

    /// Save through any `saveDoc*` endpoint.
    ///
    /// The payload goes through the client's validator first; a rejected
    /// payload is never sent.
    pub fn save(&self, method: &str, payload: impl Into<Payload>) -> Result<SaveDocResponse> {
        debug!("saving document via {}", method);
        self.client
            .post_payload(
                &self.path(method),
                payload.into(),
                &format!("operation.{} returned ex", method),
            )?
            .apply()
    }

    /// Fetch through any `getDoc*` endpoint
    pub fn get_doc(&self, method: &str, id: i64) -> Result<Response> {
        self.client.get(
            &self.path(&format!("{}/{}", method, id)),
            Map::new(),
            &format!("operation.{} returned ex", method),
        )
    }

    pub fn save_customer_order(&self, payload: impl Into<Payload>) -> Result<SaveDocResponse> {
        self.save("saveDocCustomerOrder", payload)
    }

    pub fn save_production(&self, payload: impl Into<Payload>) -> Result<SaveDocResponse> {
        self.save("saveDocProduction", payload)
    }

    pub fn save_customer_money_in(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocCustomerMoneyIn", payload)
    }

    pub fn save_customer_money_out(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocCustomerMoneyOut", payload)
    }

    pub fn save_customer_money_return(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocCustomerMoneyReturn", payload)
    }

    pub fn save_vendor_money_in(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocVendorMoneyIn", payload)
    }

    pub fn save_vendor_money_out(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocVendorMoneyOut", payload)
    }

    pub fn save_vendor_money_return(&self, payload: MoneyPayload) -> Result<SaveDocResponse> {
        self.save("saveDocVendorMoneyReturn", payload)
    }

    pub fn get_customer_order(&self, id: i64) -> Result<Response> {
        self.get_doc("getDocCustomerOrder", id)
    }

    pub fn get_production(&self, id: i64) -> Result<Response> {
        self.get_doc("getDocProduction", id)
    }
}
