use crate::error::Result;
use crate::payload::{FieldErrors, Payload, StructuredPayload};
use crate::response::Response;
use crate::rest::{module_path, FinaClient};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::form_urlencoded;

/// Bonus accrual (`coeff` 1) or redemption (`coeff` -1) on a loyalty card
#[derive(Debug, Clone, PartialEq)]
pub struct BonusOperationPayload {
    pub card_id: i64,
    /// Operation the bonus refers to, 0 for none
    pub ref_id: i64,
    pub coeff: i64,
    pub amount: f64,
}

impl BonusOperationPayload {
    pub fn new(card_id: i64, ref_id: i64, coeff: i64, amount: f64) -> Self {
        BonusOperationPayload {
            card_id,
            ref_id,
            coeff,
            amount,
        }
    }

    pub fn accrue(card_id: i64, ref_id: i64, amount: f64) -> Self {
        Self::new(card_id, ref_id, 1, amount)
    }

    pub fn redeem(card_id: i64, ref_id: i64, amount: f64) -> Self {
        Self::new(card_id, ref_id, -1, amount)
    }
}

impl StructuredPayload for BonusOperationPayload {
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("card_id".into(), json!(self.card_id));
        map.insert("ref_id".into(), json!(self.ref_id));
        map.insert("coeff".into(), json!(self.coeff));
        map.insert("amount".into(), json!(self.amount));
        map
    }

    fn validate(&self) -> std::result::Result<(), FieldErrors> {
        let mut e = FieldErrors::default();
        e.check(self.card_id >= 1, "card_id", "must be at least 1");
        e.check(self.ref_id >= 0, "ref_id", "must be at least 0");
        e.check(self.coeff == 1 || self.coeff == -1, "coeff", "must be 1 or -1");
        e.check(self.amount.is_finite() && self.amount > 0.0, "amount", "must be greater than 0");
        e.into_result()
    }
}

impl From<BonusOperationPayload> for Payload {
    fn from(payload: BonusOperationPayload) -> Self {
        Payload::structured(payload)
    }
}

/// Result of `saveDocBonusOperation`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BonusOperationResponse {
    #[serde(default)]
    pub res: bool,
    #[serde(default)]
    pub ex: Option<Value>,
}

/// Result of `getBonusCoeff`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BonusCoeffResponse {
    #[serde(default)]
    pub coeff: f64,
    #[serde(default)]
    pub ex: Option<Value>,
}

/// `/api/operation` loyalty card and bonus endpoints
pub struct LoyaltyApi<'a> {
    client: &'a FinaClient,
}

impl<'a> LoyaltyApi<'a> {
    pub fn new(client: &'a FinaClient) -> Self {
        LoyaltyApi { client }
    }

    fn path(&self, method: &str) -> String {
        module_path(&self.client.config().prefixes.operation, method)
    }

    /// getBonusCoeff
    pub fn bonus_coeff(&self) -> Result<BonusCoeffResponse> {
        self.client
            .get(
                &self.path("getBonusCoeff"),
                Map::new(),
                "operation.getBonusCoeff returned ex",
            )?
            .apply()
    }

    /// getLoyaltyCardsByHolder (raw, cards under `cards`)
    pub fn cards_by_holder(&self, holder_code: &str) -> Result<Response> {
        // path segment: spaces as %20, not `+`
        let encoded: String = form_urlencoded::byte_serialize(holder_code.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        self.client.get(
            &self.path(&format!("getLoyaltyCardsByHolder/{}", encoded)),
            Map::new(),
            "operation.getLoyaltyCardsByHolder returned ex",
        )
    }

    /// saveDocBonusOperation; the payload is validated before sending
    pub fn save_bonus_operation(
        &self,
        payload: impl Into<Payload>,
    ) -> Result<BonusOperationResponse> {
        self.client
            .post_payload(
                &self.path("saveDocBonusOperation"),
                payload.into(),
                "operation.saveDocBonusOperation returned ex",
            )?
            .apply()
    }
}
