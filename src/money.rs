use crate::payload::{FieldErrors, Payload, StructuredPayload};
use crate::time::FinaDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Which side of a money document the contragent is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    Customer,
    Vendor,
}

impl EntityRole {
    /// Field name carrying the contragent id
    pub fn key(&self) -> &'static str {
        match self {
            EntityRole::Customer => "customer",
            EntityRole::Vendor => "vendor",
        }
    }
}

/// Additional user-defined document field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddField {
    pub field: String,
    pub value: String,
}

impl AddField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        AddField {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Money in/out/return document for a customer or a vendor
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyPayload {
    pub role: EntityRole,
    /// Customer or vendor id, depending on `role`
    pub entity_id: i64,
    /// 0 creates a new document
    pub id: i64,
    pub date: FinaDateTime,
    pub num_prefix: String,
    pub num: i64,
    pub purpose: String,
    pub amount: f64,
    pub currency: String,
    pub rate: f64,
    pub store: i64,
    pub user: i64,
    pub staff: i64,
    pub project: i64,
    pub pay_type: i64,
    pub pay_type_id: i64,
    pub ref_id: i64,
    pub make_entry: bool,
    pub add_fields: Vec<AddField>,
}

impl MoneyPayload {
    /// New document at rate 1 with entry generation on; currency and place
    /// (store, user, staff) still have to be set
    pub fn new(
        role: EntityRole,
        entity_id: i64,
        date: FinaDateTime,
        purpose: impl Into<String>,
        amount: f64,
    ) -> Self {
        MoneyPayload {
            role,
            entity_id,
            id: 0,
            date,
            num_prefix: String::new(),
            num: 0,
            purpose: purpose.into(),
            amount,
            currency: String::new(),
            rate: 1.0,
            store: 0,
            user: 0,
            staff: 0,
            project: 0,
            pay_type: 0,
            pay_type_id: 0,
            ref_id: 0,
            make_entry: true,
            add_fields: Vec::new(),
        }
    }

    pub fn customer(customer: i64, date: FinaDateTime, purpose: impl Into<String>, amount: f64) -> Self {
        Self::new(EntityRole::Customer, customer, date, purpose, amount)
    }

    pub fn vendor(vendor: i64, date: FinaDateTime, purpose: impl Into<String>, amount: f64) -> Self {
        Self::new(EntityRole::Vendor, vendor, date, purpose, amount)
    }

    /// Set store, user and staff
    pub fn with_place(mut self, store: i64, user: i64, staff: i64) -> Self {
        self.store = store;
        self.user = user;
        self.staff = staff;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>, rate: f64) -> Self {
        self.currency = currency.into();
        self.rate = rate;
        self
    }

    pub fn with_pay_type(mut self, pay_type: i64, pay_type_id: i64) -> Self {
        self.pay_type = pay_type;
        self.pay_type_id = pay_type_id;
        self
    }

    pub fn with_add_field(mut self, field: AddField) -> Self {
        self.add_fields.push(field);
        self
    }
}

impl StructuredPayload for MoneyPayload {
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("date".into(), json!(self.date.to_string()));
        map.insert("num_pfx".into(), json!(self.num_prefix));
        map.insert("num".into(), json!(self.num));
        map.insert("purpose".into(), json!(self.purpose));
        map.insert("amount".into(), json!(self.amount));
        map.insert("currency".into(), json!(self.currency));
        map.insert("rate".into(), json!(self.rate));
        map.insert("store".into(), json!(self.store));
        map.insert("user".into(), json!(self.user));
        map.insert("staff".into(), json!(self.staff));
        map.insert("project".into(), json!(self.project));
        map.insert(self.role.key().into(), json!(self.entity_id));
        map.insert("pay_type".into(), json!(self.pay_type));
        map.insert("pay_type_id".into(), json!(self.pay_type_id));
        map.insert("ref_id".into(), json!(self.ref_id));
        map.insert("make_entry".into(), json!(self.make_entry));
        map.insert("add_fields".into(), json!(self.add_fields));
        map
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut e = FieldErrors::default();

        e.check(self.id >= 0, "id", "must be at least 0");
        e.check(self.num_prefix.chars().count() <= 20, "num_pfx", "may not be longer than 20 characters");
        e.check(self.num >= 0, "num", "must be at least 0");
        e.check(!self.purpose.trim().is_empty(), "purpose", "is required");
        e.check(self.purpose.chars().count() <= 750, "purpose", "may not be longer than 750 characters");

        e.check(self.amount.is_finite() && self.amount > 0.0, "amount", "must be greater than 0");
        e.check(!self.currency.trim().is_empty(), "currency", "is required");
        e.check(self.currency.chars().count() <= 10, "currency", "may not be longer than 10 characters");
        e.check(self.rate.is_finite() && self.rate > 0.0, "rate", "must be greater than 0");

        e.check(self.store >= 1, "store", "must be at least 1");
        e.check(self.user >= 1, "user", "must be at least 1");
        e.check(self.staff >= 1, "staff", "must be at least 1");
        e.check(self.project >= 0, "project", "must be at least 0");
        e.check(self.entity_id >= 1, self.role.key(), "must be at least 1");

        e.check(self.pay_type >= 0, "pay_type", "must be at least 0");
        e.check(self.pay_type_id >= 0, "pay_type_id", "must be at least 0");
        e.check(self.ref_id >= 0, "ref_id", "must be at least 0");

        for (i, add) in self.add_fields.iter().enumerate() {
            e.check(!add.field.is_empty(), &format!("add_fields.{}.field", i), "is required");
            e.check(!add.value.is_empty(), &format!("add_fields.{}.value", i), "is required");
        }

        e.into_result()
    }
}

impl From<MoneyPayload> for Payload {
    fn from(payload: MoneyPayload) -> Self {
        Payload::structured(payload)
    }
}
