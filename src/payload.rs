use crate::error::{FinaError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Record `message` for `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok` when no error was recorded
    pub fn into_result(self) -> std::result::Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Request payload that renders itself to the key/value form FINA expects
pub trait StructuredPayload: Send + Sync {
    fn to_map(&self) -> Map<String, Value>;

    fn validate(&self) -> std::result::Result<(), FieldErrors> {
        Ok(())
    }
}

/// Body of a document call, resolved once at the call boundary
pub enum Payload {
    Structured(Box<dyn StructuredPayload>),
    /// Already in final form, sent as-is
    Raw(Map<String, Value>),
}

impl Payload {
    pub fn structured(payload: impl StructuredPayload + 'static) -> Self {
        Payload::Structured(Box::new(payload))
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            Payload::Structured(p) => p.to_map(),
            Payload::Raw(map) => map.clone(),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Structured(p) => f.debug_tuple("Structured").field(&p.to_map()).finish(),
            Payload::Raw(map) => f.debug_tuple("Raw").field(map).finish(),
        }
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Raw(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = FinaError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Payload::Raw(map)),
            other => Err(FinaError::Other(format!(
                "payload must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Pre-send hook. An error here means the request is never sent.
pub trait Validator: Send + Sync {
    fn validate(&self, payload: &Payload) -> Result<()>;
}

/// Runs the payload's own rules; raw maps pass unchecked
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadValidator;

impl Validator for PayloadValidator {
    fn validate(&self, payload: &Payload) -> Result<()> {
        match payload {
            Payload::Structured(p) => p
                .validate()
                .map_err(|errors| FinaError::Validation { errors }),
            Payload::Raw(_) => Ok(()),
        }
    }
}
