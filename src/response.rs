use crate::error::{FinaError, Result};
use serde_json::{Map, Value};

/// Decoded JSON object returned by a FINA call.
///
/// FINA reports business errors in-band through the `ex` field, even on
/// HTTP 200 responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    data: Map<String, Value>,
}

impl Response {
    pub fn new(data: Map<String, Value>) -> Self {
        Response { data }
    }

    /// Decode a 2xx body. Anything that is not a JSON object decodes as an
    /// empty object; some endpoints answer with empty or irregular bodies.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(data)) => Response { data },
            _ => Response::default(),
        }
    }

    /// Get the raw object
    pub fn raw(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_raw(self) -> Map<String, Value> {
        self.data
    }

    /// The `ex` field, `None` if absent or null
    pub fn ex(&self) -> Option<&Value> {
        self.data.get("ex").filter(|v| !v.is_null())
    }

    /// Fail with a remote error if `ex` is set
    pub fn ensure_ok(self, context: &str) -> Result<Self> {
        match self.ex() {
            Some(ex) => Err(FinaError::remote(ex.clone(), context)),
            None => Ok(self),
        }
    }

    /// Items of a named collection; absent or non-array reads as empty
    pub fn collection(&self, key: &str) -> &[Value] {
        match self.data.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Deserialize the whole object into `T`
    pub fn apply<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| e.into())
    }

    /// Get a value by a slash-separated path.
    /// For example, "production/lines/0" walks into objects and arrays.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());

        let mut current = self.data.get(parts.next()?)?;

        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Get a string value by a slash-separated path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}
