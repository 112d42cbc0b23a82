use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// Wire format of FINA dates: `yyyy-MM-ddTHH:mm:ss`, no zone, no fraction
pub const FINA_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a timestamp the way FINA expects it
pub fn to_fina(dt: &NaiveDateTime) -> String {
    dt.format(FINA_FORMAT).to_string()
}

/// Date/time wrapper that serializes in the FINA wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinaDateTime(pub NaiveDateTime);

impl FinaDateTime {
    pub fn new(dt: NaiveDateTime) -> Self {
        FinaDateTime(dt)
    }

    /// Midnight of the given calendar day
    pub fn from_date(date: NaiveDate) -> Self {
        FinaDateTime(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Parse `yyyy-MM-ddTHH:mm:ss`; fractional seconds are accepted and dropped
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")?;
        Ok(FinaDateTime(dt.with_nanosecond(0).unwrap_or(dt)))
    }
}

impl fmt::Display for FinaDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FINA_FORMAT))
    }
}

impl Deref for FinaDateTime {
    type Target = NaiveDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<NaiveDateTime> for FinaDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        FinaDateTime(dt)
    }
}

impl From<FinaDateTime> for NaiveDateTime {
    fn from(t: FinaDateTime) -> Self {
        t.0
    }
}

impl Serialize for FinaDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FinaDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FinaDateTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}
