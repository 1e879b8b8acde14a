//! Circuit KPI records and the field accessor the scorer is written against.
//!
//! Rows arrive from the REST store (JSON objects) or from the CSV fallback
//! (typed cells), so a record is kept as a loose JSON object rather than a
//! fixed struct. Any column may be missing.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CIRCUIT_ID: &str = "circuit_id";
pub const REGION: &str = "region";
pub const PRODUCT: &str = "product";
pub const VENDOR: &str = "vendor";
pub const MODEL: &str = "model";
pub const SLA_TIER: &str = "sla_tier";

pub const UTILIZATION_PCT: &str = "utilization_pct";
pub const JITTER_MS: &str = "jitter_ms";
pub const PKT_LOSS_PCT: &str = "pkt_loss_pct";
pub const LATENCY_MS: &str = "latency_ms";
pub const CRC_ERR_RATE: &str = "crc_err_rate";
pub const BANDWIDTH_MBPS: &str = "bandwidth_mbps";

/// Columns filled with 0 when a dataset omits them
pub const KPI_COLUMNS: [&str; 6] = [
    UTILIZATION_PCT,
    JITTER_MS,
    PKT_LOSS_PCT,
    LATENCY_MS,
    CRC_ERR_RATE,
    BANDWIDTH_MBPS,
];

/// Read-only access to named fields of a record.
pub trait FieldAccess {
    fn field(&self, key: &str) -> Option<&Value>;

    /// Field as display text; numbers and booleans are rendered, null is absent.
    fn text(&self, key: &str) -> Option<String> {
        match self.field(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl FieldAccess for Map<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl FieldAccess for Value {
    fn field(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }
}

impl FieldAccess for HashMap<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl FieldAccess for BTreeMap<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

/// A value that could not be read as a number
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("field '{field}' is not numeric: {value}")]
pub struct CoercionError {
    pub field: String,
    pub value: String,
}

/// Numeric value of `key`. Absent, null and falsy values read as 0.
pub fn numeric_field<R: FieldAccess + ?Sized>(record: &R, key: &str) -> Result<f64, CoercionError> {
    let err = |value: &Value| CoercionError {
        field: key.to_string(),
        value: value.to_string(),
    };

    let Some(value) = record.field(key) else {
        return Ok(0.0);
    };
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| err(value)),
        Value::String(s) if s.is_empty() => Ok(0.0),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| err(value)),
        Value::Array(_) | Value::Object(_) => Err(err(value)),
    }
}

/// One circuit (or KPI reading) row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitRecord {
    fields: Map<String, Value>,
}

impl CircuitRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some` only for JSON objects
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn circuit_id(&self) -> Option<String> {
        self.text(CIRCUIT_ID)
    }

    pub fn region(&self) -> Option<String> {
        self.text(REGION)
    }

    pub fn sla_tier(&self) -> Option<String> {
        self.text(SLA_TIER)
    }

    /// Fill absent KPI columns with 0 so every row exposes the same set.
    pub fn ensure_kpi_columns(&mut self) {
        for col in KPI_COLUMNS {
            self.fields.entry(col.to_string()).or_insert(Value::from(0));
        }
    }
}

impl FieldAccess for CircuitRecord {
    fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}
