//! Boundary contracts: loosely-typed upstream records in, validated caller
//! payloads in. Everything past this module works with typed values only.

use crate::domain::criteria::{FilterCriteria, DEFAULT_TOP_N};
use crate::domain::recommendation::{MaxRisk, Metrics, RecommendationRecord};
use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A caller payload field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid field `{}`: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Coerces a loose confidence value to a finite real. Never fails: anything that
/// cannot be read as a number becomes 0.0.
pub fn normalize_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn records_from_loose(values: &[Value]) -> anyhow::Result<Vec<RecommendationRecord>> {
    values
        .iter()
        .enumerate()
        .map(|(idx, v)| record_from_loose(v).with_context(|| format!("recommendation #{idx}")))
        .collect()
}

pub fn record_from_loose(value: &Value) -> anyhow::Result<RecommendationRecord> {
    let Value::Object(obj) = value else {
        bail!("expected a JSON object, got {value}");
    };

    Ok(RecommendationRecord {
        symbol: text_field(obj, "symbol"),
        name: text_field(obj, "name"),
        recommendation: text_field(obj, "recommendation"),
        risk_level: text_field(obj, "risk_level"),
        potential: text_field(obj, "potential"),
        confidence: normalize_confidence(obj.get("confidence")),
        metrics: obj.get("metrics").and_then(metrics_from_loose),
    })
}

fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn metrics_from_loose(value: &Value) -> Option<Metrics> {
    let obj = value.as_object()?;
    Some(Metrics {
        price: obj.get("price")?.as_f64()?,
        percent_change_24h: obj.get("percent_change_24h")?.as_f64()?,
    })
}

/// Validates a recommendation request body and builds the criteria for it.
///
/// Absent fields take their defaults; present fields must have the right type.
/// `symbol` may be null. Unknown keys are ignored.
pub fn criteria_from_request(body: &Value) -> Result<FilterCriteria, ValidationError> {
    let Value::Object(obj) = body else {
        return Err(ValidationError::new("body", "expected a JSON object"));
    };

    let top_n = match obj.get("top_n") {
        None => DEFAULT_TOP_N,
        Some(v) => integer(v).ok_or_else(|| ValidationError::new("top_n", "expected an integer"))?,
    };

    let max_risk = match obj.get("max_risk") {
        None => MaxRisk::default(),
        Some(Value::String(s)) => MaxRisk::from_label(s).ok_or_else(|| {
            ValidationError::new(
                "max_risk",
                format!("expected one of {}, got {s:?}", MaxRisk::LABELS.join(", ")),
            )
        })?,
        Some(_) => {
            return Err(ValidationError::new(
                "max_risk",
                format!("expected one of {}", MaxRisk::LABELS.join(", ")),
            ))
        }
    };

    let min_confidence = match obj.get("min_confidence") {
        None => 0.0,
        Some(v) => v
            .as_f64()
            .ok_or_else(|| ValidationError::new("min_confidence", "expected a number"))?,
    };

    let symbol = match obj.get("symbol") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ValidationError::new("symbol", "expected a string or null")),
    };

    Ok(FilterCriteria::new(top_n, max_risk, min_confidence, symbol))
}

fn integer(v: &Value) -> Option<i64> {
    let Value::Number(n) = v else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.as_u64().is_some() {
        return Some(i64::MAX);
    }
    // Integer literals beyond 64 bits and whole floats such as `5.0` arrive as
    // f64. The cast saturates, and the clamp downstream bounds the result.
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}
