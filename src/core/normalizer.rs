//! Maps the loose key set a vision model replies with onto [`CoinAnalysisRecord`].

use crate::domain::model::CoinAnalysisRecord;
use crate::utils::error::{CoinError, Result};
use crate::utils::validation::validate_range;
use serde_json::{Map, Value};

/// Builds a record from a model reply.
///
/// Missing keys become `None`; the reply itself is kept verbatim in `raw_analysis`.
/// No range checks happen here, see [`validate_record`].
pub fn normalize(
    reply: &Map<String, Value>,
    filename: Option<&str>,
    model: &str,
) -> CoinAnalysisRecord {
    CoinAnalysisRecord {
        filename: filename.map(str::to_string),
        name: text_field(reply, "name"),
        country: text_field(reply, "country"),
        year: text_field(reply, "year"),
        denomination: text_field(reply, "denomination"),
        composition: text_field(reply, "composition"),
        mint_mark: text_field(reply, "mint_mark"),
        history: text_field(reply, "history"),
        features: text_field(reply, "features"),
        condition_estimate: text_field(reply, "condition_estimate"),
        estimated_value: text_field(reply, "estimated_value"),
        confidence: confidence_field(reply),
        model: Some(model.to_string()),
        raw_analysis: Some(reply.clone()),
    }
}

fn text_field(reply: &Map<String, Value>, key: &str) -> Option<String> {
    reply.get(key).and_then(value_to_text)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

fn confidence_field(reply: &Map<String, Value>) -> Option<f64> {
    match reply.get("confidence")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Schema check applied before a record is persisted.
pub fn validate_record(record: &CoinAnalysisRecord) -> Result<()> {
    if let Some(confidence) = record.confidence {
        validate_range("confidence", confidence, 0.0, 1.0).map_err(|_| {
            CoinError::InvalidRecordError {
                message: format!("confidence must be between 0 and 1, got {}", confidence),
            }
        })?;
    }
    Ok(())
}
