//! Turns a free-text visit note into interaction fields.
//!
//! The model is asked for a JSON object. Anything else degrades to an empty
//! field set with the reason attached, so a chat request never fails on
//! malformed model output.

use serde_json::Value;

use hcplog_core::domain::interaction::{InteractionField, InteractionFields};
use hcplog_core::flows::{Extraction, ExtractionDegraded};

pub fn extraction_prompt(message: &str) -> String {
    let fields =
        InteractionField::ALL.iter().map(InteractionField::as_str).collect::<Vec<_>>().join(", ");

    format!(
        "Extract structured fields from this interaction log.\n\
         Fields: {fields}.\n\
         If a field is not mentioned, return null. Return JSON only.\n\
         \n\
         Message: {message}\n"
    )
}

pub fn parse_extraction(raw: &str) -> Extraction {
    let body = strip_code_fence(raw.trim());
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(error) => return Extraction::degraded(ExtractionDegraded::InvalidJson(error.to_string())),
    };
    let Value::Object(object) = value else {
        return Extraction::degraded(ExtractionDegraded::NotAnObject);
    };

    let mut fields = InteractionFields::default();
    for field in InteractionField::ALL {
        fields.set(field, object.get(field.as_str()).and_then(coerce_text));
    }
    Extraction::parsed(fields)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.split_once('\n') {
        Some((_language, body)) => body,
        None => rest.trim_start_matches("json"),
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts = items.iter().filter_map(coerce_text).collect::<Vec<_>>();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => Some(value.to_string()),
    }
}
