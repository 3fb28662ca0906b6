use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::hcp::HcpId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(pub i64);

impl std::fmt::Display for InteractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editable content columns of an interaction, in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionField {
    InteractionType,
    Sentiment,
    Topics,
    Outcomes,
    FollowUpActions,
    Attendees,
    Materials,
    Samples,
}

impl InteractionField {
    pub const ALL: [InteractionField; 8] = [
        Self::InteractionType,
        Self::Sentiment,
        Self::Topics,
        Self::Outcomes,
        Self::FollowUpActions,
        Self::Attendees,
        Self::Materials,
        Self::Samples,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InteractionType => "interaction_type",
            Self::Sentiment => "sentiment",
            Self::Topics => "topics",
            Self::Outcomes => "outcomes",
            Self::FollowUpActions => "follow_up_actions",
            Self::Attendees => "attendees",
            Self::Materials => "materials",
            Self::Samples => "samples",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == raw)
    }
}

impl std::fmt::Display for InteractionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The free-text content of one logged contact. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionFields {
    #[serde(default)]
    pub interaction_type: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topics: Option<String>,
    #[serde(default)]
    pub outcomes: Option<String>,
    #[serde(default)]
    pub follow_up_actions: Option<String>,
    #[serde(default)]
    pub attendees: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub samples: Option<String>,
}

impl InteractionFields {
    pub fn get(&self, field: InteractionField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: InteractionField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    pub fn is_blank(&self) -> bool {
        InteractionField::ALL.into_iter().all(|field| self.get(field).is_none())
    }

    fn slot(&self, field: InteractionField) -> &Option<String> {
        match field {
            InteractionField::InteractionType => &self.interaction_type,
            InteractionField::Sentiment => &self.sentiment,
            InteractionField::Topics => &self.topics,
            InteractionField::Outcomes => &self.outcomes,
            InteractionField::FollowUpActions => &self.follow_up_actions,
            InteractionField::Attendees => &self.attendees,
            InteractionField::Materials => &self.materials,
            InteractionField::Samples => &self.samples,
        }
    }

    fn slot_mut(&mut self, field: InteractionField) -> &mut Option<String> {
        match field {
            InteractionField::InteractionType => &mut self.interaction_type,
            InteractionField::Sentiment => &mut self.sentiment,
            InteractionField::Topics => &mut self.topics,
            InteractionField::Outcomes => &mut self.outcomes,
            InteractionField::FollowUpActions => &mut self.follow_up_actions,
            InteractionField::Attendees => &mut self.attendees,
            InteractionField::Materials => &mut self.materials,
            InteractionField::Samples => &mut self.samples,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub hcp_id: HcpId,
    #[serde(flatten)]
    pub fields: InteractionFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub hcp_id: HcpId,
    #[serde(flatten)]
    pub fields: InteractionFields,
}

/// How a patch treats keys outside the editable allow-list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchPolicy {
    /// Unknown keys and structured values reject the whole patch.
    #[default]
    Strict,
    /// Unknown keys are skipped; structured values are stored as JSON text.
    Lenient,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("unknown interaction field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` expects text or null, got {kind}")]
    InvalidValue { field: InteractionField, kind: &'static str },
}

/// A validated set of field assignments, applied in the order received.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractionPatch {
    assignments: Vec<(InteractionField, Option<String>)>,
    ignored: Vec<String>,
}

impl InteractionPatch {
    pub fn from_json(raw: &Map<String, Value>, policy: PatchPolicy) -> Result<Self, PatchError> {
        let mut patch = Self::default();

        for (key, value) in raw {
            let Some(field) = InteractionField::parse(key) else {
                match policy {
                    PatchPolicy::Strict => return Err(PatchError::UnknownField(key.clone())),
                    PatchPolicy::Lenient => {
                        patch.ignored.push(key.clone());
                        continue;
                    }
                }
            };

            let text = match value {
                Value::Null => None,
                Value::String(text) => Some(text.clone()),
                Value::Bool(flag) => Some(flag.to_string()),
                Value::Number(number) => Some(number.to_string()),
                Value::Array(_) | Value::Object(_) => match policy {
                    PatchPolicy::Strict => {
                        return Err(PatchError::InvalidValue { field, kind: json_kind(value) })
                    }
                    PatchPolicy::Lenient => Some(value.to_string()),
                },
            };
            patch.assignments.push((field, text));
        }

        Ok(patch)
    }

    pub fn set(mut self, field: InteractionField, value: Option<String>) -> Self {
        self.assignments.push((field, value));
        self
    }

    pub fn apply_to(&self, fields: &mut InteractionFields) {
        for (field, value) in &self.assignments {
            fields.set(*field, value.clone());
        }
    }

    pub fn touched_fields(&self) -> Vec<InteractionField> {
        self.assignments.iter().map(|(field, _)| *field).collect()
    }

    pub fn ignored_keys(&self) -> &[String] {
        &self.ignored
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        InteractionField, InteractionFields, InteractionPatch, PatchError, PatchPolicy,
    };

    fn as_map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn field_names_round_trip_through_parse() {
        for field in InteractionField::ALL {
            assert_eq!(InteractionField::parse(field.as_str()), Some(field));
        }
        assert_eq!(InteractionField::parse("hcp_id"), None);
    }

    #[test]
    fn strict_patch_rejects_unknown_keys() {
        let raw = as_map(json!({ "sentiment": "neutral", "favourite_color": "blue" }));

        let error = InteractionPatch::from_json(&raw, PatchPolicy::Strict).unwrap_err();
        assert_eq!(error, PatchError::UnknownField("favourite_color".to_string()));
    }

    #[test]
    fn lenient_patch_skips_unknown_keys_and_applies_the_rest() {
        let raw = as_map(json!({ "sentiment": "neutral", "favourite_color": "blue" }));
        let patch = InteractionPatch::from_json(&raw, PatchPolicy::Lenient).expect("lenient");

        let mut fields = InteractionFields {
            sentiment: Some("positive".to_string()),
            topics: Some("Drug X".to_string()),
            ..InteractionFields::default()
        };
        patch.apply_to(&mut fields);

        assert_eq!(fields.sentiment.as_deref(), Some("neutral"));
        assert_eq!(fields.topics.as_deref(), Some("Drug X"));
        assert_eq!(patch.ignored_keys(), ["favourite_color".to_string()]);
    }

    #[test]
    fn structured_values_are_rejected_only_under_strict_policy() {
        let raw = as_map(json!({ "attendees": ["Dr. Lee", "Nurse Kim"] }));

        assert!(matches!(
            InteractionPatch::from_json(&raw, PatchPolicy::Strict),
            Err(PatchError::InvalidValue { field: InteractionField::Attendees, kind: "array" })
        ));

        let patch = InteractionPatch::from_json(&raw, PatchPolicy::Lenient).expect("lenient");
        let mut fields = InteractionFields::default();
        patch.apply_to(&mut fields);
        assert_eq!(fields.attendees.as_deref(), Some(r#"["Dr. Lee","Nurse Kim"]"#));
    }

    #[test]
    fn null_clears_and_scalars_become_text() {
        let raw = as_map(json!({ "samples": 3, "outcomes": null }));
        let patch = InteractionPatch::from_json(&raw, PatchPolicy::Strict).expect("strict");

        let mut fields =
            InteractionFields { outcomes: Some("agreed".to_string()), ..Default::default() };
        patch.apply_to(&mut fields);

        assert_eq!(fields.samples.as_deref(), Some("3"));
        assert_eq!(fields.outcomes, None);
    }

    #[test]
    fn blank_fields_report_blank() {
        assert!(InteractionFields::default().is_blank());
        let fields = InteractionFields { topics: Some("x".to_string()), ..Default::default() };
        assert!(!fields.is_blank());
    }
}
