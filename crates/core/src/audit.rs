//! Tool-run audit trail.
//!
//! Every agent tool invocation appends one [`ToolRun`] row describing what it
//! read or wrote. Rows are append-only; a tool that fails writes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::interaction::InteractionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    GetHcpProfile,
    ListRecentInteractions,
    LogInteraction,
    GenerateFollowupSuggestions,
    EditInteraction,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetHcpProfile => "get_hcp_profile",
            Self::ListRecentInteractions => "list_recent_interactions",
            Self::LogInteraction => "log_interaction",
            Self::GenerateFollowupSuggestions => "generate_followup_suggestions",
            Self::EditInteraction => "edit_interaction",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool run waiting to be appended to the audit table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewToolRun {
    pub interaction_id: Option<InteractionId>,
    pub tool: ToolName,
    pub output: Value,
}

impl NewToolRun {
    pub fn new(tool: ToolName, output: Value) -> Self {
        Self { interaction_id: None, tool, output }
    }

    pub fn for_interaction(mut self, interaction_id: InteractionId) -> Self {
        self.interaction_id = Some(interaction_id);
        self
    }

    /// Text stored in the `output` column. Plain strings are kept as-is.
    pub fn serialized_output(&self) -> String {
        serialize_output(&self.output)
    }
}

/// Audit entry attached to an interaction write. The store stamps the
/// interaction id once the row exists, inside the same transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionAudit {
    pub tool: ToolName,
    pub detail: Map<String, Value>,
}

impl InteractionAudit {
    pub fn new(tool: ToolName) -> Self {
        Self { tool, detail: Map::new() }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.detail.insert(key.to_string(), value);
        self
    }

    pub fn into_tool_run(self, interaction_id: InteractionId) -> NewToolRun {
        let mut output = Map::new();
        output.insert("interaction_id".to_string(), Value::from(interaction_id.0));
        output.extend(self.detail);
        NewToolRun::new(self.tool, Value::Object(output)).for_interaction(interaction_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolRun {
    pub id: i64,
    pub interaction_id: Option<InteractionId>,
    pub tool: String,
    pub output: Value,
    pub created_at: DateTime<Utc>,
}

pub fn serialize_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Inverse of [`serialize_output`]; text that is not JSON comes back as a string.
pub fn decode_output(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}
