use serde::{Deserialize, Serialize};

use crate::domain::hcp::Hcp;
use crate::domain::interaction::{Interaction, InteractionFields, InteractionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Start,
    Ingest,
    LogAndGenerate,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    MessageReceived,
    ContextExtracted,
    InteractionLogged,
}

/// Why an extraction fell back to an empty field set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ExtractionDegraded {
    InvalidJson(String),
    NotAnObject,
}

impl std::fmt::Display for ExtractionDegraded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(detail) => write!(f, "model output was not valid JSON: {detail}"),
            Self::NotAnObject => f.write_str("model output was JSON but not an object"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub fields: InteractionFields,
    pub degraded: Option<ExtractionDegraded>,
}

impl Extraction {
    pub fn parsed(fields: InteractionFields) -> Self {
        Self { fields, degraded: None }
    }

    pub fn degraded(reason: ExtractionDegraded) -> Self {
        Self { fields: InteractionFields::default(), degraded: Some(reason) }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// State handed from the ingest stage to the log-and-generate stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestResult {
    pub profile: Option<Hcp>,
    pub recent: Vec<Interaction>,
    pub extraction: Extraction,
}

pub const REPLY_PREFIX: &str = "Logged. Follow-ups: ";

/// Final pipeline state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogResult {
    pub interaction_id: InteractionId,
    pub suggestions: Vec<String>,
    pub reply: String,
}

impl LogResult {
    pub fn new(interaction_id: InteractionId, suggestions: Vec<String>) -> Self {
        let reply = format!("{REPLY_PREFIX}{}", suggestions.join("; "));
        Self { interaction_id, suggestions, reply }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PipelineStage,
    pub to: PipelineStage,
    pub event: PipelineEvent,
}
