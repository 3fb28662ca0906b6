pub mod engine;
pub mod states;

pub use engine::{ChatFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use states::{
    Extraction, ExtractionDegraded, IngestResult, LogResult, PipelineEvent, PipelineStage,
    TransitionOutcome, REPLY_PREFIX,
};
