use thiserror::Error;

use crate::flows::states::{PipelineEvent, PipelineStage, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_stage(&self) -> PipelineStage;
    fn transition(
        &self,
        current: PipelineStage,
        event: PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// `START -> INGEST -> LOG_AND_GENERATE -> END`, nothing else.
#[derive(Clone, Debug, Default)]
pub struct ChatFlow;

impl FlowDefinition for ChatFlow {
    fn initial_stage(&self) -> PipelineStage {
        PipelineStage::Start
    }

    fn transition(
        &self,
        current: PipelineStage,
        event: PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        use PipelineEvent::{ContextExtracted, InteractionLogged, MessageReceived};
        use PipelineStage::{End, Ingest, LogAndGenerate, Start};

        let to = match (current, event) {
            (Start, MessageReceived) => Ingest,
            (Ingest, ContextExtracted) => LogAndGenerate,
            (LogAndGenerate, InteractionLogged) => End,
            _ => return Err(FlowTransitionError::InvalidTransition { stage: current, event }),
        };

        Ok(TransitionOutcome { from: current, to, event })
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_stage(&self) -> PipelineStage {
        self.flow.initial_stage()
    }

    pub fn apply(
        &self,
        current: PipelineStage,
        event: PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }
}

impl Default for FlowEngine<ChatFlow> {
    fn default() -> Self {
        Self::new(ChatFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid pipeline transition from {stage:?} using event {event:?}")]
    InvalidTransition { stage: PipelineStage, event: PipelineEvent },
}
