pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use audit::{InteractionAudit, NewToolRun, ToolName, ToolRun};
pub use chrono;
pub use domain::hcp::{Hcp, HcpId, NewHcp};
pub use domain::interaction::{
    Interaction, InteractionField, InteractionFields, InteractionId, InteractionPatch,
    NewInteraction, PatchError, PatchPolicy,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{Extraction, ExtractionDegraded, IngestResult, LogResult};
