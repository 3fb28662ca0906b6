//! Agent runtime for HCP interaction logging.
//!
//! A chat message goes through two fixed stages:
//! 1. **Ingest** - load the HCP profile and recent interactions, then ask the
//!    language model to extract structured fields (`extraction`).
//! 2. **Log and generate** - store the interaction, then ask the model for
//!    follow-up suggestions (`suggestions`).
//!
//! Every tool call in `tools` appends one row to the tool-run audit log.
//! Edits go through the patch allow-list in `guardrails`.
//!
//! The model only fills in text. It never decides which records are read or
//! written.

pub mod error;
pub mod extraction;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod suggestions;
pub mod tools;

pub use error::AgentError;
pub use guardrails::GuardrailPolicy;
pub use llm::{HttpLlmClient, LlmClient};
pub use runtime::{AgentRuntime, ChatRequest, ChatResponse, EditRequest, EditResponse};
pub use tools::AgentTools;
