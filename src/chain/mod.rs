// Multi-stage prompt chain
//
// Turns an app idea into a project request, technical specification,
// implementation plan, per-step code and an optional optimization pass.

pub mod controller;
pub mod error;
pub mod state;
pub mod templates;

pub use controller::PromptChain;
pub use error::ChainError;
pub use state::{PipelineState, NO_EXISTING_CODE};
pub use templates::{Stage, StageTemplate, TemplateError, UnknownStage};
