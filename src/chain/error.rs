//! Errors raised by the prompt chain.

use thiserror::Error;

use super::templates::{Stage, TemplateError};

/// Errors from a single pipeline stage.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A prerequisite field is absent or empty. Recoverable by supplying it.
    #[error("Cannot generate the {stage}: {}", missing_message(.field))]
    Precondition { stage: Stage, field: &'static str },

    /// The completion service failed. The pipeline state is untouched.
    #[error("Completion service failed while generating the {stage}: {source:#}")]
    Service {
        stage: Stage,
        source: anyhow::Error,
    },

    /// A declared template input had no value.
    #[error("Template for the {stage} is missing a value for {{{placeholder}}}")]
    Template { stage: Stage, placeholder: String },
}

impl ChainError {
    pub fn stage(&self) -> Stage {
        match self {
            ChainError::Precondition { stage, .. }
            | ChainError::Service { stage, .. }
            | ChainError::Template { stage, .. } => *stage,
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, ChainError::Precondition { .. })
    }
}

impl From<TemplateError> for ChainError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::MissingInput { stage, placeholder } => {
                ChainError::Template { stage, placeholder }
            }
        }
    }
}

fn missing_message(field: &str) -> String {
    match field {
        "project_request" => "Project request must be generated and finalized first".to_string(),
        "project_rules" | "starter_template" => {
            "Project rules and starter template must be set first".to_string()
        }
        "technical_specification" => "Technical specification must be generated first".to_string(),
        "implementation_plan" => "Implementation plan must be generated first".to_string(),
        "generated_code" => "Code must be generated for at least one step first".to_string(),
        "optimization_plan" => "Optimization plan must be generated first".to_string(),
        other => format!("{} must be provided first", other),
    }
}
