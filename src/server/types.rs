// Request and response bodies for the chain HTTP API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::error::{ApiError, NO_JSON_MESSAGE};
use crate::chain::PipelineState;

/// Union of every field any endpoint reads.
///
/// The caller owns the session, so each request carries whatever prior
/// stage outputs the target stage needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageRequest {
    pub app_idea: Option<String>,
    pub feedback: Option<String>,
    pub api_key: Option<String>,

    /// `/full-workflow` stage name
    pub step: Option<String>,

    pub project_request: Option<String>,
    pub project_rules: Option<String>,
    pub starter_template: Option<String>,
    pub technical_specification: Option<String>,
    pub implementation_plan: Option<String>,
    pub optimization_plan: Option<String>,

    /// Integer or digit string
    pub step_number: Option<Value>,
    /// Integer or digit string (`/full-workflow`)
    pub code_step_number: Option<Value>,

    pub existing_code: Option<HashMap<String, String>>,
    pub optimized_code: Option<HashMap<String, String>>,
}

impl StageRequest {
    /// Parse a raw body. Empty bodies and non-object JSON are rejected.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::Validation(NO_JSON_MESSAGE.to_string()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::Validation(format!("Invalid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(ApiError::Validation(NO_JSON_MESSAGE.to_string()));
        }

        serde_json::from_value(value)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
    }

    /// Named text field, if present and non-empty
    pub fn text(&self, field: &str) -> Option<&str> {
        let value = match field {
            "app_idea" => &self.app_idea,
            "project_request" => &self.project_request,
            "project_rules" => &self.project_rules,
            "starter_template" => &self.starter_template,
            "technical_specification" => &self.technical_specification,
            "implementation_plan" => &self.implementation_plan,
            "optimization_plan" => &self.optimization_plan,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Fail with one message naming every missing field
    pub fn require(&self, fields: &[&str]) -> Result<(), ApiError> {
        let missing: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| self.text(field).is_none())
            .collect();

        match missing.as_slice() {
            [] => Ok(()),
            [one] => Err(ApiError::Validation(format!("{} is required", one))),
            [init @ .., last] => Err(ApiError::Validation(format!(
                "{} and {} are required",
                init.join(", "),
                last
            ))),
        }
    }

    pub fn feedback(&self) -> &str {
        self.feedback.as_deref().unwrap_or_default()
    }

    /// Per-request API key, if one was supplied
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn step_number(&self) -> Result<u32, ApiError> {
        parse_step("step_number", self.step_number.as_ref())
    }

    pub fn code_step_number(&self) -> Result<u32, ApiError> {
        parse_step("code_step_number", self.code_step_number.as_ref())
    }

    /// Rebuild a pipeline state from every supplied field
    pub fn to_state(&self) -> Result<PipelineState, ApiError> {
        let owned = |field: &str| self.text(field).map(str::to_string);

        Ok(PipelineState {
            project_request: owned("project_request"),
            project_rules: owned("project_rules"),
            starter_template: owned("starter_template"),
            technical_specification: owned("technical_specification"),
            implementation_plan: owned("implementation_plan"),
            generated_code: parse_code_map("existing_code", self.existing_code.as_ref())?,
            optimization_plan: owned("optimization_plan"),
            optimized_code: parse_code_map("optimized_code", self.optimized_code.as_ref())?,
        })
    }
}

/// Accept a JSON integer or a string of digits; require >= 1
pub fn parse_step(field: &str, value: Option<&Value>) -> Result<u32, ApiError> {
    let not_integer = || ApiError::InvalidStep(format!("{} must be an integer", field));

    let number: i64 = match value {
        None | Some(Value::Null) => {
            return Err(ApiError::Validation(format!("{} is required", field)))
        }
        Some(Value::Number(n)) => n.as_i64().ok_or_else(not_integer)?,
        Some(Value::String(s)) => s.trim().parse().map_err(|_| not_integer())?,
        Some(_) => return Err(not_integer()),
    };

    u32::try_from(number)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::InvalidStep(format!("{} must be a positive integer", field)))
}

/// Convert `{"1": "...", "2": "..."}` into an ordered step map
pub fn parse_code_map(
    field: &str,
    map: Option<&HashMap<String, String>>,
) -> Result<BTreeMap<u32, String>, ApiError> {
    let Some(map) = map else {
        return Ok(BTreeMap::new());
    };

    let mut steps = BTreeMap::new();
    for (key, code) in map {
        let step = key
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|step| *step > 0)
            .ok_or_else(|| {
                ApiError::InvalidStep(format!(
                    "{} keys must be positive integers (got {:?})",
                    field, key
                ))
            })?;

        if steps.insert(step, code.clone()).is_some() {
            return Err(ApiError::InvalidStep(format!(
                "{} has more than one entry for step {}",
                field, step
            )));
        }
    }
    Ok(steps)
}

/// Successful stage response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResponse {
    pub result: String,
    pub success: bool,
    /// Echoed stage name (`/full-workflow` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl StageResponse {
    pub fn ok(result: String) -> Self {
        Self {
            result,
            success: true,
            step: None,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// `/set-project-details` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsResponse {
    pub message: String,
    pub success: bool,
    pub state: PipelineState,
}
