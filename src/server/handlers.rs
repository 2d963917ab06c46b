// HTTP request handlers
//
// Each handler validates its fields, rebuilds a `PromptChain` from the
// request, runs exactly one stage and returns its output.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use super::credentials::ProviderSource;
use super::error::ApiError;
use super::types::{DetailsResponse, StageRequest, StageResponse};
use crate::chain::{PromptChain, Stage, UnknownStage};

/// Shared, read-only server state
pub struct AppState {
    pub providers: Arc<dyn ProviderSource>,
}

pub type SharedState = Arc<AppState>;

type StageResult = Result<Json<StageResponse>, ApiError>;

/// Fields every stage after the first expects from the caller, cumulatively
const DETAILS: [&str; 3] = ["project_request", "project_rules", "starter_template"];
const THROUGH_SPEC: [&str; 4] = [
    "project_request",
    "project_rules",
    "starter_template",
    "technical_specification",
];
const THROUGH_PLAN: [&str; 5] = [
    "project_request",
    "project_rules",
    "starter_template",
    "technical_specification",
    "implementation_plan",
];

impl AppState {
    /// Chain for one request: resolved provider plus rehydrated state
    fn chain_for(&self, request: &StageRequest) -> Result<PromptChain, ApiError> {
        let state = request.to_state()?;
        let resolved = self.providers.resolve(request.api_key())?;
        Ok(PromptChain::with_state(resolved.provider, state).with_sampling(resolved.sampling))
    }
}

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate-project-request", post(generate_project_request))
        .route("/set-project-details", post(set_project_details))
        .route(
            "/generate-technical-specification",
            post(generate_technical_specification),
        )
        .route(
            "/generate-implementation-plan",
            post(generate_implementation_plan),
        )
        .route("/generate-code", post(generate_code))
        .route(
            "/generate-optimization-plan",
            post(generate_optimization_plan),
        )
        .route("/generate-optimized-code", post(generate_optimized_code))
        .route("/full-workflow", post(full_workflow))
        .with_state(state)
}

pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn generate_project_request(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    request.require(&["app_idea"])?;
    let idea = request.text("app_idea").unwrap_or_default();

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_project_request(idea, request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

/// Echo the details back in a state snapshot. No provider is needed.
async fn set_project_details(body: Bytes) -> Result<Json<DetailsResponse>, ApiError> {
    let request = StageRequest::from_body(&body)?;
    request.require(&["project_rules", "starter_template"])?;

    let mut state = request.to_state()?;
    state.project_rules = request.project_rules.clone();
    state.starter_template = request.starter_template.clone();

    Ok(Json(DetailsResponse {
        message: "Project details set successfully".to_string(),
        success: true,
        state,
    }))
}

async fn generate_technical_specification(
    State(app): State<SharedState>,
    body: Bytes,
) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    request.require(&DETAILS)?;

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_technical_specification(request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

async fn generate_implementation_plan(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    request.require(&THROUGH_SPEC)?;

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_implementation_plan(request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

async fn generate_code(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    let step = request.step_number()?;
    request.require(&THROUGH_PLAN)?;

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_code_for_step(step, request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

async fn generate_optimization_plan(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    request.require(&THROUGH_PLAN)?;
    if request.existing_code.as_ref().map_or(true, |code| code.is_empty()) {
        return Err(ApiError::Validation("existing_code is required".to_string()));
    }

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_optimization_plan(request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

async fn generate_optimized_code(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    let step = request.step_number()?;
    request.require(&["optimization_plan"])?;

    let mut chain = app.chain_for(&request)?;
    let result = chain
        .generate_optimized_code_for_step(step, request.feedback())
        .await?;
    Ok(Json(StageResponse::ok(result)))
}

/// Run one named stage. Later stages need the earlier outputs in the body.
async fn full_workflow(State(app): State<SharedState>, body: Bytes) -> StageResult {
    let request = StageRequest::from_body(&body)?;
    request.require(&["app_idea"])?;

    let step = request.step.as_deref().unwrap_or(Stage::ProjectRequest.key());
    let stage: Stage = step
        .parse()
        .map_err(|e: UnknownStage| ApiError::Validation(e.to_string()))?;

    let code_step = match stage {
        Stage::Code | Stage::OptimizedCode => Some(request.code_step_number()?),
        _ => None,
    };
    request.require(workflow_requirements(stage))?;

    tracing::debug!(stage = stage.key(), "Running workflow step");
    let mut chain = app.chain_for(&request)?;
    let feedback = request.feedback();
    let result = match (stage, code_step) {
        (Stage::ProjectRequest, _) => {
            let idea = request.text("app_idea").unwrap_or_default();
            chain.generate_project_request(idea, feedback).await?
        }
        (Stage::TechnicalSpecification, _) => {
            chain.generate_technical_specification(feedback).await?
        }
        (Stage::ImplementationPlan, _) => chain.generate_implementation_plan(feedback).await?,
        (Stage::Code, Some(step)) => chain.generate_code_for_step(step, feedback).await?,
        (Stage::OptimizationPlan, _) => chain.generate_optimization_plan(feedback).await?,
        (Stage::OptimizedCode, Some(step)) => {
            chain.generate_optimized_code_for_step(step, feedback).await?
        }
        (Stage::Code | Stage::OptimizedCode, None) => {
            return Err(ApiError::Validation("code_step_number is required".to_string()))
        }
    };

    Ok(Json(StageResponse::ok(result).with_step(stage.key())))
}

fn workflow_requirements(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::ProjectRequest => &[],
        Stage::TechnicalSpecification => &DETAILS,
        Stage::ImplementationPlan => &THROUGH_SPEC,
        Stage::Code | Stage::OptimizationPlan => &THROUGH_PLAN,
        Stage::OptimizedCode => &["project_request", "optimization_plan"],
    }
}
