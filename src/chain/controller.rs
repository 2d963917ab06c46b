// Pipeline controller
//
// One async method per stage. Each checks its preconditions, renders the
// stage template, makes exactly one provider call and stores the raw output.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::error::ChainError;
use super::state::PipelineState;
use super::templates::Stage;
use crate::config::SamplingConfig;
use crate::providers::{LlmProvider, Message, ProviderRequest};

/// The stateful prompt chain
pub struct PromptChain {
    provider: Arc<dyn LlmProvider>,
    sampling: SamplingConfig,
    state: PipelineState,
}

impl PromptChain {
    /// New chain with empty state
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_state(provider, PipelineState::default())
    }

    /// Chain rehydrated from a previously captured state
    pub fn with_state(provider: Arc<dyn LlmProvider>, state: PipelineState) -> Self {
        Self {
            provider,
            sampling: SamplingConfig::default(),
            state,
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Immutable copy of the current state
    pub fn snapshot(&self) -> PipelineState {
        self.state.clone()
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    /// Stage 1
    pub async fn generate_project_request(
        &mut self,
        idea: &str,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::ProjectRequest;
        let prompt = stage
            .template()
            .render(&HashMap::from([("idea", idea), ("feedback", feedback)]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.project_request = Some(output.clone());
        Ok(output)
    }

    /// Record the caller-supplied rules and starter template. No LLM call.
    pub fn set_project_details(&mut self, project_rules: &str, starter_template: &str) {
        self.state.project_rules = Some(project_rules.to_string());
        self.state.starter_template = Some(starter_template.to_string());
    }

    /// Stage 2
    pub async fn generate_technical_specification(
        &mut self,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::TechnicalSpecification;
        let project_request = require(stage, "project_request", &self.state.project_request)?;
        let project_rules = require(stage, "project_rules", &self.state.project_rules)?;
        let starter_template = require(stage, "starter_template", &self.state.starter_template)?;

        let prompt = stage.template().render(&HashMap::from([
            ("project_request", project_request),
            ("project_rules", project_rules),
            ("starter_template", starter_template),
            ("feedback", feedback),
        ]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.technical_specification = Some(output.clone());
        Ok(output)
    }

    /// Stage 3
    pub async fn generate_implementation_plan(
        &mut self,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::ImplementationPlan;
        let technical_specification = require(
            stage,
            "technical_specification",
            &self.state.technical_specification,
        )?;

        let prompt = stage.template().render(&HashMap::from([
            ("project_request", optional(&self.state.project_request)),
            ("project_rules", optional(&self.state.project_rules)),
            ("technical_specification", technical_specification),
            ("starter_template", optional(&self.state.starter_template)),
            ("feedback", feedback),
        ]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.implementation_plan = Some(output.clone());
        Ok(output)
    }

    /// Stage 4: code for one implementation step.
    ///
    /// Only steps before `step` are given to the model as existing code.
    pub async fn generate_code_for_step(
        &mut self,
        step: u32,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::Code;
        let implementation_plan =
            require(stage, "implementation_plan", &self.state.implementation_plan)?;
        let existing_code = self.state.code_before(step);
        let current_step = step.to_string();

        let prompt = stage.template().render(&HashMap::from([
            ("project_request", optional(&self.state.project_request)),
            ("project_rules", optional(&self.state.project_rules)),
            (
                "technical_specification",
                optional(&self.state.technical_specification),
            ),
            ("implementation_plan", implementation_plan),
            ("existing_code", existing_code.as_str()),
            ("current_step", current_step.as_str()),
            ("feedback", feedback),
        ]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.generated_code.insert(step, output.clone());
        Ok(output)
    }

    /// Stage 5: plan over every generated step
    pub async fn generate_optimization_plan(
        &mut self,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::OptimizationPlan;
        if !self.state.has_generated_code() {
            return Err(precondition(stage, "generated_code"));
        }
        let existing_code = self.state.all_generated_code();

        let prompt = stage.template().render(&HashMap::from([
            ("project_request", optional(&self.state.project_request)),
            ("project_rules", optional(&self.state.project_rules)),
            (
                "technical_specification",
                optional(&self.state.technical_specification),
            ),
            (
                "implementation_plan",
                optional(&self.state.implementation_plan),
            ),
            ("existing_code", existing_code.as_str()),
            ("feedback", feedback),
        ]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.optimization_plan = Some(output.clone());
        Ok(output)
    }

    /// Stage 6: one optimization step on top of all generated code
    pub async fn generate_optimized_code_for_step(
        &mut self,
        step: u32,
        feedback: &str,
    ) -> Result<String, ChainError> {
        let stage = Stage::OptimizedCode;
        let optimization_plan = require(stage, "optimization_plan", &self.state.optimization_plan)?;
        let existing_code = self.state.optimization_context(step);
        let current_step = step.to_string();

        let prompt = stage.template().render(&HashMap::from([
            ("optimization_plan", optimization_plan),
            ("existing_code", existing_code.as_str()),
            ("current_optimization_step", current_step.as_str()),
            ("feedback", feedback),
        ]))?;

        let output = self.complete(stage, prompt).await?;
        self.state.optimized_code.insert(step, output.clone());
        Ok(output)
    }

    /// Run a single provider call for `stage`
    async fn complete(&self, stage: Stage, prompt: String) -> Result<String, ChainError> {
        let profile = self.sampling.profile(stage.role());
        let prompt_chars = prompt.len();

        let mut request = ProviderRequest::new(vec![Message::user(prompt)])
            .with_max_tokens(profile.max_tokens)
            .with_temperature(profile.temperature);
        if let Some(model) = &profile.model {
            request = request.with_model(model.clone());
        }

        tracing::info!(
            stage = stage.key(),
            provider = self.provider.name(),
            prompt_chars,
            "Generating {}",
            stage
        );
        let started = Instant::now();

        let response = self.provider.send_message(&request).await.map_err(|source| {
            tracing::error!(
                stage = stage.key(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Completion failed: {:#}",
                source
            );
            ChainError::Service { stage, source }
        })?;

        let output = response.text();
        if response.is_truncated() {
            tracing::warn!(
                stage = stage.key(),
                "Response hit the token limit and may be incomplete"
            );
        }
        tracing::info!(
            stage = stage.key(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_chars = output.len(),
            "Stage complete"
        );

        Ok(output)
    }
}

fn precondition(stage: Stage, field: &'static str) -> ChainError {
    tracing::warn!(stage = stage.key(), field, "Stage precondition not met");
    ChainError::Precondition { stage, field }
}

/// Present and non-empty, or a precondition failure
fn require<'a>(
    stage: Stage,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ChainError> {
    match value.as_deref() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(precondition(stage, field)),
    }
}

fn optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ContentBlock, ProviderResponse};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a numbered reply
    #[derive(Default)]
    struct RecordingProvider {
        requests: Mutex<Vec<ProviderRequest>>,
        fail: bool,
    }

    impl RecordingProvider {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_prompt(&self) -> String {
            let requests = self.requests.lock().unwrap();
            requests.last().unwrap().messages[0].content.clone()
        }

        fn last_request(&self) -> ProviderRequest {
            self.requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if self.fail {
                anyhow::bail!("service unavailable");
            }
            Ok(ProviderResponse {
                id: format!("msg_{}", requests.len()),
                model: request.model.clone(),
                content: vec![ContentBlock::Text {
                    text: format!("output {}", requests.len()),
                }],
                stop_reason: Some("end_turn".to_string()),
                provider: "stub".to_string(),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn default_model(&self) -> &str {
            "stub-model"
        }
    }

    fn chain_with(state: PipelineState) -> (PromptChain, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider::default());
        (PromptChain::with_state(provider.clone(), state), provider)
    }

    fn planned_state() -> PipelineState {
        PipelineState {
            project_request: Some("req".into()),
            project_rules: Some("rules".into()),
            starter_template: Some("tmpl".into()),
            technical_specification: Some("spec".into()),
            implementation_plan: Some("plan".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_project_request_stores_output_and_uses_planning_profile() {
        let (mut chain, provider) = chain_with(PipelineState::new());

        let output = chain
            .generate_project_request("A recipe sharing app", "")
            .await
            .unwrap();

        assert_eq!(output, "output 1");
        assert_eq!(chain.state().project_request.as_deref(), Some("output 1"));
        assert!(provider.last_prompt().contains("A recipe sharing app"));

        let request = provider.last_request();
        assert_eq!(request.model, "claude-3-sonnet-20240229");
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_feedback_reinvocation_overwrites() {
        let (mut chain, provider) = chain_with(PipelineState::new());

        chain.generate_project_request("idea", "").await.unwrap();
        chain
            .generate_project_request("idea", "Add offline mode")
            .await
            .unwrap();

        assert_eq!(chain.state().project_request.as_deref(), Some("output 2"));
        assert!(provider.last_prompt().contains("Add offline mode"));
    }

    #[tokio::test]
    async fn test_technical_specification_checks_preconditions_in_order() {
        let (mut chain, provider) = chain_with(PipelineState::new());

        let err = chain.generate_technical_specification("").await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::Precondition {
                field: "project_request",
                ..
            }
        ));

        chain.generate_project_request("idea", "").await.unwrap();
        let err = chain.generate_technical_specification("").await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::Precondition {
                field: "project_rules",
                ..
            }
        ));
        assert_eq!(provider.calls(), 1);

        chain.set_project_details("rules", "template");
        chain.generate_technical_specification("").await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert!(provider.last_prompt().contains("<project_rules>\nrules\n</project_rules>"));
    }

    #[tokio::test]
    async fn test_empty_field_counts_as_missing() {
        let (mut chain, provider) = chain_with(PipelineState {
            technical_specification: Some(String::new()),
            ..Default::default()
        });

        let err = chain.generate_implementation_plan("").await.unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_set_project_details_overwrites() {
        let (mut chain, _provider) = chain_with(PipelineState::new());
        chain.set_project_details("r1", "t1");
        chain.set_project_details("r2", "t2");
        assert_eq!(chain.state().project_rules.as_deref(), Some("r2"));
        assert_eq!(chain.state().starter_template.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_code_step_sees_only_earlier_steps() {
        let mut state = planned_state();
        state.generated_code.insert(1, "A".into());
        state.generated_code.insert(3, "C".into());
        let (mut chain, provider) = chain_with(state);

        chain.generate_code_for_step(3, "").await.unwrap();

        let prompt = provider.last_prompt();
        assert!(prompt.contains("<existing_code>\nA\n</existing_code>"));
        assert!(prompt.contains("Implement step #3"));
        assert_eq!(chain.state().generated_code[&3], "output 1");
        assert_eq!(chain.state().generated_code[&1], "A");

        let request = provider.last_request();
        assert_eq!(request.model, "claude-3-opus-20240229");
        assert_eq!(request.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_code_step_without_prior_code_uses_sentinel() {
        let (mut chain, provider) = chain_with(planned_state());

        chain.generate_code_for_step(5, "").await.unwrap();

        assert!(provider
            .last_prompt()
            .contains("<existing_code>\n// No existing code yet\n</existing_code>"));
        assert_eq!(chain.state().generated_code.len(), 1);
    }

    #[tokio::test]
    async fn test_optimization_plan_requires_generated_code() {
        let (mut chain, provider) = chain_with(planned_state());

        let err = chain.generate_optimization_plan("").await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::Precondition {
                field: "generated_code",
                ..
            }
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_optimization_plan_sees_all_steps() {
        let mut state = planned_state();
        state.generated_code.insert(2, "B".into());
        state.generated_code.insert(1, "A".into());
        let (mut chain, provider) = chain_with(state);

        chain.generate_optimization_plan("").await.unwrap();

        assert!(provider
            .last_prompt()
            .contains("<existing_code>\nA\n\nB\n</existing_code>"));
        assert_eq!(chain.state().optimization_plan.as_deref(), Some("output 1"));
    }

    #[tokio::test]
    async fn test_optimized_code_context() {
        let mut state = planned_state();
        state.generated_code.insert(1, "A".into());
        state.generated_code.insert(2, "B".into());
        state.optimization_plan = Some("opt".into());
        state.optimized_code.insert(1, "X".into());
        let (mut chain, provider) = chain_with(state);

        chain.generate_optimized_code_for_step(2, "").await.unwrap();

        let prompt = provider.last_prompt();
        assert!(prompt.contains("<existing_code>\nA\n\nB\n\nX\n</existing_code>"));
        assert!(prompt.contains("OPTIMIZATION STEP 2 COMPLETE"));
        assert_eq!(chain.state().optimized_code[&2], "output 1");
    }

    #[tokio::test]
    async fn test_optimized_code_requires_plan() {
        let (mut chain, provider) = chain_with(planned_state());
        let err = chain.generate_optimized_code_for_step(1, "").await.unwrap_err();
        assert_eq!(err.stage(), Stage::OptimizedCode);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_service_failure_leaves_state_untouched() {
        let provider = Arc::new(RecordingProvider::failing());
        let mut state = planned_state();
        state.generated_code.insert(1, "A".into());
        state.optimization_plan = Some("opt".into());
        let mut chain = PromptChain::with_state(provider.clone(), state.clone());

        let results = [
            chain.generate_project_request("idea", "").await,
            chain.generate_technical_specification("").await,
            chain.generate_implementation_plan("").await,
            chain.generate_code_for_step(1, "").await,
            chain.generate_optimization_plan("").await,
            chain.generate_optimized_code_for_step(1, "").await,
        ];

        for result in results {
            let err = result.unwrap_err();
            assert!(matches!(err, ChainError::Service { .. }), "{:?}", err);
        }
        assert_eq!(provider.calls(), 6);
        assert_eq!(chain.snapshot(), state);
    }

    #[tokio::test]
    async fn test_openai_sampling_leaves_model_to_provider() {
        let (chain, provider) = chain_with(PipelineState::new());
        let entry = crate::config::ProviderEntry::openai("sk-test");
        let mut chain = chain.with_sampling(SamplingConfig::for_provider(Some(&entry)));

        chain.generate_project_request("idea", "").await.unwrap();
        assert!(provider.last_request().model.is_empty());
        assert_eq!(chain.into_state().project_request.as_deref(), Some("output 1"));
    }
}
