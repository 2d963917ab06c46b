// End-to-end tests for the prompt chain through the public API

use async_trait::async_trait;
use mockito::Matcher;
use serde_json::json;
use std::sync::{Arc, Mutex};

use promptchain::chain::{ChainError, PipelineState, PromptChain, Stage};
use promptchain::config::{ProviderEntry, SamplingConfig};
use promptchain::providers::{
    create_provider_from_entry, ContentBlock, LlmProvider, ProviderRequest, ProviderResponse,
};

/// Replies "<stage marker> #n" and keeps every prompt
#[derive(Default)]
struct ScriptedProvider {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }

    fn count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn send_message(&self, request: &ProviderRequest) -> anyhow::Result<ProviderResponse> {
        let prompt = request.messages[0].content.clone();
        let heading = prompt.lines().next().unwrap_or_default().to_string();
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt);

        Ok(ProviderResponse {
            id: prompts.len().to_string(),
            model: request.model.clone(),
            content: vec![ContentBlock::Text {
                text: format!("{} #{}", heading, prompts.len()),
            }],
            stop_reason: Some("end_turn".into()),
            provider: "scripted".into(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }
}

#[tokio::test]
async fn test_full_pipeline_in_order() {
    let provider = Arc::new(ScriptedProvider::default());
    let mut chain = PromptChain::new(provider.clone());

    let request = chain
        .generate_project_request("A marketplace for used books", "")
        .await
        .unwrap();
    assert_eq!(request, "## 1. Project Request Generator #1");

    // Details are required before the specification
    let err = chain.generate_technical_specification("").await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Precondition {
            stage: Stage::TechnicalSpecification,
            field: "project_rules"
        }
    ));
    assert_eq!(provider.count(), 1);

    chain.set_project_details("Use Postgres", "Next.js starter");
    chain.generate_technical_specification("").await.unwrap();
    assert!(provider.prompt(1).contains(&request));

    let plan = chain.generate_implementation_plan("").await.unwrap();
    chain.generate_code_for_step(1, "").await.unwrap();
    chain.generate_code_for_step(3, "").await.unwrap();
    chain.generate_code_for_step(2, "").await.unwrap();

    // Step 2 saw only step 1
    let step_two_prompt = provider.prompt(5);
    assert!(step_two_prompt.contains(&plan));
    assert!(step_two_prompt.contains("<existing_code>\n## 4. Code Generator #4\n</existing_code>"));

    chain.generate_optimization_plan("").await.unwrap();
    assert!(provider.prompt(6).contains(
        "## 4. Code Generator #4\n\n## 4. Code Generator #6\n\n## 4. Code Generator #5"
    ));

    chain.generate_optimized_code_for_step(1, "").await.unwrap();
    chain.generate_optimized_code_for_step(2, "").await.unwrap();
    assert!(provider
        .prompt(8)
        .contains("## 4. Code Generator #5\n\n## 6. Code Optimization Generator #8"));

    let state = chain.into_state();
    assert_eq!(state.generated_code.len(), 3);
    assert_eq!(state.optimized_code.len(), 2);
    assert_eq!(provider.count(), 9);
}

#[tokio::test]
async fn test_snapshot_rehydrates_into_a_new_chain() {
    let provider = Arc::new(ScriptedProvider::default());
    let mut chain = PromptChain::new(provider.clone());
    chain.generate_project_request("idea", "").await.unwrap();
    chain.set_project_details("rules", "template");

    // Round-trip through JSON the way an HTTP caller would
    let json = serde_json::to_string(&chain.snapshot()).unwrap();
    let restored: PipelineState = serde_json::from_str(&json).unwrap();

    let mut resumed = PromptChain::with_state(provider.clone(), restored);
    let spec = resumed.generate_technical_specification("More detail on search").await.unwrap();

    assert_eq!(spec, "## 2. Technical Specification Generator #2");
    assert!(provider.prompt(1).contains("More detail on search"));
    assert!(chain.state().technical_specification.is_none());
}

#[tokio::test]
async fn test_claude_provider_receives_stage_sampling() {
    let mut server = mockito::Server::new_async().await;
    let planning = server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::PartialJson(json!({
            "model": "claude-3-sonnet-20240229",
            "max_tokens": 4096
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_plan",
                "model": "claude-3-sonnet-20240229",
                "content": [{"type": "text", "text": "# Implementation Plan"}],
                "stop_reason": "end_turn"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let implementation = server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::PartialJson(json!({
            "model": "claude-3-opus-20240229"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_code",
                "model": "claude-3-opus-20240229",
                "content": [{"type": "text", "text": "<code_changes/>"}],
                "stop_reason": "end_turn"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let entry = ProviderEntry::Claude {
        api_key: "sk-ant-test".into(),
        model: None,
        base_url: Some(server.url()),
        timeout_secs: Some(10),
    };
    let provider = create_provider_from_entry(&entry).unwrap();
    let state = PipelineState {
        technical_specification: Some("spec".into()),
        ..Default::default()
    };
    let mut chain = PromptChain::with_state(Arc::from(provider), state)
        .with_sampling(SamplingConfig::for_provider(Some(&entry)));

    let plan = chain.generate_implementation_plan("").await.unwrap();
    let code = chain.generate_code_for_step(1, "").await.unwrap();

    planning.assert_async().await;
    implementation.assert_async().await;
    assert_eq!(plan, "# Implementation Plan");
    assert_eq!(code, "<code_changes/>");
}

#[tokio::test]
async fn test_provider_error_surfaces_as_service_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(529)
        .with_body("overloaded")
        .create_async()
        .await;

    let entry = ProviderEntry::Claude {
        api_key: "sk-ant-test".into(),
        model: None,
        base_url: Some(server.url()),
        timeout_secs: None,
    };
    let provider = create_provider_from_entry(&entry).unwrap();
    let mut chain = PromptChain::new(Arc::from(provider));

    let err = chain.generate_project_request("idea", "").await.unwrap_err();
    match err {
        ChainError::Service { stage, source } => {
            assert_eq!(stage, Stage::ProjectRequest);
            assert!(format!("{:#}", source).contains("overloaded"));
        }
        other => panic!("expected service error, got {:?}", other),
    }
    assert!(chain.state().project_request.is_none());
}
