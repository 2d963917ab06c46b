// Completion provider support
//
// An abstraction layer over the LLM APIs the chain can call (Claude and
// OpenAI-compatible endpoints). The chain only sees `LlmProvider`.

use anyhow::Result;
use async_trait::async_trait;

pub mod types;

// Provider implementations
pub mod claude;
pub mod openai;

// Provider factory
pub mod factory;

pub use claude::ClaudeProvider;
pub use factory::create_provider_from_entry;
pub use openai::OpenAIProvider;
pub use types::{ContentBlock, Message, ProviderRequest, ProviderResponse};

/// Trait for completion providers
///
/// Implementations are stateless apart from their HTTP client, so a single
/// instance is shared behind an `Arc` by every pipeline.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and wait for the complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Get the provider name (e.g., "claude", "openai")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
