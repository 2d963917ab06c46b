// Provider factory
//
// Creates LLM providers from a `ProviderEntry`

use anyhow::Result;
use std::time::Duration;

use super::claude::ClaudeProvider;
use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::config::ProviderEntry;

/// Create an `LlmProvider` from a configured `ProviderEntry`.
pub fn create_provider_from_entry(entry: &ProviderEntry) -> Result<Box<dyn LlmProvider>> {
    let timeout = Duration::from_secs(entry.timeout_secs().unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS));

    match entry {
        ProviderEntry::Claude {
            api_key,
            model,
            base_url,
            ..
        } => {
            let mut provider = ClaudeProvider::with_timeout(api_key.clone(), timeout)?;
            if let Some(m) = model {
                provider = provider.with_model(m.clone());
            }
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Box::new(provider))
        }

        ProviderEntry::Openai {
            api_key,
            model,
            base_url,
            ..
        } => {
            let mut provider = OpenAIProvider::with_timeout(api_key.clone(), timeout)?;
            if let Some(m) = model {
                provider = provider.with_model(m.clone());
            }
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Box::new(provider))
        }
    }
}
