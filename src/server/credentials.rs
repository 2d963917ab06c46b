// Per-request provider resolution
//
// A request may carry its own Anthropic key. That key builds a provider for
// the lifetime of the request only; nothing global is mutated. Sampling
// always follows the provider that was actually resolved.

use std::sync::Arc;

use super::error::ApiError;
use crate::config::{Config, ProviderEntry, SamplingConfig};
use crate::providers::{create_provider_from_entry, LlmProvider};

/// A provider together with the sampling profiles meant for it
#[derive(Clone)]
pub struct ResolvedProvider {
    pub provider: Arc<dyn LlmProvider>,
    pub sampling: SamplingConfig,
}

/// Source of the provider a request should use
pub trait ProviderSource: Send + Sync {
    fn resolve(&self, api_key: Option<&str>) -> Result<ResolvedProvider, ApiError>;
}

/// Server-configured provider plus per-request Anthropic keys
pub struct ConfiguredProviders {
    default: Option<ResolvedProvider>,
    /// Settings (model, base URL, timeout) copied into request-scoped Claude providers
    request_template: ProviderEntry,
    request_sampling: SamplingConfig,
}

impl ConfiguredProviders {
    /// Default provider only; request keys get stock Claude settings
    pub fn new(default: Option<ResolvedProvider>) -> Self {
        let request_template = ProviderEntry::claude(String::new());
        Self {
            default,
            request_sampling: SamplingConfig::for_provider(Some(&request_template)),
            request_template,
        }
    }

    /// Build from configuration.
    ///
    /// A configured Claude entry also supplies the settings and sampling for
    /// request-scoped keys. With any other provider, request keys run with the
    /// Claude per-role defaults.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let default = match &config.provider {
            Some(entry) => Some(ResolvedProvider {
                provider: Arc::from(create_provider_from_entry(entry)?),
                sampling: config.sampling.clone(),
            }),
            None => None,
        };

        let mut providers = Self::new(default);
        match &config.provider {
            Some(entry @ ProviderEntry::Claude { .. }) => {
                providers.request_template = entry.clone();
                providers.request_sampling = config.sampling.clone();
            }
            Some(ProviderEntry::Openai { .. }) => {}
            // No provider configured: file sampling was built for Claude
            None => providers.request_sampling = config.sampling.clone(),
        }
        Ok(providers)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn request_entry(&self, api_key: &str) -> ProviderEntry {
        match &self.request_template {
            ProviderEntry::Claude {
                model,
                base_url,
                timeout_secs,
                ..
            } => ProviderEntry::Claude {
                api_key: api_key.to_string(),
                model: model.clone(),
                base_url: base_url.clone(),
                timeout_secs: *timeout_secs,
            },
            ProviderEntry::Openai { .. } => ProviderEntry::claude(api_key),
        }
    }
}

impl ProviderSource for ConfiguredProviders {
    fn resolve(&self, api_key: Option<&str>) -> Result<ResolvedProvider, ApiError> {
        if let Some(key) = api_key {
            let provider = create_provider_from_entry(&self.request_entry(key)).map_err(|e| {
                ApiError::Internal(format!("Failed to create request provider: {:#}", e))
            })?;
            return Ok(ResolvedProvider {
                provider: Arc::from(provider),
                sampling: self.request_sampling.clone(),
            });
        }

        self.default.clone().ok_or(ApiError::MissingCredentials)
    }
}
