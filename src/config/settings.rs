// Configuration settings

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_MAX_TOKENS, IMPLEMENTATION_MODEL, IMPLEMENTATION_TEMPERATURE,
    PLANNING_MODEL, PLANNING_TEMPERATURE, PORT_ENV_HOST,
};
use super::provider::ProviderEntry;

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Which sampling profile a stage uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRole {
    /// Project request, technical specification and the two plans
    Planning,
    /// Code and optimized code generation
    Implementation,
}

/// Model and sampling parameters for one role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingProfile {
    /// Model override (None = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl SamplingProfile {
    pub fn new(model: Option<String>, temperature: f32) -> Self {
        Self {
            model,
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Sampling profiles for both roles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    pub planning: SamplingProfile,
    pub implementation: SamplingProfile,
}

impl SamplingConfig {
    /// Defaults for a provider: Claude without an explicit model gets the
    /// per-role model split; otherwise the provider's own model is used.
    pub fn for_provider(provider: Option<&ProviderEntry>) -> Self {
        let claude_models =
            provider.map_or(true, |entry| entry.is_claude() && entry.model().is_none());
        let model = |name: &str| claude_models.then(|| name.to_string());

        Self {
            planning: SamplingProfile::new(model(PLANNING_MODEL), PLANNING_TEMPERATURE),
            implementation: SamplingProfile::new(
                model(IMPLEMENTATION_MODEL),
                IMPLEMENTATION_TEMPERATURE,
            ),
        }
    }

    pub fn profile(&self, role: SamplingRole) -> &SamplingProfile {
        match role {
            SamplingRole::Planning => &self.planning,
            SamplingRole::Implementation => &self.implementation,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::for_provider(None)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl ServerConfig {
    /// Pick the bind address: explicit flag, then `PORT`, then this config.
    pub fn resolve_bind_address(
        &self,
        cli_bind: Option<String>,
        port_env: Option<String>,
    ) -> String {
        if let Some(bind) = cli_bind {
            return bind;
        }

        if let Some(port) = port_env {
            match port.trim().parse::<u16>() {
                Ok(port) => return format!("{}:{}", PORT_ENV_HOST, port),
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {:?}", port),
            }
        }

        self.bind_address.clone()
    }
}

/// Main configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Completion provider (None = requests must carry their own key)
    pub provider: Option<ProviderEntry>,

    pub sampling: SamplingConfig,

    pub server: ServerConfig,
}

impl Config {
    /// Configuration with a provider and that provider's sampling defaults
    pub fn with_provider(provider: Option<ProviderEntry>) -> Self {
        Self {
            sampling: SamplingConfig::for_provider(provider.as_ref()),
            provider,
            server: ServerConfig::default(),
        }
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<()> {
        if let Some(provider) = &self.provider {
            if provider.api_key().trim().is_empty() {
                bail!(
                    "API key for provider '{}' is empty\n\n\
                     Set api_key in ~/.promptchain/config.toml or export \
                     ANTHROPIC_API_KEY / OPENAI_API_KEY",
                    provider.provider_type()
                );
            }
        }

        for (name, profile) in [
            ("planning", &self.sampling.planning),
            ("implementation", &self.sampling.implementation),
        ] {
            if !(0.0..=2.0).contains(&profile.temperature) {
                bail!(
                    "sampling.{}.temperature ({}) must be between 0.0 and 2.0",
                    name,
                    profile.temperature
                );
            }
            if profile.max_tokens == 0 {
                bail!("sampling.{}.max_tokens must be greater than 0", name);
            }
        }

        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            bail!(
                "Invalid server.bind_address '{}' (expected host:port, e.g. {})",
                self.server.bind_address,
                DEFAULT_BIND_ADDR
            );
        }

        Ok(())
    }
}
