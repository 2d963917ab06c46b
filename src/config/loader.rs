// Configuration loader
// Loads provider credentials and settings from ~/.promptchain/config.toml,
// falling back to ANTHROPIC_API_KEY / OPENAI_API_KEY from the environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR, CONFIG_FILE};
use super::provider::ProviderEntry;
use super::settings::{Config, SamplingConfig, SamplingProfile, ServerConfig};

/// On-disk layout; every section is optional
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    provider: Option<ProviderEntry>,
    #[serde(default)]
    sampling: TomlSampling,
    #[serde(default)]
    server: Option<ServerConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSampling {
    #[serde(default)]
    planning: Option<SamplingProfile>,
    #[serde(default)]
    implementation: Option<SamplingProfile>,
}

/// Default config file location (`~/.promptchain/config.toml`)
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load configuration from the config file or environment
///
/// A missing provider is not an error here: the server can still run and
/// accept per-request keys. Commands that need a provider check for it.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    let env_provider = provider_from_env(
        std::env::var("ANTHROPIC_API_KEY").ok(),
        std::env::var("OPENAI_API_KEY").ok(),
    );

    if path.exists() {
        tracing::debug!("Loading configuration from {}", path.display());
        return load_config_from(&path, env_provider);
    }

    tracing::debug!("No config file at {}, using environment", path.display());
    let config = Config::with_provider(env_provider);
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

/// Load configuration from a specific file.
///
/// `fallback_provider` is used when the file has no `[provider]` section.
pub fn load_config_from(path: &Path, fallback_provider: Option<ProviderEntry>) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config = parse_config(&contents, fallback_provider)
        .with_context(|| format!("Invalid configuration file {}", path.display()))?;

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn parse_config(contents: &str, fallback_provider: Option<ProviderEntry>) -> Result<Config> {
    let toml_config: TomlConfig =
        toml::from_str(contents).context("Failed to parse TOML configuration")?;

    let provider = toml_config.provider.or(fallback_provider);
    let defaults = SamplingConfig::for_provider(provider.as_ref());

    Ok(Config {
        sampling: SamplingConfig {
            planning: toml_config.sampling.planning.unwrap_or(defaults.planning),
            implementation: toml_config
                .sampling
                .implementation
                .unwrap_or(defaults.implementation),
        },
        server: toml_config.server.unwrap_or_default(),
        provider,
    })
}

/// Provider from environment keys: Anthropic first, then OpenAI
pub fn provider_from_env(
    anthropic_key: Option<String>,
    openai_key: Option<String>,
) -> Option<ProviderEntry> {
    let non_empty = |key: Option<String>| key.filter(|k| !k.trim().is_empty());

    if let Some(key) = non_empty(anthropic_key) {
        return Some(ProviderEntry::claude(key));
    }
    non_empty(openai_key).map(ProviderEntry::openai)
}
