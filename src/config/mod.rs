// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod provider;
mod settings;

pub use loader::{config_path, load_config, load_config_from, provider_from_env};
pub use provider::ProviderEntry;
pub use settings::{Config, SamplingConfig, SamplingProfile, SamplingRole, ServerConfig};
