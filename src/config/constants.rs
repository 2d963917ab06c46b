// Project-wide constants
//
// Centralised here so model names, sampling defaults and addresses have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default bind address for `promptchain serve` (all interfaces).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Host used when the bind address is derived from the `PORT` variable.
pub const PORT_ENV_HOST: &str = "0.0.0.0";

/// Config directory under the user's home.
pub const CONFIG_DIR: &str = ".promptchain";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Default maximum tokens per completion request.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default HTTP timeout for a single completion request.
///
/// Code generation prompts are large and responses are long, so this is
/// much higher than a typical API timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Claude model used for the planning stages (request, spec, plans).
pub const PLANNING_MODEL: &str = "claude-3-sonnet-20240229";

/// Claude model used for the code generation stages.
pub const IMPLEMENTATION_MODEL: &str = "claude-3-opus-20240229";

/// Temperature for the planning stages.
pub const PLANNING_TEMPERATURE: f32 = 0.7;

/// Temperature for the code generation stages.
pub const IMPLEMENTATION_TEMPERATURE: f32 = 0.2;

/// Default Claude model when nothing else is configured.
pub const DEFAULT_CLAUDE_MODEL: &str = PLANNING_MODEL;

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Maximum accepted JSON body size for the HTTP API (4 MiB).
pub const MAX_REQUEST_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Interactive workflow output preview limit, in characters.
pub const PREVIEW_CHARS: usize = 1000;
