// Provider entry: which completion API to call and with what credentials

use serde::{Deserialize, Serialize};

/// A configured completion provider.
///
/// Serializes with a `type` tag, e.g.:
/// ```toml
/// [provider]
/// type = "claude"
/// api_key = "sk-ant-..."
/// timeout_secs = 300
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderEntry {
    Claude {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    Openai {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
}

impl ProviderEntry {
    /// Claude entry with only an API key (environment or per-request keys)
    pub fn claude(api_key: impl Into<String>) -> Self {
        ProviderEntry::Claude {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    /// OpenAI entry with only an API key
    pub fn openai(api_key: impl Into<String>) -> Self {
        ProviderEntry::Openai {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    /// Provider type string ("claude" or "openai")
    pub fn provider_type(&self) -> &'static str {
        match self {
            ProviderEntry::Claude { .. } => "claude",
            ProviderEntry::Openai { .. } => "openai",
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            ProviderEntry::Claude { api_key, .. } | ProviderEntry::Openai { api_key, .. } => {
                api_key
            }
        }
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            ProviderEntry::Claude { timeout_secs, .. }
            | ProviderEntry::Openai { timeout_secs, .. } => *timeout_secs,
        }
    }

    /// Explicitly configured model, if any
    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderEntry::Claude { model, .. } | ProviderEntry::Openai { model, .. } => {
                model.as_deref()
            }
        }
    }

    pub fn is_claude(&self) -> bool {
        matches!(self, ProviderEntry::Claude { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claude_entry() {
        let entry: ProviderEntry = toml::from_str(
            r#"
            type = "claude"
            api_key = "sk-ant-test"
            model = "claude-3-opus-20240229"
            "#,
        )
        .unwrap();

        assert!(entry.is_claude());
        assert_eq!(entry.api_key(), "sk-ant-test");
        assert_eq!(entry.timeout_secs(), None);
        assert_eq!(entry.model(), Some("claude-3-opus-20240229"));
    }

    #[test]
    fn test_parse_openai_entry_with_timeout() {
        let entry: ProviderEntry = toml::from_str(
            r#"
            type = "openai"
            api_key = "sk-test"
            base_url = "http://localhost:8080"
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(entry.provider_type(), "openai");
        assert_eq!(entry.timeout_secs(), Some(30));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ProviderEntry, _> = toml::from_str(
            r#"
            type = "gemini"
            api_key = "x"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_unset_options() {
        let toml = toml::to_string(&ProviderEntry::claude("sk-ant-x")).unwrap();
        assert!(toml.contains("type = \"claude\""));
        assert!(!toml.contains("model"));
    }
}
