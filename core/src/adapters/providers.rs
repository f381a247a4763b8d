use crate::adapters::gemini::GeminiClient;
use crate::adapters::interface::TextGenerator;
use crate::adapters::loopback::enforce_loopback_endpoint;
use crate::adapters::openai_compat::OpenAiCompatibleClient;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Groq,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o",
            Self::Ollama => "llama3",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://127.0.0.1:11434/v1",
        }
    }

    /// Environment variable holding the API key; local servers need none.
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeout_secs: 120,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl GenerationSettings {
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn api_key_env(&self) -> Option<&str> {
        self.api_key_env
            .as_deref()
            .or_else(|| self.provider.default_api_key_env())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Look the API key up in the environment.
    pub fn resolve_api_key(&self) -> CoreResult<Option<String>> {
        let Some(var) = self.api_key_env() else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(CoreError::Config(format!(
                "{} provider requires an API key in ${}",
                self.provider, var
            ))),
        }
    }
}

/// Build the client for the configured provider.
pub fn build_generator(settings: &GenerationSettings) -> CoreResult<Box<dyn TextGenerator>> {
    let generator: Box<dyn TextGenerator> = match settings.provider {
        ProviderKind::Groq | ProviderKind::OpenAi => {
            let key = settings.resolve_api_key()?;
            Box::new(OpenAiCompatibleClient::new(settings, key)?)
        }
        ProviderKind::Ollama => {
            enforce_loopback_endpoint(settings.base_url())?;
            Box::new(OpenAiCompatibleClient::new(settings, None)?)
        }
        ProviderKind::Gemini => {
            let key = settings.resolve_api_key()?.ok_or_else(|| {
                CoreError::Config("gemini provider requires an API key".to_string())
            })?;
            Box::new(GeminiClient::new(settings, key)?)
        }
    };
    info!(
        provider = %settings.provider,
        model = settings.model(),
        "text generator ready"
    );
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_fill_unset_settings() {
        let s = GenerationSettings::for_provider(ProviderKind::Gemini);
        assert_eq!(s.model(), "gemini-2.5-flash");
        assert_eq!(s.api_key_env(), Some("GEMINI_API_KEY"));
        let s = GenerationSettings {
            model: Some("custom".to_string()),
            ..GenerationSettings::for_provider(ProviderKind::Ollama)
        };
        assert_eq!(s.model(), "custom");
        assert_eq!(s.api_key_env(), None);
    }

    #[test]
    fn provider_kind_parses_from_config_names() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
    }

    #[test]
    fn missing_key_is_config_error() {
        let s = GenerationSettings {
            api_key_env: Some("VALSUITE_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..GenerationSettings::for_provider(ProviderKind::Groq)
        };
        assert!(matches!(build_generator(&s), Err(CoreError::Config(_))));
    }

    #[test]
    fn ollama_must_stay_local() {
        let s = GenerationSettings {
            base_url: Some("http://10.1.2.3:11434/v1".to_string()),
            ..GenerationSettings::for_provider(ProviderKind::Ollama)
        };
        assert!(matches!(build_generator(&s), Err(CoreError::PolicyBlocked(_))));
    }
}
