use crate::adapters::providers::GenerationSettings;
use crate::error::{CoreError, CoreResult};
use crate::suite::model::NormalizeConfig;
use crate::suite::prompt::DEFAULT_MAX_URS_CHARS;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub max_urs_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_urs_chars: DEFAULT_MAX_URS_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoverageConfig {
    pub test_id_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuiteConfig {
    pub project_name: String,
    pub generation: GenerationSettings,
    pub prompt: PromptConfig,
    pub normalize: NormalizeConfig,
    pub coverage: CoverageConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            project_name: "GxP System".to_string(),
            generation: GenerationSettings::default(),
            prompt: PromptConfig::default(),
            normalize: NormalizeConfig::default(),
            coverage: CoverageConfig::default(),
        }
    }
}

impl SuiteConfig {
    pub fn from_toml_str(s: &str) -> CoreResult<Self> {
        let cfg: SuiteConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(CoreError::Config("project_name cannot be empty".to_string()));
        }
        if self.prompt.max_urs_chars == 0 {
            return Err(CoreError::Config("prompt.max_urs_chars must be > 0".to_string()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(CoreError::Config(
                "generation.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
