use clap::ValueEnum;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{ArtefactError, Result};
use crate::prompt::PromptSet;
use crate::retry::BackoffPolicy;

/// How storyboard frames are derived from the scenario.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryboardMode {
    /// Ask the chat model to turn the scenario into image prompts first.
    DerivedPrompts,
    /// Draw each scenario step directly, prefixed with the storyboard style.
    ScenarioSteps,
}

impl StoryboardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryboardMode::DerivedPrompts => "derived-prompts",
            StoryboardMode::ScenarioSteps => "scenario-steps",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub chat_model: String,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub timeout_secs: u64,
    pub storyboard_mode: StoryboardMode,
    pub portrait: bool,
    pub retry: BackoffPolicy,
    pub prompts: PromptSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".into(),
            chat_model: "gpt-4o-mini".into(),
            image_model: "dall-e-3".into(),
            image_size: "1024x1024".into(),
            image_quality: "standard".into(),
            timeout_secs: 120,
            storyboard_mode: StoryboardMode::DerivedPrompts,
            portrait: false,
            retry: BackoffPolicy::default(),
            prompts: PromptSet::default(),
        }
    }
}

impl Config {
    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ArtefactError::Config(e.to_string()))?;
        Self::from_toml(&text)
            .map_err(|e| ArtefactError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ArtefactError::Config(e.to_string()))
    }

    /// Override the credential and chat model from the environment. Unset or
    /// blank variables leave the file values alone.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(key) = get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.chat_model = model;
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => Ok(k),
            _ => Err(ArtefactError::MissingCredential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
chat_model = "gpt-4o"
storyboard_mode = "scenario-steps"

[retry]
max_tries = 3

[prompts]
storyboard_style = "Sketch in a stick figure style: "
"#,
        )
        .unwrap();
        assert_eq!(cfg.chat_model, "gpt-4o");
        assert_eq!(cfg.image_model, "dall-e-3");
        assert_eq!(cfg.storyboard_mode, StoryboardMode::ScenarioSteps);
        assert_eq!(cfg.retry.max_tries, 3);
        assert_eq!(cfg.retry.max_elapsed_secs, 70);
        assert_eq!(cfg.prompts.storyboard_style, "Sketch in a stick figure style: ");
        assert_eq!(cfg.prompts.scenario, PromptSet::default().scenario);
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(Config::from_toml("chat_model = ["), Err(ArtefactError::Config(_))));
    }

    #[test]
    fn reads_file_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "image_quality = \"hd\"").unwrap();
        let cfg = Config::from_file(f.path()).unwrap();
        assert_eq!(cfg.image_quality, "hd");
    }

    #[test]
    fn env_key_overrides_file_key() {
        let env = |name: &str| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            _ => None,
        };
        let mut cfg = Config::default();
        cfg.apply_env_from(env);
        assert_eq!(cfg.require_api_key().unwrap(), "sk-env");

        let mut cfg = Config { api_key: Some("sk-file".into()), ..Default::default() };
        cfg.apply_env_from(env);
        assert_eq!(cfg.require_api_key().unwrap(), "sk-env");
    }

    #[test]
    fn unset_or_blank_env_keeps_file_values() {
        let mut cfg = Config { api_key: Some("sk-file".into()), ..Default::default() };
        cfg.apply_env_from(|_| None);
        assert_eq!(cfg.require_api_key().unwrap(), "sk-file");

        cfg.apply_env_from(|name| match name {
            "OPENAI_API_KEY" | "OPENAI_MODEL" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.require_api_key().unwrap(), "sk-file");
        assert_eq!(cfg.chat_model, "gpt-4o-mini");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = Config { api_key: Some("  ".into()), ..Default::default() };
        assert!(matches!(cfg.require_api_key(), Err(ArtefactError::MissingCredential)));
        assert!(!cfg.has_api_key());
    }
}
