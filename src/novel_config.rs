//! Layered configuration for novelsmith.
//!
//! Settings are read from `novel.toml` files and merged in order:
//! 1. user file (`<config dir>/novelsmith/novel.toml`)
//! 2. project file (`.novelsmith/novel.toml`)
//! 3. environment (`NOVELSMITH_PROVIDER`, `GEMINI_API_KEY`, `DEEPSEEK_API_KEY`)
//! 4. CLI flags (`--yes`, `--task-interval`)
//!
//! # Configuration File Format
//!
//! ```toml
//! [generation]
//! provider = "gemini"
//! temperature = 0.8
//! max_output_tokens = 8192
//!
//! [gemini]
//! model = "gemini-2.5-pro"
//!
//! [deepseek]
//! model = "deepseek-chat"
//! endpoint = "https://api.deepseek.com/v1"
//!
//! [workflow]
//! auto_approve = true
//! pause_on_milestone = true
//! task_interval_ms = 2000
//! chapter_words = 3000
//! auto_export_chapters = true
//! forward_planning_interval = 5
//! autosave_interval = 3
//! revision = "always"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{ModelConfig, Provider};
use crate::config::ProjectPaths;
use crate::errors::ValidationError;
use crate::orchestrator::RevisionPolicy;
use crate::workflow::prompts::PromptSettings;

/// Generation parameters shared by both providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Gemini provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
        }
    }
}

/// DeepSeek (OpenAI-compatible) provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepSeekSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_deepseek_model")]
    pub model: String,
    #[serde(default = "default_deepseek_endpoint")]
    pub endpoint: String,
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_deepseek_endpoint() -> String {
    "https://api.deepseek.com/v1".to_string()
}

impl Default for DeepSeekSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_deepseek_model(),
            endpoint: default_deepseek_endpoint(),
        }
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSection {
    /// Commit non-milestone outputs without review.
    #[serde(default = "default_true")]
    pub auto_approve: bool,
    /// Stop for review at milestone tasks.
    #[serde(default = "default_true")]
    pub pause_on_milestone: bool,
    /// Delay between tasks within a stage.
    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,
    #[serde(default = "default_chapter_words")]
    pub chapter_words: u32,
    #[serde(default = "default_true")]
    pub auto_export_chapters: bool,
    /// Run forward planning after every Nth chapter.
    #[serde(default = "default_forward_planning_interval")]
    pub forward_planning_interval: u32,
    /// Save after every Nth chapter.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval: u32,
    #[serde(default)]
    pub revision: RevisionPolicy,
}

fn default_true() -> bool {
    true
}

fn default_task_interval_ms() -> u64 {
    2000
}

fn default_chapter_words() -> u32 {
    3000
}

fn default_forward_planning_interval() -> u32 {
    5
}

fn default_autosave_interval() -> u32 {
    3
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            auto_approve: true,
            pause_on_milestone: true,
            task_interval_ms: default_task_interval_ms(),
            chapter_words: default_chapter_words(),
            auto_export_chapters: true,
            forward_planning_interval: default_forward_planning_interval(),
            autosave_interval: default_autosave_interval(),
            revision: RevisionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// The complete novel.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NovelToml {
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub deepseek: DeepSeekSection,
    #[serde(default)]
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NovelToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse novel.toml")
    }

    /// Load `novel.toml` from a state directory, or defaults if absent.
    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join("novel.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge every file that exists, later files overriding earlier ones key by key.
    pub fn load_layered(files: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        for path in files.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let layer: toml::Value = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            merge_toml(&mut merged, layer);
        }
        merged.try_into().context("Failed to parse merged novel.toml")
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize novel.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ValidationError> {
        if let Some(provider) = lookup("NOVELSMITH_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.generation.provider = provider.parse()?;
        }
        if let Some(key) = lookup(Provider::Gemini.api_key_env()).filter(|v| !v.trim().is_empty()) {
            self.gemini.api_key = Some(key);
        }
        if let Some(key) = lookup(Provider::Deepseek.api_key_env()).filter(|v| !v.trim().is_empty()) {
            self.deepseek.api_key = Some(key);
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ValidationError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// API key for `provider`, if one is configured.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let key = match provider {
            Provider::Gemini => self.gemini.api_key.as_deref(),
            Provider::Deepseek => self.deepseek.api_key.as_deref(),
        };
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Per-call parameters for the configured provider.
    pub fn model_config(&self) -> ModelConfig {
        let provider = self.generation.provider;
        let model = match provider {
            Provider::Gemini => self.gemini.model.clone(),
            Provider::Deepseek => self.deepseek.model.clone(),
        };
        ModelConfig {
            provider,
            model,
            temperature: self.generation.temperature as f32,
            max_output_tokens: self.generation.max_output_tokens,
        }
    }

    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            chapter_words: self.workflow.chapter_words,
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            warnings.push(format!(
                "temperature {} is outside the supported range 0.0-2.0",
                self.generation.temperature
            ));
        }
        if self.generation.max_output_tokens == 0 {
            warnings.push("max_output_tokens is 0; every generation would be empty".to_string());
        }
        if self.workflow.forward_planning_interval == 0 {
            warnings.push("forward_planning_interval is 0; forward planning is disabled".to_string());
        }
        if self.workflow.autosave_interval == 0 {
            warnings.push("autosave_interval is 0; periodic saves are disabled".to_string());
        }
        if self.workflow.chapter_words == 0 {
            warnings.push("chapter_words is 0".to_string());
        }
        if let RevisionPolicy::BelowScore(threshold) = self.workflow.revision
            && !(0.0..=10.0).contains(&threshold)
        {
            warnings.push(format!(
                "revision below_score {} is outside 0-10; scores are parsed out of 10",
                threshold
            ));
        }
        let provider = self.generation.provider;
        if self.api_key(provider).is_none() {
            warnings.push(format!(
                "No API key for provider '{}'. Set {} or add api_key under [{}]",
                provider,
                provider.api_key_env(),
                provider
            ));
        }

        warnings
    }
}

/// Deep-merge `overlay` into `base`; tables merge, everything else replaces.
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Path of the user-level configuration file, if the platform has a config dir.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("novelsmith").join("novel.toml"))
}

/// Fully layered configuration for one project.
#[derive(Debug, Clone)]
pub struct NovelConfig {
    pub paths: ProjectPaths,
    pub toml: NovelToml,
    /// CLI override: verbose logging
    pub verbose: bool,
    /// CLI override: never pause for review
    pub yes: bool,
    /// CLI override for task_interval_ms
    pub cli_task_interval_ms: Option<u64>,
}

impl NovelConfig {
    /// Load user and project files, then apply the environment.
    pub fn new(project_dir: &Path) -> Result<Self> {
        let paths = ProjectPaths::resolve(project_dir)?;
        let mut files = Vec::new();
        if let Some(user) = user_config_file() {
            files.push(user);
        }
        files.push(paths.config_file());

        let mut toml = NovelToml::load_layered(&files)?;
        toml.apply_env()?;

        Ok(Self {
            paths,
            toml,
            verbose: false,
            yes: false,
            cli_task_interval_ms: None,
        })
    }

    /// Create a NovelConfig with CLI overrides.
    pub fn with_cli_args(
        project_dir: &Path,
        verbose: bool,
        yes: bool,
        task_interval_ms: Option<u64>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.yes = yes;
        config.cli_task_interval_ms = task_interval_ms;
        Ok(config)
    }

    /// Whether outputs are committed without review (`--yes` forces it).
    pub fn auto_approve(&self) -> bool {
        self.yes || self.toml.workflow.auto_approve
    }

    /// Whether milestones pause for review (`--yes` disables it).
    pub fn pause_on_milestone(&self) -> bool {
        !self.yes && self.toml.workflow.pause_on_milestone
    }

    /// Inter-task delay (CLI → file → default).
    pub fn task_interval(&self) -> Duration {
        Duration::from_millis(
            self.cli_task_interval_ms
                .unwrap_or(self.toml.workflow.task_interval_ms),
        )
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
