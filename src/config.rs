//! Layered configuration for sprintboard.
//!
//! Sources, lowest precedence first:
//! 1. Global file: `<config dir>/sprintboard/config.toml`
//! 2. Project file: `.sprintboard/config.toml`
//! 3. Environment: `SPRINTBOARD_API_URL`, `SPRINTBOARD_TOKEN`,
//!    `SPRINTBOARD_TIMEOUT_SECS` (a `.env` file is honoured by the binary)
//! 4. CLI flags
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080/api"
//! timeout_secs = 60
//!
//! [division]
//! default_subtasks = 3
//! atomize_path = "/gemini/atomize"
//! analyze_path = "/gemini/analyze-tasks"
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = "/var/log/sprintboard"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_URL: &str = "SPRINTBOARD_API_URL";
pub const ENV_TOKEN: &str = "SPRINTBOARD_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "SPRINTBOARD_TIMEOUT_SECS";

/// REST gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// AI division settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionSection {
    /// Subtasks requested per task when none is given
    #[serde(default = "default_subtasks")]
    pub default_subtasks: u8,
    #[serde(default = "default_atomize_path")]
    pub atomize_path: String,
    #[serde(default = "default_analyze_path")]
    pub analyze_path: String,
}

fn default_subtasks() -> u8 {
    3
}

fn default_atomize_path() -> String {
    "/gemini/atomize".to_string()
}

fn default_analyze_path() -> String {
    "/gemini/analyze-tasks".to_string()
}

impl Default for DivisionSection {
    fn default() -> Self {
        Self {
            default_subtasks: default_subtasks(),
            atomize_path: default_atomize_path(),
            analyze_path: default_analyze_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// When set, logs also go to a daily rolling file in this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
        }
    }
}

/// Contents of one `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub division: DivisionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl BoardToml {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(2..=5).contains(&self.division.default_subtasks) {
            warnings.push(format!(
                "default_subtasks {} is outside 2..=5 and will be clamped",
                self.division.default_subtasks
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "base_url '{}' should start with http:// or https://",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("timeout_secs = 0 disables the request timeout".to_string());
        }
        warnings
    }
}

/// Deep-merge `overlay` into `base`; overlay values win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
    pub toml: BoardToml,
    /// Files that contributed, in load order
    pub sources: Vec<PathBuf>,
    pub verbose: bool,
}

impl BoardConfig {
    /// `<config dir>/sprintboard/config.toml`, if the platform has a config dir.
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sprintboard").join("config.toml"))
    }

    pub fn project_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".sprintboard").join("config.toml")
    }

    /// Load from the standard locations and the process environment.
    pub fn load(project_dir: &Path) -> Result<Self> {
        Self::load_from(Self::global_path().as_deref(), project_dir, |key| {
            std::env::var(key).ok()
        })
    }

    /// Load from explicit locations with an injected environment lookup.
    pub fn load_from(
        global: Option<&Path>,
        project_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut merged = toml::Table::new();
        let mut sources = Vec::new();

        let project = Self::project_path(project_dir);
        for path in global.into_iter().chain(std::iter::once(project.as_path())) {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let table: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            merge_tables(&mut merged, table);
            sources.push(path.to_path_buf());
        }

        let rendered = toml::to_string(&merged).context("Failed to render merged config")?;
        let mut config = Self {
            toml: BoardToml::parse(&rendered)?,
            sources,
            verbose: false,
        };
        config.apply_env(env)?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.toml.api.base_url = url;
        }
        if let Some(token) = env(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.toml.api.token = Some(token);
        }
        if let Some(raw) = env(ENV_TIMEOUT_SECS) {
            self.toml.api.timeout_secs = raw.trim().parse().with_context(|| {
                format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, raw)
            })?;
        }
        Ok(())
    }

    /// Apply CLI overrides.
    pub fn with_cli_args(mut self, api_url: Option<String>, verbose: bool, json_logs: bool) -> Self {
        if let Some(url) = api_url {
            self.toml.api.base_url = url;
        }
        if json_logs {
            self.toml.logging.json = true;
        }
        self.verbose = verbose;
        self
    }

    pub fn api(&self) -> &ApiSection {
        &self.toml.api
    }

    pub fn division(&self) -> &DivisionSection {
        &self.toml.division
    }

    pub fn logging(&self) -> &LoggingSection {
        &self.toml.logging
    }

    /// Effective log filter: `debug` when verbose, otherwise the configured level.
    pub fn log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.toml.logging.level
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
