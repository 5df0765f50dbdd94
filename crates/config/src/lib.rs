//! Configuration loading, validation, and management for Tether.
//!
//! Loads configuration from `~/.tether/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.tether/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider preset: "openrouter", "openai", "ollama", or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL (required for "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool limits
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on model turns per run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Upper bound on a single tool call
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Replace the built-in instruction preamble
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_max_turns() -> u32 {
    8
}
fn default_tool_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            tool_timeout_secs: default_tool_timeout_secs(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// `read_file` refuses files larger than this
    #[serde(default = "default_read_max_bytes")]
    pub read_max_bytes: u64,

    /// `read_file` output is truncated past this many characters
    #[serde(default = "default_max_chars")]
    pub read_max_chars: usize,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Environment overrides visible to tools
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

fn default_read_max_bytes() -> u64 {
    2 * 1024 * 1024
}
fn default_max_chars() -> usize {
    20_000
}
fn default_true() -> bool {
    true
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            read_max_bytes: default_read_max_bytes(),
            read_max_chars: default_max_chars(),
            search: SearchConfig::default(),
            sandbox: SandboxConfig::default(),
            fetch: FetchConfig::default(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,

    /// Files above this size are skipped
    #[serde(default = "default_search_max_file_bytes")]
    pub max_file_bytes: u64,

    #[serde(default = "default_max_chars")]
    pub max_output_chars: usize,
}

fn default_max_matches() -> usize {
    200
}
fn default_search_max_file_bytes() -> u64 {
    1024 * 1024
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
            max_file_bytes: default_search_max_file_bytes(),
            max_output_chars: default_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Instruction budget per script run
    #[serde(default = "default_fuel")]
    pub fuel: u64,

    /// Wall-clock limit per script run
    #[serde(default = "default_sandbox_timeout_ms")]
    pub timeout_ms: u64,

    /// Linear memory ceiling per store
    #[serde(default = "default_sandbox_memory")]
    pub max_memory_bytes: usize,

    /// Captured console output is truncated past this many characters
    #[serde(default = "default_max_chars")]
    pub max_log_chars: usize,
}

fn default_fuel() -> u64 {
    1_000_000_000
}
fn default_sandbox_timeout_ms() -> u64 {
    30_000
}
fn default_sandbox_memory() -> usize {
    16 * 1024 * 1024
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            fuel: default_fuel(),
            timeout_ms: default_sandbox_timeout_ms(),
            max_memory_bytes: default_sandbox_memory(),
            max_log_chars: default_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Register the `fetch_url` tool
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_curl_path")]
    pub curl_path: String,

    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Response bodies larger than this are cut off by curl
    #[serde(default = "default_fetch_max_bytes")]
    pub max_bytes: u64,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_curl_path() -> String {
    "curl".into()
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_fetch_max_bytes() -> u64 {
    1024 * 1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            curl_path: default_curl_path(),
            timeout_secs: default_fetch_timeout_secs(),
            max_bytes: default_fetch_max_bytes(),
            max_chars: default_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.tether/config.toml).
    ///
    /// Also checks environment variables:
    /// - `TETHER_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `TETHER_PROVIDER`, `TETHER_MODEL`, `TETHER_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// A key in the file wins over `*_API_KEY` variables unless
    /// `TETHER_API_KEY` is set.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("TETHER_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = lookup("OPENROUTER_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("TETHER_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("TETHER_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("TETHER_API_URL") {
            self.api_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".tether")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_turns == 0 || self.agent.max_turns > 100 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be between 1 and 100".into(),
            ));
        }
        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be > 0".into(),
            ));
        }
        if self.tools.search.max_matches == 0 {
            return Err(ConfigError::ValidationError(
                "tools.search.max_matches must be > 0".into(),
            ));
        }
        let sandbox = &self.tools.sandbox;
        if sandbox.fuel == 0 || sandbox.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tools.sandbox.fuel and tools.sandbox.timeout_ms must be > 0".into(),
            ));
        }
        // One wasm page.
        if sandbox.max_memory_bytes < 64 * 1024 {
            return Err(ConfigError::ValidationError(
                "tools.sandbox.max_memory_bytes must be at least 65536".into(),
            ));
        }
        if self.provider == "custom" && self.api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "provider \"custom\" requires api_url".into(),
            ));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
