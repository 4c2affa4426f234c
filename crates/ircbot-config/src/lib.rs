use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// IRC connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nick the bot registers with.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Service name sent in the USER command.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Channels joined after login (with or without `#`).
    #[serde(default)]
    pub channels: Vec<String>,
    /// Log every raw inbound line.
    #[serde(default)]
    pub debug: bool,
}

fn default_server() -> String {
    "irc.libera.chat".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_nick() -> String {
    "ircbot".to_string()
}

fn default_service_name() -> String {
    "ircbot-v1.0".to_string()
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            nick: default_nick(),
            service_name: default_service_name(),
            channels: Vec::new(),
            debug: false,
        }
    }
}

/// How inbound reads are split into lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Every read is framed on its own; partial lines are not carried over.
    PerRead,
    /// Partial trailing lines are buffered until the next read completes them.
    #[default]
    Buffered,
}

/// Poll loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bounded wait for transport readability per iteration.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum bytes taken from the transport per read.
    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
    #[serde(default)]
    pub framing: FramingMode,
    /// Catch panicking handlers and cron tasks instead of stopping the loop.
    #[serde(default = "default_true")]
    pub isolate_handlers: bool,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_read_buffer() -> usize {
    4096
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            read_buffer: default_read_buffer(),
            framing: FramingMode::default(),
            isolate_handlers: true,
        }
    }
}

/// Roster and message log database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file path. Defaults to `~/.ircbot/ircbot.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Built-in extensions to activate at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default = "default_plugins")]
    pub enabled: Vec<String>,
}

fn default_plugins() -> Vec<String> {
    vec!["sample".to_string()]
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: default_plugins(),
        }
    }
}

/// Top-level ircbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub irc: IrcConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

impl BotConfig {
    /// Reject settings the bot cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.irc.nick.trim().is_empty() {
            return Err(ConfigError::Invalid("irc.nick must not be empty".into()));
        }
        if self.irc.nick.chars().any(|c| c.is_whitespace() || c == '!') {
            return Err(ConfigError::Invalid(format!(
                "irc.nick {:?} contains illegal characters",
                self.irc.nick
            )));
        }
        if self.irc.server.trim().is_empty() {
            return Err(ConfigError::Invalid("irc.server must not be empty".into()));
        }
        if self.engine.read_buffer == 0 {
            return Err(ConfigError::Invalid(
                "engine.read_buffer must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the database path, falling back to the config directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(ensure_config_dir()?.join("ircbot.db")),
        }
    }
}

/// Resolve the ircbot config directory (~/.ircbot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".ircbot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.ircbot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<BotConfig, ConfigError> {
    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
///
/// A `.env` file in the working directory is loaded into the environment first.
pub fn load_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(BotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: BotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to `path`, creating parent directories as needed.
pub fn save_config_to(config: &BotConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
