//! Configuration loading and validation.
//!
//! Loads `config.toml` from `$HIREBOT_CONFIG_PATH` or the working directory.
//! Precedence: env vars > config file > defaults. The resulting [`Config`] is
//! passed by value into each component constructor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Positions offered when the config does not list any.
pub const DEFAULT_POSITIONS: &[&str] = &[
    "Python Developer",
    "SQL Developer",
    "Data Analyst",
    "ML Engineer",
];

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model routing configuration.
    pub models: ModelsConfig,
    /// SQLite database settings.
    pub database: DatabaseConfig,
    /// Interview scheduling policy.
    pub scheduling: SchedulingConfig,
    /// Conversation agent settings.
    pub agent: AgentConfig,
    /// Knowledge base lookup settings.
    pub knowledge: KnowledgeConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = config_path_with(env);
        let mut config = load_config(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("HIREBOT_DB_PATH") {
            self.database.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env("HIREBOT_DEFAULT_MODEL") {
            self.models.default = v;
        }
        if let Some(v) = env("HIREBOT_INTENT_STRATEGY") {
            match IntentStrategyKind::parse(&v) {
                Some(kind) => self.agent.intent_strategy = kind,
                None => tracing::warn!(
                    var = "HIREBOT_INTENT_STRATEGY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("HIREBOT_DEFAULT_POSITION") {
            self.scheduling.default_position = v;
        }
        if let Some(v) = env("HIREBOT_RECRUITER_PHONE") {
            self.scheduling.recruiter_phone = v;
        }
        if let Some(v) = env("HIREBOT_SEED_SAMPLE_SLOTS") {
            match v.parse() {
                Ok(flag) => self.scheduling.seed_sample_slots = flag,
                Err(_) => tracing::warn!(
                    var = "HIREBOT_SEED_SAMPLE_SLOTS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("HIREBOT_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    /// Resolve the SQLite database path, falling back to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("hirebot.db")),
        }
    }

    /// Resolve the log directory, falling back to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the home directory
    /// cannot be determined.
    pub fn log_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.logging.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("logs")),
        }
    }
}

// ── Models ──────────────────────────────────────────────────────

/// Model routing: default model and per-role overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Default model identifier (e.g. `"openai/gpt-4o-mini"`).
    pub default: String,
    /// Per-role model overrides (`intent`, `registration`, `scheduling`, `info`, `exit`).
    pub roles: HashMap<String, String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: "openai/gpt-4o-mini".to_owned(),
            roles: HashMap::new(),
        }
    }
}

/// Collect every distinct model spec referenced by the config.
pub fn all_model_specs(models: &ModelsConfig) -> Vec<String> {
    let mut specs = vec![models.default.clone()];
    for spec in models.roles.values() {
        if !specs.contains(spec) {
            specs.push(spec.clone());
        }
    }
    specs
}

// ── Database ────────────────────────────────────────────────────

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path. `None` resolves to `~/.hirebot/hirebot.db`.
    pub path: Option<PathBuf>,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 4,
        }
    }
}

// ── Scheduling ──────────────────────────────────────────────────

/// Interview scheduling policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Position used when the candidate names none.
    pub default_position: String,
    /// Recruiter phone attached to every booking.
    pub recruiter_phone: String,
    /// Days searched after the start date when no end date is given.
    pub search_window_days: u32,
    /// Maximum distinct dates returned by a slot search.
    pub max_offer_dates: usize,
    /// Populate sample slots at startup. Development only.
    pub seed_sample_slots: bool,
    /// Positions reported as open to candidates.
    pub positions: Vec<String>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_position: "Python Developer".to_owned(),
            recruiter_phone: "+1-555-0000".to_owned(),
            search_window_days: 14,
            max_offer_dates: 5,
            seed_sample_slots: false,
            positions: DEFAULT_POSITIONS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

// ── Agent ───────────────────────────────────────────────────────

/// How the top-level action is decided each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStrategyKind {
    /// Model-backed classification with keyword fallback on failure.
    Model,
    /// Keyword matching only.
    Keyword,
}

impl IntentStrategyKind {
    /// Parse from a config or env string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Some(Self::Model),
            "keyword" => Some(Self::Keyword),
            _ => None,
        }
    }
}

/// Conversation agent settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Intent classification strategy.
    pub intent_strategy: IntentStrategyKind,
    /// Number of recent messages included in model context.
    pub context_messages: usize,
    /// Upper bound on turns kept in memory per conversation.
    pub max_transcript_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            intent_strategy: IntentStrategyKind::Model,
            context_messages: 6,
            max_transcript_turns: 200,
        }
    }
}

// ── Knowledge ───────────────────────────────────────────────────

/// Knowledge base lookup settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Documents retrieved per question.
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

// ── Logging ─────────────────────────────────────────────────────

/// Log output settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling JSON logs. `None` resolves to `~/.hirebot/logs`.
    pub dir: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────

/// Resolve config path using a custom env resolver.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    match env("HIREBOT_CONFIG_PATH") {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from("config.toml"),
    }
}

/// Load config from a TOML file. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), "loading config from file");
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config at {}: {e}",
            path.display()
        )),
    }
}

/// Resolve the default data directory (`~/.hirebot/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".hirebot"))
}
