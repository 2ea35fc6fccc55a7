use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to write config: {0}")]
    WriteError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for DepScout
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DepScoutConfig {
    /// Model provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Conversation and fan-out limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Sandboxed working root used by the file tools
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Provider name: "openai" or "openai-compatible"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Base URL of the Chat Completions endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key; local OpenAI-compatible servers usually need none
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature (0.0 to 2.0); not sent to GPT-5 or o-series models
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Limits for the per-file conversations and the batch fan-out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Maximum number of sessions running at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Maximum model turns per file before the session is abandoned
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Deadline for a whole per-file session
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Deadline for a single model invocation (including provider retries)
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Deadline for a single tool call
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Markdown file overriding the built-in system prompt
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            max_turns: default_max_turns(),
            session_timeout_secs: default_session_timeout_secs(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            system_prompt_file: None,
        }
    }
}

impl AgentConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Working root the file tools are confined to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    /// Cap on the number of paths returned by one search
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            max_search_results: default_max_search_results(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-5-nano".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_concurrency_limit() -> usize {
    5
}
fn default_max_turns() -> usize {
    10
}
fn default_session_timeout_secs() -> u64 {
    600
}
fn default_model_timeout_secs() -> u64 {
    180
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_max_search_results() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered loading
pub struct ConfigManager {
    config: DepScoutConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.depscout.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading DepScout configuration");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!(path = %path.display(), "Configuration loaded"),
            None => info!("Configuration loaded (no config file, using defaults)"),
        }
        debug!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            concurrency_limit = config.agent.concurrency_limit,
            max_turns = config.agent.max_turns,
            root = %config.workspace.root.display(),
            "Effective configuration"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit TOML file, still honouring environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                debug!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".depscout.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .depscout.env: {}", e);
                } else {
                    debug!("Loaded .depscout.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.depscout.toml (current directory)
    /// 2. ~/.depscout/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(DepScoutConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".depscout.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".depscout").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((DepScoutConfig::default(), None))
    }

    /// Read TOML config file
    fn read_toml_file(path: &Path) -> Result<DepScoutConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: DepScoutConfig) -> DepScoutConfig {
        // LLM configuration
        if let Ok(provider) = std::env::var("DEPSCOUT_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) =
            std::env::var("DEPSCOUT_LLM_BASE_URL").or_else(|_| std::env::var("OPENAI_BASE_URL"))
        {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("DEPSCOUT_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(key) =
            std::env::var("DEPSCOUT_LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            config.llm.api_key = Some(key);
        }
        if let Ok(temp) = std::env::var("DEPSCOUT_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                config.llm.temperature = t;
            }
        }
        if let Ok(retries) = std::env::var("DEPSCOUT_LLM_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                config.llm.max_retries = r;
            }
        }

        // Agent configuration
        if let Ok(limit) = std::env::var("DEPSCOUT_CONCURRENCY") {
            if let Ok(l) = limit.parse() {
                config.agent.concurrency_limit = l;
            }
        }
        if let Ok(turns) = std::env::var("DEPSCOUT_MAX_TURNS") {
            if let Ok(t) = turns.parse() {
                config.agent.max_turns = t;
            }
        }
        if let Ok(secs) = std::env::var("DEPSCOUT_SESSION_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                config.agent.session_timeout_secs = s;
            }
        }
        if let Ok(path) = std::env::var("DEPSCOUT_SYSTEM_PROMPT_FILE") {
            config.agent.system_prompt_file = Some(PathBuf::from(path));
        }

        // Workspace configuration
        if let Ok(root) = std::env::var("DEPSCOUT_WORKSPACE_ROOT") {
            config.workspace.root = PathBuf::from(root);
        }

        // Logging configuration
        if let Ok(level) = std::env::var("DEPSCOUT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("DEPSCOUT_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &DepScoutConfig) -> Result<(), ConfigError> {
        if config.agent.concurrency_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.concurrency_limit must be at least 1".to_string(),
            ));
        }
        if config.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".to_string(),
            ));
        }
        if config.agent.session_timeout_secs == 0
            || config.agent.model_timeout_secs == 0
            || config.agent.tool_timeout_secs == 0
            || config.llm.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if config.workspace.max_search_results == 0 {
            return Err(ConfigError::ValidationError(
                "workspace.max_search_results must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                config.llm.temperature
            )));
        }
        if !matches!(config.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                config.logging.format
            )));
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DepScoutConfig {
        &self.config
    }

    /// Mutable access for command-line overrides; callers re-validate afterwards
    pub fn config_mut(&mut self) -> &mut DepScoutConfig {
        &mut self.config
    }

    /// Get the config file path (if loaded from file)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = DepScoutConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        info!("Created default config at: {}", path.display());
        Ok(())
    }
}
