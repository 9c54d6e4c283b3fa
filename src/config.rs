//! Match configuration.
//!
//! Loaded from a TOML file when present, otherwise defaults. API keys are
//! never stored in the file; they come from `OPENAI_API_KEY` /
//! `ANTHROPIC_API_KEY` in the environment (or a `.env` file).

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration for one side's move proposer.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ProposerConfig {
    /// LLM provider (openai or anthropic).
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Model name (e.g., "gpt-4o-mini", "claude-3-5-haiku-20241022").
    #[serde(default = "default_model")]
    model: String,

    /// Maximum tokens for one move reply.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_proposer() -> ProposerConfig {
    ProposerConfig::default()
}

fn default_max_moves() -> u32 {
    100
}

fn default_games_dir() -> String {
    "games".to_string()
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ProposerConfig {
    /// Creates LLM client configuration for this side.
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY in the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the provider's key variable is unset.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");

        let api_key = match self.provider {
            LlmProvider::OpenAI => std::env::var("OPENAI_API_KEY").map_err(|_| {
                ConfigError::new("OPENAI_API_KEY environment variable not set".to_string())
            })?,
            LlmProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                ConfigError::new("ANTHROPIC_API_KEY environment variable not set".to_string())
            })?,
        };

        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.model.clone(),
            self.max_tokens,
        ))
    }

    /// Display label for this side's proposer, e.g. "openai/gpt-4o-mini".
    pub fn label(&self) -> String {
        let provider = match self.provider {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
        };
        format!("{}/{}", provider, self.model)
    }
}

/// Configuration for a full match.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Maximum plies before the match is stopped as incomplete.
    #[serde(default = "default_max_moves")]
    max_moves: u32,

    /// Directory where game records are saved.
    #[serde(default = "default_games_dir")]
    games_dir: String,

    /// White's proposer.
    #[serde(default = "default_proposer")]
    white: ProposerConfig,

    /// Black's proposer.
    #[serde(default = "default_proposer")]
    black: ProposerConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_moves: default_max_moves(),
            games_dir: default_games_dir(),
            white: default_proposer(),
            black: default_proposer(),
        }
    }
}

impl MatchConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(max_moves = config.max_moves, "Config loaded successfully");
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only for a file that exists but does not
    /// parse.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!(
                "Config file not found at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
