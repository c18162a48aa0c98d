//! BizBot configuration loader.
//!
//! An optional TOML file supplies defaults; environment variables (after
//! `.env` is loaded) always win.

use bb_llm::{ConfigError, ProviderConfig, ProviderKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const PROVIDER_ENV: &str = "LLM_PROVIDER";
const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
const SYSTEM_MESSAGE_ENV: &str = "LLM_SYSTEM_MESSAGE";
const BOT_TOKEN_PLACEHOLDERS: &[&str] = &["your_bot_token_here", "your_bot_token"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BizBotConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Clone, Default, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Replaces the built-in persona.
    #[serde(default)]
    pub system_message: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_message", &self.system_message.is_some())
            .finish()
    }
}

impl LlmConfig {
    /// Provider the file's `api_key`, `model` and `base_url` belong to.
    /// `None` when the file names a provider that does not exist.
    fn file_provider(&self) -> Option<ProviderKind> {
        match non_blank(self.provider.clone()) {
            Some(id) => id.parse().ok(),
            None => Some(ProviderKind::Groq),
        }
    }

    /// File value standing in for an unset environment variable.
    /// Provider-specific values are only offered when `bound` is set.
    fn file_value(&self, env_key: &str, bound: bool) -> Option<String> {
        match env_key {
            PROVIDER_ENV => self.provider.clone(),
            "LLM_TIMEOUT_SECS" => self.timeout_secs.map(|s| s.to_string()),
            _ if !bound => None,
            k if k.ends_with("_API_KEY") => self.api_key.clone(),
            k if k.ends_with("_MODEL") => self.model.clone(),
            k if k.ends_with("_BASE_URL") => self.base_url.clone(),
            _ => None,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BizBotConfig {
    /// Reads `path`, or the default location when `None`. A missing default
    /// file yields an empty config; a missing explicit file is an error.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using environment only");
                return Ok(Self::default());
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        let cfg = Self::from_toml_str(&contents)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "config file loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        self.provider_config_with(env_lookup)
    }

    /// Resolves the LLM binding with `env` taking precedence over the file.
    /// The file's key, model and base URL are dropped when the environment
    /// selects a different provider than the one the file was written for.
    pub fn provider_config_with<F>(&self, env: F) -> Result<ProviderConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let selected = match non_blank(env(PROVIDER_ENV)) {
            Some(id) => id.parse::<ProviderKind>().ok(),
            None => self.llm.file_provider(),
        };
        let bound = selected.is_some() && selected == self.llm.file_provider();
        if !bound && self.llm.api_key.is_some() {
            tracing::warn!(
                file_provider = ?self.llm.provider,
                selected = ?selected,
                "ignoring [llm] api_key, model and base_url written for another provider"
            );
        }

        ProviderConfig::from_lookup(|key| {
            non_blank(env(key)).or_else(|| non_blank(self.llm.file_value(key, bound)))
        })
    }

    pub fn system_message(&self) -> Option<String> {
        self.system_message_with(env_lookup)
    }

    pub fn system_message_with<F>(&self, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        non_blank(env(SYSTEM_MESSAGE_ENV)).or_else(|| non_blank(self.llm.system_message.clone()))
    }

    pub fn bot_token(&self) -> anyhow::Result<String> {
        self.bot_token_with(env_lookup)
    }

    pub fn bot_token_with<F>(&self, env: F) -> anyhow::Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_blank(env(BOT_TOKEN_ENV))
            .or_else(|| non_blank(self.telegram.bot_token.clone()))
            .ok_or_else(|| {
                anyhow::anyhow!("{BOT_TOKEN_ENV} is not set; create a bot with @BotFather and put its token in .env")
            })?;
        let token = token.trim().to_string();
        if BOT_TOKEN_PLACEHOLDERS.contains(&token.as_str()) {
            return Err(anyhow::anyhow!(
                "{BOT_TOKEN_ENV} still holds the placeholder {token:?}; replace it with the token from @BotFather"
            ));
        }
        Ok(token)
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".bizbot").join("config.toml")
}
