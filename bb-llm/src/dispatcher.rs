use crate::config::ProviderConfig;
use crate::connection::ConnectionManager;
use crate::dialect::{Auth, Call, Dialect};
use crate::error::{ConfigError, GenerationError, GenerationErrorKind, Result};
use crate::provider::ProviderKind;
use crate::types::{
    DEFAULT_SYSTEM_MESSAGE, DEFAULT_TEMPERATURE, GenerationRequest, with_context,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

/// Text generation as the dialogue layer sees it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str, max_tokens: u32, temperature: f64)
    -> Result<String>;

    /// Prepends `"Context: {context}\n\n"` when `context` is non-empty and
    /// generates with the default temperature.
    async fn generate_with_context(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let prompt = with_context(prompt, context);
        self.generate_text(&prompt, max_tokens, DEFAULT_TEMPERATURE)
            .await
    }
}

/// Bound to one provider for its whole lifetime.
pub struct Dispatcher {
    config: ProviderConfig,
    dialect: Dialect,
    system_message: String,
    connection: ConnectionManager,
}

impl Dispatcher {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(config: ProviderConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            base_url = %config.base_url,
            has_api_key = config.api_key().is_some(),
            "llm dispatcher configured"
        );
        Ok(Self {
            dialect: config.provider.dialect(),
            connection: ConnectionManager::new(config.timeout),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            config,
        })
    }

    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::new(ProviderConfig::from_env()?)
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Releases the pooled client. Call once at shutdown.
    pub fn close(&self) {
        self.connection.close();
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        let request = GenerationRequest::new(prompt)
            .max_tokens(max_tokens)
            .temperature(temperature)
            .system_message(self.system_message.as_str());
        self.generate(&request).await
    }

    pub async fn generate_with_context(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let prompt = with_context(prompt, context);
        self.generate_text(&prompt, max_tokens, DEFAULT_TEMPERATURE)
            .await
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(provider = %self.config.provider, model = %self.config.model)
    )]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let provider = self.config.provider;
        self.execute(request).await.map_err(|kind| {
            tracing::warn!(%provider, error = %kind, "generation failed");
            GenerationError::new(provider, kind)
        })
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationErrorKind> {
        let provider = self.config.provider;
        let api_key = self
            .config
            .api_key()
            .ok_or(GenerationErrorKind::MissingCredential {
                env_var: provider.api_key_env(),
                hint: provider.key_hint(),
            })?;
        request.validate()?;

        let wire = self.dialect.build(&Call {
            base_url: &self.config.base_url,
            model: &self.config.model,
            api_key,
            system_message: &request.system_message,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })?;

        let http = self.connection.acquire();
        let builder = http.post(wire.url).json(&wire.body);
        let builder = match &wire.auth {
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::ApiKeyHeader(key) => builder.header(AUTHORIZATION, format!("Api-Key {key}")),
            Auth::Query => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationErrorKind::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = self.dialect.parse(&body)?;
        tracing::debug!(chars = text.chars().count(), "generation completed");
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for Dispatcher {
    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        Dispatcher::generate_text(self, prompt, max_tokens, temperature).await
    }
}
