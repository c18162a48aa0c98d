use crate::error::ConfigError;
use crate::provider::ProviderKind;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const PROVIDER_ENV: &str = "LLM_PROVIDER";
const TIMEOUT_ENV: &str = "LLM_TIMEOUT_SECS";

/// Backend binding resolved once at startup and never mutated.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Provider defaults with no key.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_key: None,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|k: &String| !k.trim().is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves `LLM_PROVIDER` (default `groq`) and the selected provider's
    /// `*_API_KEY`, `*_MODEL` and `*_BASE_URL` through `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get(PROVIDER_ENV) {
            Some(v) => v.parse::<ProviderKind>()?,
            None => ProviderKind::Groq,
        };

        let mut cfg = Self::new(provider);
        if let Some(key) = get(provider.api_key_env()) {
            cfg.api_key = Some(key);
        }
        if let Some(model) = get(provider.model_env()) {
            cfg.model = model;
        }
        if let Some(base_url) = get(provider.base_url_env()) {
            cfg.base_url = base_url;
        }
        if let Some(raw) = get(TIMEOUT_ENV) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: TIMEOUT_ENV.to_string(),
                    value: raw.clone(),
                })?;
            cfg.timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }

    /// Construction-time checks. Free-tier providers may start without a key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.requires_key_at_construction() && self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey {
                provider: self.provider,
                env_var: self.provider.api_key_env(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: self.provider.model_env().to_string(),
                value: self.model.clone(),
            });
        }
        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                key: self.provider.base_url_env().to_string(),
                value: self.base_url.clone(),
            });
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_groq_when_provider_unset() {
        let cfg = ProviderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.provider, ProviderKind::Groq);
        assert_eq!(cfg.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(cfg.model, "llama-3.1-8b-instant");
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.timeout, Duration::from_secs(60));
    }

    #[test]
    fn reads_selected_provider_overrides_only() {
        let cfg = ProviderConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "g-key"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("GROQ_API_KEY", "unused"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, ProviderKind::Gemini);
        assert_eq!(cfg.api_key(), Some("g-key"));
        assert_eq!(cfg.model, "gemini-1.5-pro");
        assert_eq!(cfg.base_url, ProviderKind::Gemini.default_base_url());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = ProviderConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "  "),
            ("GROQ_API_KEY", ""),
            ("GROQ_MODEL", " "),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, ProviderKind::Groq);
        assert!(cfg.api_key().is_none());
        assert_eq!(cfg.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn unknown_provider_fails() {
        let err = ProviderConfig::from_lookup(lookup(&[("LLM_PROVIDER", "bogus")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider { .. }));
    }

    #[test]
    fn bad_timeout_fails() {
        let err =
            ProviderConfig::from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_TIMEOUT_SECS"));
    }

    #[test]
    fn validate_enforces_key_for_openai_and_yandex_only() {
        for p in ProviderKind::ALL {
            let res = ProviderConfig::new(p).validate();
            if p.requires_key_at_construction() {
                assert!(matches!(res, Err(ConfigError::MissingApiKey { .. })), "{p}");
            } else {
                assert!(res.is_ok(), "{p}");
            }
        }
        assert!(
            ProviderConfig::new(ProviderKind::OpenAi)
                .with_api_key("sk-test")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let cfg = ProviderConfig::new(ProviderKind::Yandex).with_api_key("   ");
        assert!(cfg.api_key().is_none());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_key() {
        let cfg = ProviderConfig::new(ProviderKind::OpenAi).with_api_key("sk-secret");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
