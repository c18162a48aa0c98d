use crate::provider::ProviderKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Raised while building a `Dispatcher`; fatal to startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported provider {value:?}; expected one of: {}", ProviderKind::ALL_IDS.join(", "))]
    UnsupportedProvider { value: String },

    #[error("{env_var} is required for provider {provider}")]
    MissingApiKey {
        provider: ProviderKind,
        env_var: &'static str,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Failure of a single generation call. Every backend funnels into this one
/// shape, tagged with the provider that produced it.
#[derive(Debug, Error)]
#[error("generation via {provider} failed: {kind}")]
pub struct GenerationError {
    pub provider: ProviderKind,
    pub kind: GenerationErrorKind,
}

#[derive(Debug, Error)]
pub enum GenerationErrorKind {
    #[error("{env_var} is not set{}", hint_suffix(.hint))]
    MissingCredential {
        env_var: &'static str,
        hint: Option<&'static str>,
    },

    #[error("provider api error status={status} body={body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    match hint {
        Some(url) => format!("; get a free key at {url}"),
        None => String::new(),
    }
}

impl GenerationError {
    pub fn new(provider: ProviderKind, kind: GenerationErrorKind) -> Self {
        Self { provider, kind }
    }

    pub fn is_missing_credential(&self) -> bool {
        matches!(self.kind, GenerationErrorKind::MissingCredential { .. })
    }

    /// HTTP status of a rejected call, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            GenerationErrorKind::Api { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationErrorKind {
    fn from(e: reqwest::Error) -> Self {
        // Gemini carries the key in the query string.
        if e.is_decode() {
            return Self::ResponseFormat(e.without_url().to_string());
        }
        Self::Transport(e.without_url().to_string())
    }
}

impl From<serde_json::Error> for GenerationErrorKind {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseFormat(e.to_string())
    }
}
