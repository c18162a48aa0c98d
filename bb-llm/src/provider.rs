use crate::dialect::Dialect;
use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Groq,
    Gemini,
    DeepSeek,
    OpenAi,
    Yandex,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Groq,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::OpenAi,
        ProviderKind::Yandex,
    ];

    pub const ALL_IDS: [&'static str; 5] = ["groq", "gemini", "deepseek", "openai", "yandex"];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Yandex => "yandex",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Yandex => {
                "https://llm.api.cloud.yandex.net/foundationModels/v1/completion"
            }
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama-3.1-8b-instant",
            ProviderKind::Gemini => "gemini-2.0-flash-exp",
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::Yandex => "yandexgpt",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Yandex => "YANDEX_API_KEY",
        }
    }

    pub fn model_env(self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_MODEL",
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::DeepSeek => "DEEPSEEK_MODEL",
            ProviderKind::OpenAi => "OPENAI_MODEL",
            ProviderKind::Yandex => "YANDEX_MODEL",
        }
    }

    pub fn base_url_env(self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_BASE_URL",
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::DeepSeek => "DEEPSEEK_BASE_URL",
            ProviderKind::OpenAi => "OPENAI_BASE_URL",
            ProviderKind::Yandex => "YANDEX_BASE_URL",
        }
    }

    /// Where to get a free key, for providers that have a free tier.
    pub fn key_hint(self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("https://console.groq.com/"),
            ProviderKind::Gemini => Some("https://aistudio.google.com/app/apikey"),
            ProviderKind::DeepSeek => Some("https://platform.deepseek.com/"),
            ProviderKind::OpenAi | ProviderKind::Yandex => None,
        }
    }

    /// OpenAI and Yandex refuse to start without a key; the free-tier
    /// providers only check at call time.
    pub fn requires_key_at_construction(self) -> bool {
        matches!(self, ProviderKind::OpenAi | ProviderKind::Yandex)
    }

    pub(crate) fn dialect(self) -> Dialect {
        match self {
            ProviderKind::Groq | ProviderKind::DeepSeek | ProviderKind::OpenAi => {
                Dialect::ChatCompletions
            }
            ProviderKind::Gemini => Dialect::Gemini,
            ProviderKind::Yandex => Dialect::Yandex,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|p| p.id() == normalized)
            .ok_or_else(|| ConfigError::UnsupportedProvider {
                value: s.to_string(),
            })
    }
}
