//! Wire formats of the three API families the providers speak.
//!
//! Groq, DeepSeek and OpenAI share the chat-completions schema. Gemini nests
//! the prompt under `contents/parts` and takes the key in the URL. Yandex
//! wants `completionOptions` with a string-typed token limit.

use crate::error::GenerationErrorKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    ChatCompletions,
    Gemini,
    Yandex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Auth {
    Bearer(String),
    ApiKeyHeader(String),
    /// Key already embedded in the URL.
    Query,
}

#[derive(Debug)]
pub(crate) struct WireRequest {
    pub url: reqwest::Url,
    pub auth: Auth,
    pub body: serde_json::Value,
}

/// What a dialect needs to build one request.
pub(crate) struct Call<'a> {
    pub base_url: &'a str,
    pub model: &'a str,
    pub api_key: &'a str,
    pub system_message: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Dialect {
    pub(crate) fn build(&self, call: &Call<'_>) -> Result<WireRequest, GenerationErrorKind> {
        let base = call.base_url.trim_end_matches('/');
        match self {
            Dialect::ChatCompletions => Ok(WireRequest {
                url: parse_url(&format!("{base}/chat/completions"))?,
                auth: Auth::Bearer(call.api_key.to_string()),
                body: serde_json::to_value(ChatRequest::new(call))?,
            }),
            Dialect::Gemini => {
                let mut url = parse_url(&format!("{base}/models/{}:generateContent", call.model))?;
                url.query_pairs_mut().append_pair("key", call.api_key);
                Ok(WireRequest {
                    url,
                    auth: Auth::Query,
                    body: serde_json::to_value(GeminiRequest::new(call))?,
                })
            }
            Dialect::Yandex => Ok(WireRequest {
                url: parse_url(base)?,
                auth: Auth::ApiKeyHeader(call.api_key.to_string()),
                body: serde_json::to_value(YandexRequest::new(call))?,
            }),
        }
    }

    /// Extracts the generated text from a 2xx body and trims it.
    pub(crate) fn parse(&self, body: &str) -> Result<String, GenerationErrorKind> {
        let text = match self {
            Dialect::ChatCompletions => {
                let parsed: ChatResponse = serde_json::from_str(body)?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("choices[0]"))?
                    .message
                    .content
                    .ok_or_else(|| missing("choices[0].message.content"))?
            }
            Dialect::Gemini => {
                let parsed: GeminiResponse = serde_json::from_str(body)?;
                parsed
                    .candidates
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("candidates[0]"))?
                    .content
                    .parts
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("candidates[0].content.parts[0]"))?
                    .text
            }
            Dialect::Yandex => {
                let parsed: YandexResponse = serde_json::from_str(body)?;
                parsed
                    .result
                    .alternatives
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("result.alternatives[0]"))?
                    .message
                    .text
            }
        };
        Ok(text.trim().to_string())
    }
}

fn parse_url(raw: &str) -> Result<reqwest::Url, GenerationErrorKind> {
    reqwest::Url::parse(raw)
        .map_err(|e| GenerationErrorKind::InvalidRequest(format!("bad endpoint url: {e}")))
}

fn missing(path: &str) -> GenerationErrorKind {
    GenerationErrorKind::ResponseFormat(format!("response missing {path}"))
}

// chat completions

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(call: &Call<'a>) -> Self {
        Self {
            model: call.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: call.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: call.prompt,
                },
            ],
            max_tokens: call.max_tokens,
            temperature: call.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// gemini

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: [GeminiContent; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

impl GeminiRequest {
    fn new(call: &Call<'_>) -> Self {
        Self {
            contents: [GeminiContent {
                parts: vec![GeminiPart {
                    text: format!("{}\n\n{}", call.system_message, call.prompt),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: call.temperature,
                max_output_tokens: call.max_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// yandex

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexRequest<'a> {
    model_uri: String,
    completion_options: YandexCompletionOptions,
    messages: [YandexMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexCompletionOptions {
    stream: bool,
    temperature: f64,
    /// The API takes this as a string.
    max_tokens: String,
}

#[derive(Debug, Serialize)]
struct YandexMessage<'a> {
    role: &'static str,
    text: &'a str,
}

impl<'a> YandexRequest<'a> {
    fn new(call: &Call<'a>) -> Self {
        Self {
            model_uri: format!("gpt://{}/yandexgpt/latest", call.model),
            completion_options: YandexCompletionOptions {
                stream: false,
                temperature: call.temperature,
                max_tokens: call.max_tokens.to_string(),
            },
            messages: [
                YandexMessage {
                    role: "system",
                    text: call.system_message,
                },
                YandexMessage {
                    role: "user",
                    text: call.prompt,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct YandexResponse {
    result: YandexResult,
}

#[derive(Debug, Deserialize)]
struct YandexResult {
    #[serde(default)]
    alternatives: Vec<YandexAlternative>,
}

#[derive(Debug, Deserialize)]
struct YandexAlternative {
    message: YandexAltMessage,
}

#[derive(Debug, Deserialize)]
struct YandexAltMessage {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call<'a>(base_url: &'a str) -> Call<'a> {
        Call {
            base_url,
            model: "m-1",
            api_key: "k-1",
            system_message: "SYS",
            prompt: "PROMPT",
            max_tokens: 321,
            temperature: 0.5,
        }
    }

    #[test]
    fn chat_completions_request_shape() {
        let wire = Dialect::ChatCompletions
            .build(&call("https://api.example.com/v1/"))
            .unwrap();
        assert_eq!(wire.url.as_str(), "https://api.example.com/v1/chat/completions");
        assert_eq!(wire.auth, Auth::Bearer("k-1".to_string()));
        assert_eq!(
            wire.body,
            json!({
                "model": "m-1",
                "messages": [
                    {"role": "system", "content": "SYS"},
                    {"role": "user", "content": "PROMPT"}
                ],
                "max_tokens": 321,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn gemini_request_shape_puts_key_in_url() {
        let wire = Dialect::Gemini
            .build(&call("https://g.example.com/v1beta"))
            .unwrap();
        assert_eq!(
            wire.url.as_str(),
            "https://g.example.com/v1beta/models/m-1:generateContent?key=k-1"
        );
        assert_eq!(wire.auth, Auth::Query);
        assert_eq!(
            wire.body,
            json!({
                "contents": [{"parts": [{"text": "SYS\n\nPROMPT"}]}],
                "generationConfig": {"temperature": 0.5, "maxOutputTokens": 321}
            })
        );
    }

    #[test]
    fn yandex_request_shape_stringifies_max_tokens() {
        let wire = Dialect::Yandex
            .build(&call("https://y.example.com/foundationModels/v1/completion"))
            .unwrap();
        assert_eq!(
            wire.url.as_str(),
            "https://y.example.com/foundationModels/v1/completion"
        );
        assert_eq!(wire.auth, Auth::ApiKeyHeader("k-1".to_string()));
        assert_eq!(
            wire.body,
            json!({
                "modelUri": "gpt://m-1/yandexgpt/latest",
                "completionOptions": {"stream": false, "temperature": 0.5, "maxTokens": "321"},
                "messages": [
                    {"role": "system", "text": "SYS"},
                    {"role": "user", "text": "PROMPT"}
                ]
            })
        );
    }

    #[test]
    fn parses_and_trims_each_response_shape() {
        let chat = r#"{"choices":[{"message":{"content":" Hello world \n"}}]}"#;
        assert_eq!(Dialect::ChatCompletions.parse(chat).unwrap(), "Hello world");

        let gemini = r#"{"candidates":[{"content":{"parts":[{"text":"\n hi there "}]}}]}"#;
        assert_eq!(Dialect::Gemini.parse(gemini).unwrap(), "hi there");

        let yandex = r#"{"result":{"alternatives":[{"message":{"role":"assistant","text":"  privet "}}]}}"#;
        assert_eq!(Dialect::Yandex.parse(yandex).unwrap(), "privet");
    }

    #[test]
    fn empty_choice_lists_are_format_errors() {
        let err = Dialect::ChatCompletions.parse(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, GenerationErrorKind::ResponseFormat(ref m) if m.contains("choices[0]")));

        let err = Dialect::Gemini.parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap_err();
        assert!(matches!(err, GenerationErrorKind::ResponseFormat(_)));

        let err = Dialect::Yandex.parse(r#"{"result":{"alternatives":[]}}"#).unwrap_err();
        assert!(matches!(err, GenerationErrorKind::ResponseFormat(_)));
    }

    #[test]
    fn null_content_is_a_format_error() {
        let err = Dialect::ChatCompletions
            .parse(r#"{"choices":[{"message":{"content":null}}]}"#)
            .unwrap_err();
        assert!(matches!(err, GenerationErrorKind::ResponseFormat(_)));
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let err = Dialect::Yandex.parse("not json").unwrap_err();
        assert!(matches!(err, GenerationErrorKind::ResponseFormat(_)));
    }
}
