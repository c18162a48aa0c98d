use crate::traits::ChannelAdapter;
use crate::types::{
    Button, InboundMessage, InboundMessageKind, Keyboard, MessageId, OutboundMessage, ParseMode,
};
use anyhow::Result;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;

const TELEGRAM_CHANNEL_ID: &str = "telegram";
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const TELEGRAM_LONG_POLL_TIMEOUT_SECS: &str = "30";
const TELEGRAM_ALLOWED_UPDATES: &str = r#"["message","callback_query"]"#;
const TELEGRAM_NON_TRANSIENT_DELAY: Duration = Duration::from_secs(10);
const TELEGRAM_RETRY_BASE_MS: u64 = 250;
const TELEGRAM_RETRY_MAX_MS: u64 = 30_000;
/// Bot API caps a message at 4096 UTF-16 units; counted in chars with headroom.
const TELEGRAM_MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Clone)]
pub struct TelegramAdapter {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramAdapter {
    pub fn new(bot_token: &str) -> Result<Self> {
        // Long polling holds the request open for up to 30s.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    /// Point the adapter at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/bot{}/{}",
            self.api_base, self.bot_token, method
        ))?)
    }

    async fn call(&self, method: &str, body: &Value) -> Result<()> {
        let url = self.api_url(method)?;
        let resp = self.http.post(url).json(body).send().await.map_err(|e| {
            // The token is part of the URL.
            anyhow::anyhow!("telegram {method} request failed: {}", e.without_url())
        })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|error| {
                format!(
                    "<failed to read telegram error body: {}>",
                    error.without_url()
                )
            });
            return Err(anyhow::anyhow!(
                "telegram {method} failed: status={status} body={text}"
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn channel_id(&self) -> &str {
        TELEGRAM_CHANNEL_ID
    }

    async fn start(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            if let Err(e) = adapter.run_poll_loop(tx).await {
                tracing::error!(%e, "telegram poll loop exited");
            }
        });
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(chat_id = %recipient_id))]
    async fn send(&self, recipient_id: &str, message: OutboundMessage) -> Result<()> {
        let html = message.parse_mode == Some(ParseMode::Html);
        let pieces = chunk_message(&message.content, TELEGRAM_MAX_MESSAGE_CHARS, html);
        let chunks: Vec<String> = if html {
            balance_html_chunks(&pieces)
        } else {
            pieces.into_iter().map(str::to_owned).collect()
        };
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            // The keyboard rides on the final chunk only.
            let part = OutboundMessage {
                content: chunk,
                parse_mode: message.parse_mode,
                keyboard: if i == last { message.keyboard.clone() } else { None },
            };
            let body = send_message_body(recipient_id, &part);
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(chat_id = %recipient_id))]
    async fn edit(
        &self,
        recipient_id: &str,
        message_id: &MessageId,
        message: OutboundMessage,
    ) -> Result<()> {
        let body = edit_message_body(recipient_id, message_id, &message)?;
        self.call("editMessageText", &body).await
    }

    async fn ack_callback(&self, callback_id: &str) -> Result<()> {
        self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_id }),
        )
        .await
    }
}

impl TelegramAdapter {
    #[tracing::instrument(level = "info", skip_all)]
    async fn run_poll_loop(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        let mut offset: i64 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            let url = self.api_url("getUpdates")?;
            let response = match self
                .http
                .get(url)
                .query(&[
                    ("timeout", TELEGRAM_LONG_POLL_TIMEOUT_SECS),
                    ("offset", &offset.to_string()),
                    ("allowed_updates", TELEGRAM_ALLOWED_UPDATES),
                ])
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    consecutive_failures += 1;
                    let delay = transient_retry_delay(consecutive_failures);
                    tracing::warn!(
                        error = %error.without_url(),
                        attempt = consecutive_failures,
                        ?delay,
                        "telegram getUpdates request failed; retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_else(|error| {
                    format!(
                        "<failed to read telegram error body: {}>",
                        error.without_url()
                    )
                });
                if is_transient_status(status) {
                    consecutive_failures += 1;
                    let delay = transient_retry_delay(consecutive_failures);
                    tracing::warn!(
                        %status,
                        %body,
                        attempt = consecutive_failures,
                        ?delay,
                        "telegram getUpdates transient failure; retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    consecutive_failures = 0;
                    tracing::error!(
                        %status,
                        %body,
                        ?TELEGRAM_NON_TRANSIENT_DELAY,
                        "telegram getUpdates non-transient failure; keeping poll loop alive"
                    );
                    tokio::time::sleep(TELEGRAM_NON_TRANSIENT_DELAY).await;
                }
                continue;
            }

            let parsed = match response.json::<TelegramGetUpdatesResponse>().await {
                Ok(parsed) => parsed,
                Err(error) => {
                    consecutive_failures += 1;
                    let delay = transient_retry_delay(consecutive_failures);
                    tracing::warn!(
                        error = %error.without_url(),
                        attempt = consecutive_failures,
                        ?delay,
                        "telegram getUpdates payload parse failed; retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            consecutive_failures = 0;

            let mut updates = parsed.result;
            updates.sort_by_key(|update| update.update_id);
            for update in updates {
                // Advance offset before conversion to avoid poison-update replay loops.
                if update.update_id < offset {
                    continue;
                }
                offset = update.update_id.saturating_add(1);

                if let Some(inbound) = build_inbound(&update) {
                    tx.send(inbound)
                        .await
                        .map_err(|e| anyhow::anyhow!("telegram inbound queue closed: {e}"))?;
                }
            }
        }
    }
}

fn transient_retry_delay(attempt: u32) -> Duration {
    let multiplier = 1_u64 << attempt.saturating_sub(1).min(10);
    Duration::from_millis((TELEGRAM_RETRY_BASE_MS * multiplier).min(TELEGRAM_RETRY_MAX_MS))
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Splits `content` into pieces of at most `max_chars` characters, preferring
/// line breaks, then spaces. Never cuts inside a UTF-8 sequence, and with
/// `html` set never inside a tag or an entity.
fn chunk_message(content: &str, max_chars: usize, html: bool) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = content;

    while remaining.chars().count() > max_chars {
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(remaining.len());
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .filter(|pos| *pos > 1)
            .unwrap_or(limit);
        let split_at = if html {
            html_safe_split(remaining, split_at)
        } else {
            split_at
        };

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        remaining = rest.trim_start_matches('\n');
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining);
    }
    chunks
}

/// Moves `at` back to the start of a tag or entity it would otherwise cut.
fn html_safe_split(text: &str, at: usize) -> usize {
    let mut safe = at;
    let head = &text[..safe];
    if let Some(open) = head.rfind('<') {
        if !head[open..].contains('>') {
            safe = open;
        }
    }
    let head = &text[..safe];
    if let Some(amp) = head.rfind('&') {
        if !head[amp..].contains(';') {
            safe = amp;
        }
    }
    if safe == 0 { at } else { safe }
}

/// Closes tags left open at the end of each chunk and reopens them at the
/// start of the next one, so every part parses on its own.
fn balance_html_chunks(chunks: &[&str]) -> Vec<String> {
    let mut open: Vec<(String, String)> = Vec::new();
    let mut balanced = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let mut part: String = open.iter().map(|(tag, _)| tag.as_str()).collect();
        part.push_str(chunk);
        track_open_tags(chunk, &mut open);
        for (_, name) in open.iter().rev() {
            part.push_str(&format!("</{name}>"));
        }
        balanced.push(part);
    }
    balanced
}

/// Updates `open` (full opening tag, tag name) with the tags in `text`.
fn track_open_tags(text: &str, open: &mut Vec<(String, String)>) {
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let tag = &rest[start..=start + len];
        let inner = &tag[1..tag.len() - 1];
        if let Some(closing) = inner.strip_prefix('/') {
            let name = closing.trim();
            if let Some(pos) = open.iter().rposition(|(_, n)| n == name) {
                open.truncate(pos);
            }
        } else if !inner.ends_with('/') {
            let name = inner.split_whitespace().next().unwrap_or_default();
            if !name.is_empty() {
                open.push((tag.to_string(), name.to_string()));
            }
        }
        rest = &rest[start + len + 1..];
    }
}

fn build_inbound(update: &TelegramUpdate) -> Option<InboundMessage> {
    if let Some(message) = update.message.as_ref() {
        return build_message_inbound(update.update_id, message);
    }
    if let Some(callback) = update.callback_query.as_ref() {
        return build_callback_inbound(callback);
    }
    None
}

fn build_message_inbound(update_id: i64, message: &TelegramMessage) -> Option<InboundMessage> {
    let chat = message.chat.as_ref()?;
    let content = extract_message_content(message)?;
    let sender_id = message
        .from
        .as_ref()
        .map(|user| user.id.to_string())
        .unwrap_or_else(|| format!("chat:{}", chat.id));
    let message_id = message
        .message_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| format!("update:{update_id}:message"));

    Some(InboundMessage {
        kind: InboundMessageKind::Message,
        message_id: message_id.into(),
        channel_id: TELEGRAM_CHANNEL_ID.into(),
        sender_id: sender_id.into(),
        thread_id: chat.id.to_string().into(),
        content,
        callback_id: None,
        received_at: Utc::now(),
    })
}

fn build_callback_inbound(callback: &TelegramCallbackQuery) -> Option<InboundMessage> {
    let data = callback.data.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
    // Without the originating message there is no chat to answer in.
    let message = callback.message.as_ref()?;
    let chat = message.chat.as_ref()?;
    let message_id = message.message_id?;

    Some(InboundMessage {
        kind: InboundMessageKind::Callback,
        message_id: message_id.to_string().into(),
        channel_id: TELEGRAM_CHANNEL_ID.into(),
        sender_id: callback.from.id.to_string().into(),
        thread_id: chat.id.to_string().into(),
        content: data.to_string(),
        callback_id: Some(callback.id.clone()),
        received_at: Utc::now(),
    })
}

fn extract_message_content(message: &TelegramMessage) -> Option<String> {
    [message.text.as_deref(), message.caption.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn send_message_body(chat_id: &str, message: &OutboundMessage) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": message.content,
    });
    if let Some(mode) = message.parse_mode {
        body["parse_mode"] = parse_mode_value(mode);
    }
    if let Some(keyboard) = message.keyboard.as_ref() {
        body["reply_markup"] = reply_markup(keyboard);
    }
    body
}

fn edit_message_body(
    chat_id: &str,
    message_id: &MessageId,
    message: &OutboundMessage,
) -> Result<Value> {
    let message_id: i64 = message_id
        .parse()
        .map_err(|_| anyhow::anyhow!("telegram message id is not numeric: {message_id}"))?;
    let mut body = json!({
        "chat_id": chat_id,
        "message_id": message_id,
        "text": message.content,
    });
    if let Some(mode) = message.parse_mode {
        body["parse_mode"] = parse_mode_value(mode);
    }
    // Only inline keyboards survive an edit; anything else drops the markup.
    if let Some(keyboard) = message
        .keyboard
        .as_ref()
        .filter(|k| matches!(k, Keyboard::Inline { .. }))
    {
        body["reply_markup"] = reply_markup(keyboard);
    }
    Ok(body)
}

fn parse_mode_value(mode: ParseMode) -> Value {
    match mode {
        ParseMode::Html => Value::from("HTML"),
    }
}

fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Reply {
            rows,
            resize,
            placeholder,
        } => {
            let mut markup = json!({
                "keyboard": rows
                    .iter()
                    .map(|row| row.iter().map(|b| json!({ "text": b.text })).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
                "resize_keyboard": resize,
            });
            if let Some(placeholder) = placeholder {
                markup["input_field_placeholder"] = Value::from(placeholder.as_str());
            }
            markup
        }
        Keyboard::Inline { rows } => json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| row.iter().map(inline_button).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        }),
        Keyboard::Remove => json!({ "remove_keyboard": true }),
    }
}

fn inline_button(button: &Button) -> Value {
    json!({
        "text": button.text,
        "callback_data": button.data.as_deref().unwrap_or(button.text.as_str()),
    })
}

#[derive(Debug, Deserialize)]
struct TelegramGetUpdatesResponse {
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    #[serde(default)]
    message_id: Option<i64>,
    #[serde(default)]
    from: Option<TelegramUser>,
    #[serde(default)]
    chat: Option<TelegramChat>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    from: TelegramUser,
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn update(raw: Value) -> TelegramUpdate {
        serde_json::from_value(raw).expect("valid update")
    }

    #[test]
    fn retry_delay_grows_exponentially_and_caps() {
        assert_eq!(transient_retry_delay(1).as_millis(), 250);
        assert_eq!(transient_retry_delay(2).as_millis(), 500);
        assert_eq!(transient_retry_delay(3).as_millis(), 1000);
        assert_eq!(transient_retry_delay(20).as_millis(), 30000);
    }

    #[test]
    fn short_messages_are_not_chunked() {
        assert_eq!(chunk_message("привет", 10, false), vec!["привет"]);
        assert_eq!(chunk_message("", 10, false), vec![""]);
    }

    #[test]
    fn long_messages_split_on_line_breaks_without_breaking_utf8() {
        let text = "Первая строка\nВторая строка\nТретья";
        let chunks = chunk_message(text, 16, false);
        assert_eq!(chunks, vec!["Первая строка", "Вторая строка", "Третья"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn unbroken_text_is_hard_split_on_char_boundaries() {
        let text = "ж".repeat(25);
        let chunks = chunk_message(&text, 10, false);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn html_split_never_cuts_an_entity() {
        let text = format!("{}&amp;{}", "a".repeat(9), "b".repeat(3));
        assert_eq!(chunk_message(&text, 12, false)[0], "aaaaaaaaa&am");
        assert_eq!(chunk_message(&text, 12, true), vec!["aaaaaaaaa", "&amp;bbb"]);
    }

    #[test]
    fn html_split_never_cuts_a_tag() {
        let text = format!("{}<b>x</b>", "a".repeat(10));
        assert_eq!(chunk_message(&text, 12, true), vec!["aaaaaaaaaa", "<b>x</b>"]);
    }

    #[test]
    fn tags_spanning_chunks_are_closed_and_reopened() {
        let parts = balance_html_chunks(&["<b>Заголовок", "текст</b> и <i>курсив", "конец</i>"]);
        assert_eq!(
            parts,
            vec![
                "<b>Заголовок</b>",
                "<b>текст</b> и <i>курсив</i>",
                "<i>конец</i>",
            ]
        );
    }

    #[test]
    fn balanced_chunks_pass_through_unchanged() {
        let parts = balance_html_chunks(&["<b>a</b> &amp; b", "c"]);
        assert_eq!(parts, vec!["<b>a</b> &amp; b", "c"]);
    }

    #[test]
    fn text_message_becomes_inbound_message() {
        let inbound = build_inbound(&update(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 42},
                "chat": {"id": 777, "type": "private"},
                "text": "  📱 Пост для соцсетей "
            }
        })))
        .unwrap();
        assert_eq!(inbound.kind, InboundMessageKind::Message);
        assert_eq!(inbound.content, "📱 Пост для соцсетей");
        assert_eq!(inbound.sender_id.as_str(), "42");
        assert_eq!(inbound.thread_id.as_str(), "777");
        assert_eq!(inbound.message_id.as_str(), "5");
        assert!(inbound.callback_id.is_none());
    }

    #[test]
    fn caption_is_used_when_text_is_absent_and_media_only_is_skipped() {
        let with_caption = build_inbound(&update(json!({
            "update_id": 11,
            "message": {"message_id": 6, "chat": {"id": 1}, "caption": "new menu"}
        })))
        .unwrap();
        assert_eq!(with_caption.content, "new menu");
        assert_eq!(with_caption.sender_id.as_str(), "chat:1");

        let media_only = build_inbound(&update(json!({
            "update_id": 12,
            "message": {"message_id": 7, "chat": {"id": 1}, "photo": [{"file_id": "p"}]}
        })));
        assert!(media_only.is_none());
    }

    #[test]
    fn callback_query_becomes_callback_inbound() {
        let inbound = build_inbound(&update(json!({
            "update_id": 13,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 42},
                "message": {"message_id": 99, "chat": {"id": 777}},
                "data": "platform_vk"
            }
        })))
        .unwrap();
        assert_eq!(inbound.kind, InboundMessageKind::Callback);
        assert_eq!(inbound.content, "platform_vk");
        assert_eq!(inbound.callback_id.as_deref(), Some("cb-1"));
        assert_eq!(inbound.message_id.as_str(), "99");
        assert_eq!(inbound.thread_id.as_str(), "777");
    }

    #[test]
    fn callback_without_message_is_dropped() {
        let inbound = build_inbound(&update(json!({
            "update_id": 14,
            "callback_query": {"id": "cb-2", "from": {"id": 1}, "data": "back"}
        })));
        assert!(inbound.is_none());
    }

    #[test]
    fn send_body_renders_reply_keyboard() {
        let msg = OutboundMessage::html("<b>hi</b>").with_keyboard(Keyboard::Reply {
            rows: vec![vec![Button::reply("A"), Button::reply("B")]],
            resize: true,
            placeholder: Some("pick".to_string()),
        });
        assert_eq!(
            send_message_body("777", &msg),
            json!({
                "chat_id": "777",
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "reply_markup": {
                    "keyboard": [[{"text": "A"}, {"text": "B"}]],
                    "resize_keyboard": true,
                    "input_field_placeholder": "pick"
                }
            })
        );
    }

    #[test]
    fn edit_body_keeps_only_inline_markup() {
        let inline = OutboundMessage::text("x").with_keyboard(Keyboard::Inline {
            rows: vec![vec![Button::inline("Back", "back")]],
        });
        let body = edit_message_body("1", &MessageId::new("99"), &inline).unwrap();
        assert_eq!(body["message_id"], 99);
        assert_eq!(
            body["reply_markup"],
            json!({"inline_keyboard": [[{"text": "Back", "callback_data": "back"}]]})
        );

        let plain = OutboundMessage::text("x").with_keyboard(Keyboard::Remove);
        let body = edit_message_body("1", &MessageId::new("99"), &plain).unwrap();
        assert!(body.get("reply_markup").is_none());

        assert!(edit_message_body("1", &MessageId::new("update:1:message"), &plain).is_err());
    }

    #[tokio::test]
    async fn send_posts_to_bot_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "777", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new("TOKEN")
            .unwrap()
            .with_api_base(server.uri());
        adapter
            .send("777", OutboundMessage::text("hello"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn long_send_is_split_with_keyboard_on_last_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({"reply_markup": {"remove_keyboard": true}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new("TOKEN")
            .unwrap()
            .with_api_base(server.uri());
        let text = format!("{}\n{}", "а".repeat(3000), "б".repeat(3000));
        adapter
            .send(
                "777",
                OutboundMessage::text(text).with_keyboard(Keyboard::Remove),
            )
            .await
            .unwrap();
    }

    /// Answers one request with a 500 whose body is cut short.
    async fn serve_truncated_error(listener: tokio::net::TcpListener) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + body_len {
                break;
            }
        }
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
        let _ = socket.shutdown().await;
    }

    #[tokio::test]
    async fn unreadable_error_body_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_truncated_error(listener));

        let adapter = TelegramAdapter::new("SECRET")
            .unwrap()
            .with_api_base(format!("http://{addr}"));
        let err = adapter
            .send("1", OutboundMessage::text("x"))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("status=500"), "{err}");
        assert!(err.contains("<failed to read telegram error body:"), "{err}");
        assert!(!err.contains("SECRET"), "{err}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn send_failure_reports_status_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new("SECRET")
            .unwrap()
            .with_api_base(server.uri());
        let err = adapter
            .send("1", OutboundMessage::text("x"))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("400"));
        assert!(err.contains("chat not found"));
        assert!(!err.contains("SECRET"));
    }

    #[tokio::test]
    async fn poll_loop_forwards_updates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 1,
                    "message": {"message_id": 1, "from": {"id": 2}, "chat": {"id": 3}, "text": "/start"}
                }]
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new("TOKEN")
            .unwrap()
            .with_api_base(server.uri());
        let (tx, mut rx) = mpsc::channel(4);
        adapter.start(tx).await.unwrap();

        let inbound = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("update delivered")
            .expect("channel open");
        assert_eq!(inbound.content, "/start");
        assert_eq!(inbound.thread_id.as_str(), "3");
    }
}
