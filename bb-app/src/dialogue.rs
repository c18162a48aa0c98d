//! Per-chat conversation flow: menu entry points, inline choices, and the
//! brief-then-generate step.

use crate::keyboards::{
    self, CALLBACK_BACK, MENU_CONSULT, MENU_HELP, MENU_OFFER, MENU_POST, MENU_PRODUCT,
};
use crate::prompts::{self, ConsultTopic, Platform};
use anyhow::Result;
use bb_channels::{
    ChannelAdapter, InboundMessage, InboundMessageKind, OutboundMessage, ThreadId,
};
use bb_llm::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, TextGenerator};
use dashmap::DashMap;
use std::sync::Arc;

const WELCOME: &str = "👋 <b>Добро пожаловать в БизнесБот!</b>\n\n\
Я помогу владельцу малого бизнеса:\n\
• написать пост для соцсетей\n\
• составить коммерческое предложение\n\
• подготовить описание товара или услуги\n\
• получить консультацию по вопросам бизнеса\n\n\
Выберите действие в меню ниже 👇";

const HELP: &str = "❓ <b>Помощь</b>\n\n\
/post - пост для соцсетей\n\
/offer - коммерческое предложение\n\
/product - описание товара/услуги\n\
/consult - консультация по вопросам бизнеса\n\
/help - эта справка\n\n\
Выберите действие, опишите задачу одним сообщением и получите готовый текст. \
Кнопка «🔙 Назад в меню» отменяет текущее действие.";

const POST_INTRO: &str = "🎯 <b>Создание поста для социальных сетей</b>\n\nВыберите платформу:";

const OFFER_INTRO: &str = "📝 <b>Создание коммерческого предложения</b>\n\n\
Опишите детали вашего предложения:\n\
• Название компании/продукта\n\
• Что вы предлагаете\n\
• Преимущества для клиента\n\
• Целевая аудитория\n\
• Контактная информация (опционально)\n\n\
💡 <b>Пример:</b> IT-компания предлагает разработку сайтов для малого бизнеса, \
быстрые сроки, доступные цены, поддержка после запуска";

const PRODUCT_INTRO: &str = "🛍️ <b>Создание описания товара или услуги</b>\n\n\
Опишите ваш товар или услугу:\n\
• Название\n\
• Основные характеристики\n\
• Преимущества\n\
• Целевая аудитория\n\
• Уникальные особенности\n\n\
💡 <b>Пример:</b> Курс по маркетингу для начинающих предпринимателей, \
10 уроков, практические кейсы, поддержка в чате";

const CONSULT_INTRO: &str =
    "💼 <b>Консультация по вопросам бизнеса</b>\n\nВыберите тип консультации:";

const MAIN_MENU: &str = "👋 <b>Главное меню</b>\n\nВыберите, что вам нужно:";
const CHOOSE_ACTION: &str = "Выберите действие:";
const IDLE_HINT: &str = "Выберите действие в меню ниже или отправьте /help.";
const USE_BUTTONS: &str = "Выберите вариант с помощью кнопок выше или нажмите «🔙 Назад».";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingPlatform,
    AwaitingPostBrief { platform: Platform },
    AwaitingOfferBrief,
    AwaitingProductBrief,
    AwaitingConsultTopic,
    AwaitingQuestion { topic: ConsultTopic },
}

/// Menu entry reached by a slash command or a main-keyboard button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Start,
    Help,
    Post,
    Offer,
    Product,
    Consult,
}

impl Entry {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(command) = text.strip_prefix('/') {
            // "/post@BizBot extra" addresses the same command.
            let command = command.split_whitespace().next().unwrap_or_default();
            let command = command.split('@').next().unwrap_or_default();
            return match command {
                "start" => Some(Entry::Start),
                "help" => Some(Entry::Help),
                "post" => Some(Entry::Post),
                "offer" => Some(Entry::Offer),
                "product" => Some(Entry::Product),
                "consult" => Some(Entry::Consult),
                _ => None,
            };
        }
        match text {
            MENU_HELP => Some(Entry::Help),
            MENU_POST => Some(Entry::Post),
            MENU_OFFER => Some(Entry::Offer),
            MENU_PRODUCT => Some(Entry::Product),
            MENU_CONSULT => Some(Entry::Consult),
            _ => None,
        }
    }
}

/// A brief that is ready to be turned into generated text.
#[derive(Debug, Clone, Copy)]
enum Job {
    Post(Platform),
    Offer,
    Product,
    Consult(ConsultTopic),
}

impl Job {
    fn prompt(self, brief: &str) -> String {
        match self {
            Job::Post(platform) => prompts::post_prompt(platform, brief),
            Job::Offer => prompts::offer_prompt(brief),
            Job::Product => prompts::product_prompt(brief),
            Job::Consult(topic) => prompts::consult_prompt(topic, brief),
        }
    }

    fn working_notice(self) -> &'static str {
        match self {
            Job::Post(_) => "⏳ Генерирую пост... Это займет несколько секунд.",
            Job::Offer => "⏳ Составляю коммерческое предложение...",
            Job::Product => "⏳ Создаю описание...",
            Job::Consult(_) => "⏳ Анализирую ваш вопрос и готовлю ответ...",
        }
    }

    fn success(self, text: &str) -> String {
        let text = escape_html(text);
        match self {
            Job::Post(platform) => format!(
                "✅ <b>Готовый пост для {}:</b>\n\n{text}\n\n📋 Скопируйте текст выше",
                platform.display_name()
            ),
            Job::Offer => format!(
                "✅ <b>Готовое коммерческое предложение:</b>\n\n{text}\n\n📋 Скопируйте текст выше"
            ),
            Job::Product => {
                format!("✅ <b>Готовое описание:</b>\n\n{text}\n\n📋 Скопируйте текст выше")
            }
            Job::Consult(_) => format!(
                "💡 <b>Ответ на ваш вопрос:</b>\n\n{text}\n\n\
                 ⚠️ <i>Важно: Это общие рекомендации. \
                 Для сложных вопросов рекомендуется консультация со специалистом.</i>"
            ),
        }
    }

    fn failure(self, error: &str) -> String {
        let error = escape_html(error);
        match self {
            Job::Post(_) => format!(
                "❌ Произошла ошибка при генерации: {error}\n\
                 Попробуйте еще раз или обратитесь в поддержку."
            ),
            Job::Offer | Job::Product => format!("❌ Произошла ошибка: {error}"),
            Job::Consult(_) => format!(
                "❌ Произошла ошибка: {error}\n\
                 Попробуйте переформулировать вопрос или обратитесь в поддержку."
            ),
        }
    }
}

pub struct Dialogue {
    generator: Arc<dyn TextGenerator>,
    states: DashMap<ThreadId, DialogueState>,
}

impl Dialogue {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            states: DashMap::new(),
        }
    }

    /// Current state of a chat; `None` means idle.
    pub fn state(&self, thread: &ThreadId) -> Option<DialogueState> {
        self.states.get(thread).map(|s| *s)
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(chat_id = %inbound.thread_id, kind = ?inbound.kind)
    )]
    pub async fn handle(&self, channel: &dyn ChannelAdapter, inbound: &InboundMessage) -> Result<()> {
        match inbound.kind {
            InboundMessageKind::Message => self.on_message(channel, inbound).await,
            InboundMessageKind::Callback => self.on_callback(channel, inbound).await,
        }
    }

    async fn on_message(&self, channel: &dyn ChannelAdapter, inbound: &InboundMessage) -> Result<()> {
        let chat = &inbound.thread_id;

        // Menu entries always win over a pending brief.
        if let Some(entry) = Entry::parse(&inbound.content) {
            tracing::debug!(?entry, "menu entry");
            return self.enter(channel, chat, entry).await;
        }

        let job = match self.state(chat) {
            None => {
                let reply = OutboundMessage::html(IDLE_HINT).with_keyboard(keyboards::main_keyboard());
                return channel.send(chat, reply).await;
            }
            Some(DialogueState::AwaitingPlatform | DialogueState::AwaitingConsultTopic) => {
                return channel.send(chat, OutboundMessage::html(USE_BUTTONS)).await;
            }
            Some(DialogueState::AwaitingPostBrief { platform }) => Job::Post(platform),
            Some(DialogueState::AwaitingOfferBrief) => Job::Offer,
            Some(DialogueState::AwaitingProductBrief) => Job::Product,
            Some(DialogueState::AwaitingQuestion { topic }) => Job::Consult(topic),
        };

        self.generate(channel, chat, job, &inbound.content).await
    }

    async fn enter(&self, channel: &dyn ChannelAdapter, chat: &ThreadId, entry: Entry) -> Result<()> {
        let (state, text, keyboard) = match entry {
            Entry::Start => (None, WELCOME, keyboards::main_keyboard()),
            Entry::Help => (None, HELP, keyboards::main_keyboard()),
            Entry::Post => (
                Some(DialogueState::AwaitingPlatform),
                POST_INTRO,
                keyboards::platform_keyboard(),
            ),
            Entry::Offer => (
                Some(DialogueState::AwaitingOfferBrief),
                OFFER_INTRO,
                keyboards::back_keyboard(),
            ),
            Entry::Product => (
                Some(DialogueState::AwaitingProductBrief),
                PRODUCT_INTRO,
                keyboards::back_keyboard(),
            ),
            Entry::Consult => (
                Some(DialogueState::AwaitingConsultTopic),
                CONSULT_INTRO,
                keyboards::consultation_keyboard(),
            ),
        };
        self.set_state(chat, state);
        channel
            .send(chat, OutboundMessage::html(text).with_keyboard(keyboard))
            .await
    }

    async fn generate(
        &self,
        channel: &dyn ChannelAdapter,
        chat: &ThreadId,
        job: Job,
        brief: &str,
    ) -> Result<()> {
        // Cleared up front so a second message during generation is not
        // taken as another brief.
        self.states.remove(chat);
        channel
            .send(chat, OutboundMessage::html(job.working_notice()))
            .await?;

        let prompt = job.prompt(brief);
        let reply = match self
            .generator
            .generate_text(&prompt, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
            .await
        {
            Ok(text) => {
                tracing::info!(?job, chars = text.chars().count(), "content generated");
                job.success(&text)
            }
            Err(e) => {
                tracing::warn!(?job, error = %e, "content generation failed");
                job.failure(&e.to_string())
            }
        };
        channel
            .send(
                chat,
                OutboundMessage::html(reply).with_keyboard(keyboards::main_keyboard()),
            )
            .await
    }

    async fn on_callback(&self, channel: &dyn ChannelAdapter, inbound: &InboundMessage) -> Result<()> {
        if let Some(callback_id) = inbound.callback_id.as_deref() {
            if let Err(e) = channel.ack_callback(callback_id).await {
                tracing::warn!(error = %e, "callback ack failed");
            }
        }

        let chat = &inbound.thread_id;
        let data = inbound.content.trim();

        if data == CALLBACK_BACK {
            self.states.remove(chat);
            return self.back_to_menu(channel, inbound).await;
        }

        let (state, text) = if let Some(platform) = Platform::from_callback(data) {
            (
                DialogueState::AwaitingPostBrief { platform },
                post_brief_screen(platform),
            )
        } else if let Some(topic) = ConsultTopic::from_callback(data) {
            (
                DialogueState::AwaitingQuestion { topic },
                question_screen(topic),
            )
        } else {
            tracing::debug!(data, "ignoring unknown callback");
            return Ok(());
        };

        self.set_state(chat, Some(state));
        let screen = OutboundMessage::html(text).with_keyboard(keyboards::back_keyboard());
        if let Err(e) = channel
            .edit(chat, &inbound.message_id, screen.clone())
            .await
        {
            tracing::debug!(error = %e, "edit failed; sending a new message");
            channel.send(chat, screen).await?;
        }
        Ok(())
    }

    async fn back_to_menu(&self, channel: &dyn ChannelAdapter, inbound: &InboundMessage) -> Result<()> {
        let chat = &inbound.thread_id;
        match channel
            .edit(chat, &inbound.message_id, OutboundMessage::html(MAIN_MENU))
            .await
        {
            Ok(()) => {
                channel
                    .send(
                        chat,
                        OutboundMessage::html(CHOOSE_ACTION)
                            .with_keyboard(keyboards::main_keyboard()),
                    )
                    .await
            }
            Err(e) => {
                tracing::debug!(error = %e, "edit failed; sending main menu");
                channel
                    .send(
                        chat,
                        OutboundMessage::html(MAIN_MENU).with_keyboard(keyboards::main_keyboard()),
                    )
                    .await
            }
        }
    }

    fn set_state(&self, chat: &ThreadId, state: Option<DialogueState>) {
        match state {
            Some(state) => {
                self.states.insert(chat.clone(), state);
            }
            None => {
                self.states.remove(chat);
            }
        }
    }
}

fn post_brief_screen(platform: Platform) -> String {
    format!(
        "📱 <b>Создание поста для {}</b>\n\n\
         Опишите, о чем должен быть пост:\n\
         • Тема/повод\n\
         • Ключевые моменты\n\
         • Целевая аудитория\n\
         • Желаемый тон (формальный/неформальный)\n\n\
         💡 <b>Пример:</b> Анонс новой коллекции одежды для молодежи, \
         неформальный тон, акцент на стиль и доступность",
        platform.display_name()
    )
}

fn question_screen(topic: ConsultTopic) -> String {
    format!(
        "💼 <b>{}</b>\n\n\
         Опишите ваш вопрос подробно:\n\
         {}\n\n\
         Чем больше деталей вы укажете, тем точнее будет ответ.",
        topic.display_name(),
        topic.example()
    )
}

/// Escapes text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
