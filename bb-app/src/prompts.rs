//! Prompt templates sent to the model for each kind of content.

/// Social network a post is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Instagram,
    Vk,
    Telegram,
    Facebook,
    Ok,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Vk,
        Platform::Telegram,
        Platform::Facebook,
        Platform::Ok,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Vk => "vk",
            Platform::Telegram => "telegram",
            Platform::Facebook => "facebook",
            Platform::Ok => "ok",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Vk => "ВКонтакте",
            Platform::Telegram => "Telegram",
            Platform::Facebook => "Facebook",
            Platform::Ok => "Одноклассники",
        }
    }

    /// Parses `platform_{id}` callback data.
    pub fn from_callback(data: &str) -> Option<Self> {
        let id = data.strip_prefix("platform_")?;
        Self::ALL.into_iter().find(|p| p.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsultTopic {
    Legal,
    Marketing,
    Finance,
    Other,
}

impl ConsultTopic {
    pub const ALL: [ConsultTopic; 4] = [
        ConsultTopic::Legal,
        ConsultTopic::Marketing,
        ConsultTopic::Finance,
        ConsultTopic::Other,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ConsultTopic::Legal => "legal",
            ConsultTopic::Marketing => "marketing",
            ConsultTopic::Finance => "finance",
            ConsultTopic::Other => "other",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ConsultTopic::Legal => "Юридические вопросы",
            ConsultTopic::Marketing => "Маркетинг",
            ConsultTopic::Finance => "Финансы",
            ConsultTopic::Other => "Другие вопросы",
        }
    }

    /// Sample question shown while waiting for the user's own.
    pub fn example(self) -> &'static str {
        match self {
            ConsultTopic::Legal => "Например: какие документы нужны для регистрации ИП?",
            ConsultTopic::Marketing => "Например: как продвигать бизнес в Instagram?",
            ConsultTopic::Finance => "Например: как вести учет доходов и расходов?",
            ConsultTopic::Other => "Например: как выбрать нишу для бизнеса?",
        }
    }

    /// Area of expertise the model is asked to answer from.
    pub fn expertise(self) -> &'static str {
        match self {
            ConsultTopic::Legal => "юридическим вопросам для малого бизнеса в России",
            ConsultTopic::Marketing => "маркетингу и продвижению малого бизнеса",
            ConsultTopic::Finance => "финансовым вопросам и учету для малого бизнеса",
            ConsultTopic::Other => "общим вопросам ведения малого бизнеса",
        }
    }

    /// Parses `consult_{id}` callback data.
    pub fn from_callback(data: &str) -> Option<Self> {
        let id = data.strip_prefix("consult_")?;
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

pub fn post_prompt(platform: Platform, brief: &str) -> String {
    let name = platform.display_name();
    format!(
        "Создай пост для {name} на основе следующего описания:\n\n\
         {brief}\n\n\
         Требования:\n\
         - Адаптируй стиль под {name}\n\
         - Используй эмодзи уместно\n\
         - Сделай текст привлекательным и вовлекающим\n\
         - Добавь призыв к действию\n\
         - Длина: 1-2 абзаца для {name}"
    )
}

pub fn offer_prompt(brief: &str) -> String {
    format!(
        "Создай профессиональное коммерческое предложение на основе следующего описания:\n\n\
         {brief}\n\n\
         Структура КП:\n\
         1. Приветствие и представление\n\
         2. Описание проблемы клиента\n\
         3. Предложение решения\n\
         4. Преимущества и выгоды\n\
         5. Призыв к действию\n\
         6. Контакты\n\n\
         Стиль: профессиональный, убедительный, но не навязчивый"
    )
}

pub fn product_prompt(brief: &str) -> String {
    format!(
        "Создай привлекательное описание товара/услуги на основе следующего:\n\n\
         {brief}\n\n\
         Требования:\n\
         - Заголовок, привлекающий внимание\n\
         - Структурированное описание с преимуществами\n\
         - Использование маркированных списков\n\
         - Призыв к действию\n\
         - SEO-оптимизация (если применимо)\n\
         - Длина: 150-300 слов"
    )
}

pub fn consult_prompt(topic: ConsultTopic, question: &str) -> String {
    let expertise = topic.expertise();
    format!(
        "Ты - эксперт по {expertise}. \
         Ответь на вопрос владельца малого бизнеса:\n\n\
         {question}\n\n\
         Требования к ответу:\n\
         - Будь конкретным и практичным\n\
         - Приведи примеры, если возможно\n\
         - Структурируй ответ (используй списки, если уместно)\n\
         - Укажи на важные нюансы и подводные камни\n\
         - Если вопрос требует юридической консультации, укажи, что лучше обратиться к юристу\n\
         - Длина: 200-400 слов"
    )
}
