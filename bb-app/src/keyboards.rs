use bb_channels::{Button, Keyboard};

pub const MENU_POST: &str = "📱 Пост для соцсетей";
pub const MENU_OFFER: &str = "📝 Коммерческое предложение";
pub const MENU_PRODUCT: &str = "🛍️ Описание товара/услуги";
pub const MENU_CONSULT: &str = "💼 Консультация";
pub const MENU_HELP: &str = "❓ Помощь";

pub const CALLBACK_BACK: &str = "back";

/// Persistent reply keyboard with the five entry points.
pub fn main_keyboard() -> Keyboard {
    Keyboard::Reply {
        rows: vec![
            vec![Button::reply(MENU_POST), Button::reply(MENU_OFFER)],
            vec![Button::reply(MENU_PRODUCT), Button::reply(MENU_CONSULT)],
            vec![Button::reply(MENU_HELP)],
        ],
        resize: true,
        placeholder: Some("Выберите действие...".to_string()),
    }
}

pub fn platform_keyboard() -> Keyboard {
    Keyboard::Inline {
        rows: vec![
            vec![
                Button::inline("📷 Instagram", "platform_instagram"),
                Button::inline("🔵 ВКонтакте", "platform_vk"),
            ],
            vec![
                Button::inline("✈️ Telegram", "platform_telegram"),
                Button::inline("📘 Facebook", "platform_facebook"),
            ],
            vec![Button::inline("👥 Одноклассники", "platform_ok")],
            vec![Button::inline("🔙 Назад", CALLBACK_BACK)],
        ],
    }
}

pub fn consultation_keyboard() -> Keyboard {
    Keyboard::Inline {
        rows: vec![
            vec![
                Button::inline("⚖️ Юридические", "consult_legal"),
                Button::inline("📊 Маркетинг", "consult_marketing"),
            ],
            vec![
                Button::inline("💰 Финансы", "consult_finance"),
                Button::inline("❓ Другие", "consult_other"),
            ],
            vec![Button::inline("🔙 Назад", CALLBACK_BACK)],
        ],
    }
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![Button::inline("🔙 Назад в меню", CALLBACK_BACK)]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{ConsultTopic, Platform};

    fn inline_data(keyboard: &Keyboard) -> Vec<String> {
        match keyboard {
            Keyboard::Inline { rows } => rows
                .iter()
                .flatten()
                .filter_map(|b| b.data.clone())
                .collect(),
            other => panic!("expected inline keyboard, got {other:?}"),
        }
    }

    #[test]
    fn main_keyboard_lists_menu_entries_in_order() {
        let Keyboard::Reply {
            rows,
            resize,
            placeholder,
        } = main_keyboard()
        else {
            panic!("main keyboard must be a reply keyboard");
        };
        let texts: Vec<Vec<&str>> = rows
            .iter()
            .map(|row| row.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(
            texts,
            vec![
                vec![MENU_POST, MENU_OFFER],
                vec![MENU_PRODUCT, MENU_CONSULT],
                vec![MENU_HELP],
            ]
        );
        assert!(rows.iter().flatten().all(|b| b.data.is_none()));
        assert!(resize);
        assert_eq!(placeholder.as_deref(), Some("Выберите действие..."));
    }

    #[test]
    fn platform_buttons_round_trip_through_the_callback_parser() {
        let data = inline_data(&platform_keyboard());
        assert_eq!(data.last().map(String::as_str), Some(CALLBACK_BACK));
        let platforms: Vec<Platform> = data
            .iter()
            .filter_map(|d| Platform::from_callback(d))
            .collect();
        assert_eq!(platforms, Platform::ALL.to_vec());
    }

    #[test]
    fn consultation_buttons_cover_every_topic() {
        let data = inline_data(&consultation_keyboard());
        assert_eq!(data.last().map(String::as_str), Some(CALLBACK_BACK));
        let topics: Vec<ConsultTopic> = data
            .iter()
            .filter_map(|d| ConsultTopic::from_callback(d))
            .collect();
        assert_eq!(topics, ConsultTopic::ALL.to_vec());
    }

    #[test]
    fn back_keyboard_has_single_back_button() {
        assert_eq!(inline_data(&back_keyboard()), vec![CALLBACK_BACK.to_string()]);
    }
}
