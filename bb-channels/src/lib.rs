//! Channel adapters for BizBot.
//!
//! Adapters are pure I/O: they convert platform updates to `InboundMessage`
//! and render `OutboundMessage` (text plus optional keyboard) back out.

mod telegram;
mod traits;
mod types;

pub use telegram::TelegramAdapter;
pub use traits::ChannelAdapter;
pub use types::{
    Button, ChannelId, InboundMessage, InboundMessageKind, Keyboard, MessageId, OutboundMessage,
    ParseMode, SenderId, ThreadId,
};
