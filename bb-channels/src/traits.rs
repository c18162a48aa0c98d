use crate::types::{InboundMessage, MessageId, OutboundMessage};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Unique channel identifier, e.g. "telegram".
    fn channel_id(&self) -> &str;

    /// Start receiving messages. Push to tx for each inbound message.
    async fn start(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()>;

    /// Send a message to a chat on this platform.
    async fn send(&self, recipient_id: &str, message: OutboundMessage) -> Result<()>;

    /// Replace the text (and inline keyboard) of a message sent earlier.
    async fn edit(
        &self,
        _recipient_id: &str,
        _message_id: &MessageId,
        _message: OutboundMessage,
    ) -> Result<()> {
        Err(anyhow::anyhow!("edit is not supported by this channel"))
    }

    /// Acknowledge a button press so the client stops its spinner.
    async fn ack_callback(&self, _callback_id: &str) -> Result<()> {
        Ok(())
    }
}
