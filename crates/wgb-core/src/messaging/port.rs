use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound port to the chat-protocol client.
///
/// The WhatsApp sidecar bridge is the first implementation; the surface is
/// small enough that future adapters (another protocol, a test recorder) fit
/// behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: &ChatId, text: &str) -> Result<()>;

    /// Request deletion of a group member's message (moderation).
    async fn delete_message(&self, msg: &MessageRef) -> Result<()>;
}
