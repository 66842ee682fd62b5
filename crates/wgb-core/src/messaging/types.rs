use crate::domain::{ChatId, MessageId, ParticipantId};

/// Incoming chat message, reduced to the fields the bot acts on.
///
/// Protocol-specific payloads (media, receipts, presence, ...) stay in the
/// bridge adapter; non-text messages arrive here with `text: None` and are
/// ignored by the router.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub sender: ParticipantId,
    pub message_id: MessageId,
    pub text: Option<String>,
}
