/// WhatsApp chat JID (group or direct), e.g. `1203630...@g.us`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub String);

/// Sender JID within a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub String);

/// Protocol-assigned message id (string).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// Everything needed to request deletion of someone else's message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub participant: ParticipantId,
}
