//! Inbound message routing: commands vs. content.

use std::sync::Arc;

use crate::{
    domain::ChatId,
    guard::LinkGuard,
    messaging::{port::MessagingPort, types::IncomingMessage},
    store::ModerationStore,
};

const ANTILINK_PREFIX: &str = "!antilink";
const LINKSHARING_PREFIX: &str = "!linksharing";

/// Classifies inbound text into recognized commands or plain content and
/// dispatches to the matching handler.
pub struct Router {
    store: Arc<ModerationStore>,
    messenger: Arc<dyn MessagingPort>,
    guard: LinkGuard,
}

impl Router {
    pub fn new(store: Arc<ModerationStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        let guard = LinkGuard::new(store.clone(), messenger.clone());
        Self {
            store,
            messenger,
            guard,
        }
    }

    pub async fn handle_incoming(&self, msg: IncomingMessage) {
        let Some(text) = msg.text.as_deref() else {
            return;
        };

        if text.starts_with('!') {
            println!("[ROUTER] Command received: {text}");
        }

        if text.starts_with(ANTILINK_PREFIX) {
            self.handle_antilink(&msg.chat_id, text).await;
        } else if text.starts_with(LINKSHARING_PREFIX) {
            self.handle_link_sharing(&msg.chat_id, text).await;
        } else if !text.starts_with(self.store.catalog().own_link()) {
            // Self-exclusion: the bot's own broadcast must never be flagged.
            self.guard.check(&msg).await;
        }
    }

    async fn handle_antilink(&self, chat_id: &ChatId, text: &str) {
        match text {
            "!antilink on" => {
                self.store.set_antilink(true).await;
                self.reply(chat_id, "correcto").await;
                self.notify_known_groups("¡Antilink activado!").await;
            }
            "!antilink 0" => {
                self.store.set_antilink(false).await;
                self.reply(chat_id, "desactivada").await;
                self.notify_known_groups("¡Antilink desactivado!").await;
            }
            // Unrecognized argument: defined no-op, no reply.
            _ => {}
        }
    }

    async fn handle_link_sharing(&self, chat_id: &ChatId, text: &str) {
        match text {
            "!linksharing on" => {
                self.store.set_link_sharing(true, chat_id).await;
                self.reply(chat_id, "correcto").await;
                println!("[ROUTER] Link sharing enabled in {}", chat_id.0);
            }
            "!linksharing 0" => {
                self.store.set_link_sharing(false, chat_id).await;
                self.reply(chat_id, "desactivada.").await;
                println!("[ROUTER] Link sharing disabled in {}", chat_id.0);
            }
            _ => {}
        }
    }

    async fn reply(&self, chat_id: &ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            eprintln!("[ROUTER] Failed to reply in {}: {e}", chat_id.0);
        }
    }

    /// Best-effort fan-out; one failing group never blocks the rest.
    async fn notify_known_groups(&self, text: &str) {
        for group in self.store.known_groups().await {
            if let Err(e) = self.messenger.send_text(&group, text).await {
                eprintln!("[ROUTER] Notify failed for {}: {e}", group.0);
            }
        }
    }
}
