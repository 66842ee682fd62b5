//! Antilink enforcement: delete messages carrying external links.

use std::sync::Arc;

use regex::Regex;

use crate::{
    domain::MessageRef,
    messaging::{port::MessagingPort, types::IncomingMessage},
    store::ModerationStore,
};

/// Group-invite links are exempt from the antilink policy.
const INVITE_HOST: &str = "chat.whatsapp.com";

pub struct LinkGuard {
    store: Arc<ModerationStore>,
    messenger: Arc<dyn MessagingPort>,
    link_re: Regex,
}

impl LinkGuard {
    pub fn new(store: Arc<ModerationStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        // `\S+` after the scheme; the invite-host exemption is checked
        // separately since the regex crate has no lookahead.
        let link_re = Regex::new(r"https?://\S+").expect("valid regex");
        Self {
            store,
            messenger,
            link_re,
        }
    }

    /// Inspect a non-command message and request deletion if it violates the
    /// policy. Deletion failures are logged and accepted; never retried.
    pub async fn check(&self, msg: &IncomingMessage) {
        if !self.store.antilink_enabled().await {
            return;
        }
        let Some(text) = msg.text.as_deref() else {
            return;
        };
        if !self.is_violation(text) {
            return;
        }

        let target = MessageRef {
            chat_id: msg.chat_id.clone(),
            message_id: msg.message_id.clone(),
            participant: msg.sender.clone(),
        };
        match self.messenger.delete_message(&target).await {
            Ok(()) => println!("[GUARD] Deleted link message in {}", msg.chat_id.0),
            Err(e) => eprintln!("[GUARD] Failed to delete message in {}: {e}", msg.chat_id.0),
        }
    }

    fn is_violation(&self, text: &str) -> bool {
        self.link_re
            .find_iter(text)
            .any(|m| !is_invite_link(m.as_str()))
    }
}

/// True when the URL's host is exactly the group-invite host. Host equality
/// (not prefix) so `chat.whatsapp.com.evil` does not slip through.
fn is_invite_link(url: &str) -> bool {
    let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    else {
        return false;
    };
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    rest[..host_end].eq_ignore_ascii_case(INVITE_HOST)
}
