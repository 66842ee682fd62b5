//! Shared moderation state: flags, group sets and the rotation cursor.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::{domain::ChatId, errors::Error, Result};

/// Ordered, immutable list of URLs the broadcast loop rotates through.
///
/// Fixed at startup from config; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct LinkCatalog {
    links: Vec<String>,
}

impl LinkCatalog {
    pub fn new(links: Vec<String>) -> Result<Self> {
        if links.is_empty() {
            return Err(Error::Config(
                "broadcast link catalog must contain at least one URL".to_string(),
            ));
        }
        Ok(Self { links })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, idx: usize) -> &str {
        &self.links[idx % self.links.len()]
    }

    /// First catalog entry. Inbound messages starting with it are the bot's
    /// own broadcasts and must never be treated as link violations.
    pub fn own_link(&self) -> &str {
        &self.links[0]
    }
}

#[derive(Debug)]
struct ModerationState {
    antilink_enabled: bool,
    link_sharing_enabled: bool,
    subscribed: HashSet<ChatId>,
    known: HashSet<ChatId>,
    cursor: usize,
}

impl Default for ModerationState {
    fn default() -> Self {
        Self {
            antilink_enabled: true,
            link_sharing_enabled: false,
            subscribed: HashSet::new(),
            known: HashSet::new(),
            cursor: 0,
        }
    }
}

/// Single owned instance of the bot's mutable state.
///
/// All mutation funnels through one async mutex so the inbound handlers and
/// the broadcast loop never observe half-updated sets. Invariant:
/// `subscribed` is a subset of `known`.
pub struct ModerationStore {
    catalog: LinkCatalog,
    state: Mutex<ModerationState>,
}

impl ModerationStore {
    pub fn new(catalog: LinkCatalog) -> Self {
        Self {
            catalog,
            state: Mutex::new(ModerationState::default()),
        }
    }

    pub fn catalog(&self) -> &LinkCatalog {
        &self.catalog
    }

    /// Set the antilink flag and return the new value. Notification fan-out
    /// to known groups is the caller's responsibility.
    pub async fn set_antilink(&self, enabled: bool) -> bool {
        let mut st = self.state.lock().await;
        st.antilink_enabled = enabled;
        st.antilink_enabled
    }

    pub async fn antilink_enabled(&self) -> bool {
        self.state.lock().await.antilink_enabled
    }

    pub async fn link_sharing_enabled(&self) -> bool {
        self.state.lock().await.link_sharing_enabled
    }

    /// Enable: subscribe `chat` (and remember it as a known group).
    /// Disable: remove `chat` from *both* sets — a group that turns sharing
    /// off also stops receiving antilink notices. Idempotent on membership.
    pub async fn set_link_sharing(&self, enabled: bool, chat: &ChatId) {
        let mut st = self.state.lock().await;
        st.link_sharing_enabled = enabled;
        if enabled {
            st.subscribed.insert(chat.clone());
            st.known.insert(chat.clone());
        } else {
            st.subscribed.remove(chat);
            st.known.remove(chat);
        }
    }

    /// Snapshot of the groups currently subscribed to broadcasts.
    pub async fn subscribed_groups(&self) -> Vec<ChatId> {
        self.state.lock().await.subscribed.iter().cloned().collect()
    }

    /// Snapshot of every group the bot has seen interact with link-sharing.
    pub async fn known_groups(&self) -> Vec<ChatId> {
        self.state.lock().await.known.iter().cloned().collect()
    }

    /// Atomic read-and-increment of the shared rotation cursor.
    ///
    /// Returns the link at the current cursor and the advanced cursor value
    /// (modulo catalog length). The cursor is shared across all groups, not
    /// per-group.
    pub async fn next_link(&self) -> (String, usize) {
        let mut st = self.state.lock().await;
        let url = self.catalog.get(st.cursor).to_string();
        st.cursor = (st.cursor + 1) % self.catalog.len();
        (url, st.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(links: &[&str]) -> ModerationStore {
        let catalog = LinkCatalog::new(links.iter().map(|s| s.to_string()).collect()).unwrap();
        ModerationStore::new(catalog)
    }

    fn chat(id: &str) -> ChatId {
        ChatId(id.to_string())
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(LinkCatalog::new(Vec::new()).is_err());
    }

    #[tokio::test]
    async fn antilink_defaults_on_and_follows_last_write() {
        let store = store(&["https://a.example/"]);
        assert!(store.antilink_enabled().await);

        for &value in &[false, false, true, false] {
            assert_eq!(store.set_antilink(value).await, value);
            assert_eq!(store.antilink_enabled().await, value);
        }
    }

    #[tokio::test]
    async fn link_sharing_tracks_membership_in_both_sets() {
        let store = store(&["https://a.example/"]);
        let g = chat("group-1@g.us");

        assert!(!store.link_sharing_enabled().await);

        store.set_link_sharing(true, &g).await;
        assert!(store.link_sharing_enabled().await);
        assert_eq!(store.subscribed_groups().await, vec![g.clone()]);
        assert_eq!(store.known_groups().await, vec![g.clone()]);

        // Repeating the call is a no-op on membership.
        store.set_link_sharing(true, &g).await;
        assert_eq!(store.subscribed_groups().await.len(), 1);

        // Disabling removes the group from both sets.
        store.set_link_sharing(false, &g).await;
        assert!(!store.link_sharing_enabled().await);
        assert!(store.subscribed_groups().await.is_empty());
        assert!(store.known_groups().await.is_empty());
    }

    #[tokio::test]
    async fn subscribed_is_always_a_subset_of_known() {
        let store = store(&["https://a.example/"]);
        let g1 = chat("g1@g.us");
        let g2 = chat("g2@g.us");

        store.set_link_sharing(true, &g1).await;
        store.set_link_sharing(true, &g2).await;
        store.set_link_sharing(false, &g1).await;

        let subscribed = store.subscribed_groups().await;
        let known = store.known_groups().await;
        assert!(subscribed.iter().all(|g| known.contains(g)));
    }

    #[tokio::test]
    async fn next_link_cycles_through_the_catalog() {
        let store = store(&["https://a.example/", "https://b.example/", "https://c.example/"]);

        let mut seen = Vec::new();
        for _ in 0..7 {
            let (url, _) = store.next_link().await;
            seen.push(url);
        }

        assert_eq!(
            seen,
            vec![
                "https://a.example/",
                "https://b.example/",
                "https://c.example/",
                "https://a.example/",
                "https://b.example/",
                "https://c.example/",
                "https://a.example/",
            ]
        );
    }

    #[tokio::test]
    async fn next_link_reports_the_advanced_cursor() {
        let store = store(&["https://a.example/", "https://b.example/"]);
        assert_eq!(store.next_link().await.1, 1);
        assert_eq!(store.next_link().await.1, 0);
        assert_eq!(store.next_link().await.1, 1);
    }
}
