//! Matching incoming share URLs against recorded share links.
//!
//! Two URLs match when their encoded identifier lists are exactly equal. The
//! host and path they were served from do not matter, and one list being a
//! prefix of another is not a match.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::store::LibraryStore;
use crate::share::encoded_value_of;

/// Where an incoming share URL already sits in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMembership {
    /// Matches a link this user created
    Owned,

    /// Matches a link this user saved from someone else
    Received,

    /// Not recorded
    Unknown,
}

impl std::fmt::Display for ShareMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareMembership::Owned => write!(f, "in my shares"),
            ShareMembership::Received => write!(f, "already saved"),
            ShareMembership::Unknown => write!(f, "not in library"),
        }
    }
}

/// Answers membership questions for share URLs
pub struct Reconciler {
    store: Arc<LibraryStore>,
}

impl Reconciler {
    pub fn new(store: Arc<LibraryStore>) -> Self {
        Self { store }
    }

    /// Whether a received (not owned) link with the same encoded value exists
    pub async fn is_received_share_already_saved(&self, incoming_url: &str) -> bool {
        let Some(value) = encoded_value_of(incoming_url) else {
            return false;
        };

        self.store
            .share_links(Some(false))
            .await
            .iter()
            .any(|link| link.share_value().as_deref() == Some(value.as_str()))
    }

    /// Owned, received or unknown. Owned wins when both match.
    pub async fn membership(&self, incoming_url: &str) -> ShareMembership {
        let Some(value) = encoded_value_of(incoming_url) else {
            return ShareMembership::Unknown;
        };

        let links = self.store.share_links(None).await;
        let matching = links
            .iter()
            .filter(|link| link.share_value().as_deref() == Some(value.as_str()));

        let mut membership = ShareMembership::Unknown;
        for link in matching {
            if link.is_owned() {
                membership = ShareMembership::Owned;
                break;
            }
            membership = ShareMembership::Received;
        }

        debug!(url = %incoming_url, %membership, "Checked share membership");
        membership
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShareLink;

    async fn reconciler_with(links: Vec<ShareLink>) -> Reconciler {
        let store = Arc::new(LibraryStore::in_memory());
        for link in links {
            store.add_share_link(link).await;
        }
        Reconciler::new(store)
    }

    #[tokio::test]
    async fn test_match_ignores_host() {
        let r = reconciler_with(vec![ShareLink::new_received(
            "https://h/share?json=X",
            "x",
        )])
        .await;

        assert!(r.is_received_share_already_saved("https://h2/share?json=X").await);
        assert!(!r.is_received_share_already_saved("https://h/share?json=Y").await);
    }

    #[tokio::test]
    async fn test_prefix_is_not_a_match() {
        let r = reconciler_with(vec![ShareLink::new_received(
            "https://h/share?json=Qm1;Qm2;;",
            "x",
        )])
        .await;

        assert!(!r.is_received_share_already_saved("https://h/share?json=Qm1").await);
    }

    #[tokio::test]
    async fn test_owned_links_are_not_received() {
        let r = reconciler_with(vec![ShareLink::new_owned("https://h", "X;;;", "mine")]).await;

        assert!(!r.is_received_share_already_saved("https://h/share?json=X;;;").await);
        assert_eq!(
            r.membership("https://other/share?json=X%3B%3B%3B").await,
            ShareMembership::Owned
        );
    }

    #[tokio::test]
    async fn test_membership_states() {
        let r = reconciler_with(vec![
            ShareLink::new_received("https://h/share?json=A", "a"),
            ShareLink::new_received("https://h/share?json=B", "b"),
            ShareLink::new_owned("https://h", "B", "b mine"),
        ])
        .await;

        assert_eq!(r.membership("https://h/share?json=A").await, ShareMembership::Received);
        assert_eq!(r.membership("https://h/share?json=B").await, ShareMembership::Owned);
        assert_eq!(r.membership("https://h/share?json=C").await, ShareMembership::Unknown);
        assert_eq!(r.membership("https://h/share").await, ShareMembership::Unknown);
    }
}
