//! Claiming a record: copy its summary, then lock it on the server.

use crate::cache::PageKey;
use crate::clipboard::Clipboard;
use crate::error::Result;
use crate::model::{User, apply_claim};
use crate::query::{Outcome, QueryClient};
use chrono::Utc;
use std::collections::HashSet;

const LABEL_PREFIX: &str = "lock-user/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// Summary copied and lock request sent
    Dispatched,
    /// Record is locked already; nothing happened
    AlreadyLocked,
    /// A lock for this record from this client has not come back yet
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    Locked { id: String },
    Rejected { id: String, error: String },
}

/// Claims started by this client that have not resolved yet
#[derive(Debug, Default)]
pub struct Claims {
    pending: HashSet<String>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Claim `user`, shown under `key`.
    ///
    /// The clipboard write finishes before the lock is dispatched; if it
    /// fails the lock is never sent. On success the cached page is patched
    /// in place.
    pub fn start(
        &mut self,
        user: &User,
        key: PageKey,
        clipboard: &mut dyn Clipboard,
        client: &mut QueryClient,
    ) -> Result<ClaimStatus> {
        if user.locked {
            return Ok(ClaimStatus::AlreadyLocked);
        }
        if self.is_pending(&user.id) {
            return Ok(ClaimStatus::InFlight);
        }

        clipboard.set_text(&user.claim_summary())?;
        tracing::info!(id = %user.id, name = %user.full_name, "copied record");

        let id = user.id.clone();
        let api = client.api();
        let remote_id = id.clone();
        let patched_id = id.clone();
        client.mutate(
            label(&id),
            async move { api.lock_user(&remote_id).await },
            move |cache| {
                cache.set_query_data(key, |old| apply_claim(old, &patched_id, Utc::now()));
            },
        );
        self.pending.insert(id);

        Ok(ClaimStatus::Dispatched)
    }

    /// Match a query outcome against pending claims
    pub fn finish(&mut self, outcome: &Outcome) -> Option<ClaimResult> {
        let (label, error) = match outcome {
            Outcome::Mutated { label } => (label, None),
            Outcome::MutationFailed { label, error } => (label, Some(error)),
            _ => return None,
        };
        let id = label.strip_prefix(LABEL_PREFIX)?;
        if !self.pending.remove(id) {
            return None;
        }

        Some(match error {
            None => ClaimResult::Locked { id: id.to_string() },
            Some(error) => ClaimResult::Rejected {
                id: id.to_string(),
                error: error.clone(),
            },
        })
    }
}

fn label(id: &str) -> String {
    format!("{LABEL_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDirectoryApi, RecordingClipboard, page, user};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    async fn loaded(api: &MockDirectoryApi) -> QueryClient {
        let mut client =
            QueryClient::new(Arc::new(api.clone()), Handle::current(), Duration::from_secs(60));
        client.query(PageKey::users(1));
        client.settle_all().await;
        client
    }

    fn alice_and_bob() -> MockDirectoryApi {
        MockDirectoryApi::new().with_page(
            1,
            page(
                vec![
                    user("a", "Alice", "Smith", "Metro", false),
                    user("b", "Bob", "Jones", "Gotham", true),
                ],
                1,
            ),
        )
    }

    #[tokio::test]
    async fn test_claim_unlocked_record() {
        let api = alice_and_bob();
        let mut client = loaded(&api).await;
        let mut clipboard = RecordingClipboard::new();
        let mut claims = Claims::new();
        let key = PageKey::users(1);
        let alice = client.cache().get(key).unwrap().users[0].clone();
        let before = client.cache().get(key).unwrap().clone();

        let status = claims
            .start(&alice, key, &mut clipboard, &mut client)
            .unwrap();
        assert_eq!(status, ClaimStatus::Dispatched);
        assert_eq!(
            clipboard.writes(),
            vec!["Full Name: Alice Smith\nFirst Name: Alice\nLast Name: Smith\nCity: Metro"]
        );
        assert!(claims.is_pending("a"));

        let outcome = client.settle().await.unwrap();
        assert_eq!(
            claims.finish(&outcome),
            Some(ClaimResult::Locked { id: "a".to_string() })
        );
        assert_eq!(claims.pending_count(), 0);

        let after = client.cache().get(key).unwrap();
        assert!(after.users[0].locked);
        assert!(after.users[0].locked_at.is_some());
        assert_eq!(after.today_copied, before.today_copied + 1);
        assert_eq!(after.total_copied, before.total_copied + 1);
        assert_eq!(api.locks(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_claim_locked_record_is_noop() {
        let api = alice_and_bob();
        let mut client = loaded(&api).await;
        let mut clipboard = RecordingClipboard::new();
        let mut claims = Claims::new();
        let bob = client.cache().get(PageKey::users(1)).unwrap().users[1].clone();

        let status = claims
            .start(&bob, PageKey::users(1), &mut clipboard, &mut client)
            .unwrap();
        assert_eq!(status, ClaimStatus::AlreadyLocked);
        assert!(clipboard.writes().is_empty());
        assert_eq!(client.in_flight(), 0);
        assert!(api.locks().is_empty());
    }

    #[tokio::test]
    async fn test_double_claim_blocked_while_in_flight() {
        let api = alice_and_bob();
        let mut client = loaded(&api).await;
        let mut clipboard = RecordingClipboard::new();
        let mut claims = Claims::new();
        let alice = client.cache().get(PageKey::users(1)).unwrap().users[0].clone();

        claims
            .start(&alice, PageKey::users(1), &mut clipboard, &mut client)
            .unwrap();
        let second = claims
            .start(&alice, PageKey::users(1), &mut clipboard, &mut client)
            .unwrap();
        assert_eq!(second, ClaimStatus::InFlight);

        client.settle_all().await;
        assert_eq!(api.locks(), vec!["a"]);
        assert_eq!(clipboard.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_claim_keeps_record_unlocked() {
        let api = alice_and_bob();
        api.reject_lock("a");
        let mut client = loaded(&api).await;
        let mut clipboard = RecordingClipboard::new();
        let mut claims = Claims::new();
        let alice = client.cache().get(PageKey::users(1)).unwrap().users[0].clone();

        claims
            .start(&alice, PageKey::users(1), &mut clipboard, &mut client)
            .unwrap();
        let outcome = client.settle().await.unwrap();

        assert!(matches!(
            claims.finish(&outcome),
            Some(ClaimResult::Rejected { ref id, .. }) if id == "a"
        ));
        // Clipboard was already written
        assert_eq!(clipboard.writes().len(), 1);
        assert!(!client.cache().get(PageKey::users(1)).unwrap().users[0].locked);
    }

    #[tokio::test]
    async fn test_clipboard_failure_skips_lock() {
        let api = alice_and_bob();
        let mut client = loaded(&api).await;
        let mut clipboard = RecordingClipboard::broken();
        let mut claims = Claims::new();
        let alice = client.cache().get(PageKey::users(1)).unwrap().users[0].clone();

        let result = claims.start(&alice, PageKey::users(1), &mut clipboard, &mut client);
        assert!(result.is_err());
        assert!(!claims.is_pending("a"));
        assert_eq!(client.in_flight(), 0);
        assert!(api.locks().is_empty());
    }

    #[test]
    fn test_finish_ignores_other_outcomes() {
        let mut claims = Claims::new();
        let outcome = Outcome::Fetched {
            key: PageKey::users(1),
        };
        assert_eq!(claims.finish(&outcome), None);
        let unknown = Outcome::Mutated {
            label: label("zzz"),
        };
        assert_eq!(claims.finish(&unknown), None);
    }
}
