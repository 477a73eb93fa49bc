use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record as served by the directory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
}

impl User {
    /// Plain-text block placed on the clipboard when the record is claimed
    pub fn claim_summary(&self) -> String {
        format!(
            "Full Name: {}\nFirst Name: {}\nLast Name: {}\nCity: {}",
            self.full_name, self.first_name, self.last_name, self.city
        )
        .trim()
        .to_string()
    }
}

/// One page of users plus the session-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub total_copied: u64,
    #[serde(default)]
    pub today_copied: u64,
}

impl PageResult {
    /// Users on this page that can still be claimed
    pub fn active_count(&self) -> usize {
        self.users.iter().filter(|u| !u.locked).count()
    }

    pub fn find(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// Optimistic patch applied after the server accepted a lock.
///
/// Counters move even when `claimed_id` is not on the page: the server
/// already counted the claim.
pub fn apply_claim(old: &PageResult, claimed_id: &str, now: DateTime<Utc>) -> PageResult {
    let users = old
        .users
        .iter()
        .map(|u| {
            if u.id == claimed_id {
                User {
                    locked: true,
                    locked_at: Some(now),
                    ..u.clone()
                }
            } else {
                u.clone()
            }
        })
        .collect();

    PageResult {
        users,
        today_copied: old.today_copied.saturating_add(1),
        total_copied: old.total_copied.saturating_add(1),
        ..old.clone()
    }
}

/// Hours remaining in the local day for a clock hour in 0..=23
pub fn hours_left_today(hour: u32) -> u32 {
    24u32.saturating_sub(hour.min(23))
}
