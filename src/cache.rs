//! In-memory query cache keyed by `(resource, page)`.
//!
//! Each key is in exactly one of three states. Pending and failed entries
//! keep whatever data the key had before, so a refetch never blanks the view,
//! and a brand new key can borrow the most recently shown page as a
//! placeholder until its own data arrives.

use crate::model::PageResult;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Resource tag for the paginated user listing
pub const USERS: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub resource: &'static str,
    pub page: u32,
}

impl PageKey {
    pub fn users(page: u32) -> Self {
        PageKey {
            resource: USERS,
            page,
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryState {
    Pending {
        previous: Option<PageResult>,
    },
    Ready {
        data: PageResult,
        fetched_at: Instant,
        invalidated: bool,
    },
    Failed {
        error: String,
        previous: Option<PageResult>,
    },
}

impl QueryState {
    pub fn data(&self) -> Option<&PageResult> {
        match self {
            QueryState::Ready { data, .. } => Some(data),
            QueryState::Pending { previous } | QueryState::Failed { previous, .. } => {
                previous.as_ref()
            }
        }
    }

    fn data_mut(&mut self) -> Option<&mut PageResult> {
        match self {
            QueryState::Ready { data, .. } => Some(data),
            QueryState::Pending { previous } | QueryState::Failed { previous, .. } => {
                previous.as_mut()
            }
        }
    }

    fn into_data(self) -> Option<PageResult> {
        match self {
            QueryState::Ready { data, .. } => Some(data),
            QueryState::Pending { previous } | QueryState::Failed { previous, .. } => previous,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending { .. })
    }
}

/// What the view should draw for a key
#[derive(Debug, PartialEq)]
pub enum QueryView<'a> {
    Loading,
    Ready {
        data: &'a PageResult,
        /// Data belongs to a previously shown key
        placeholder: bool,
    },
    Failed {
        error: &'a str,
    },
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<PageKey, QueryState>,
    last_shown: Option<PageKey>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: PageKey) -> Option<&QueryState> {
        self.entries.get(&key)
    }

    pub fn get(&self, key: PageKey) -> Option<&PageResult> {
        self.entries.get(&key).and_then(QueryState::data)
    }

    pub fn is_pending(&self, key: PageKey) -> bool {
        self.entries.get(&key).is_some_and(QueryState::is_pending)
    }

    /// Data present, not invalidated and younger than `stale_time`
    pub fn is_fresh(&self, key: PageKey, stale_time: Duration, now: Instant) -> bool {
        match self.entries.get(&key) {
            Some(QueryState::Ready {
                fetched_at,
                invalidated,
                ..
            }) => !invalidated && now.saturating_duration_since(*fetched_at) < stale_time,
            _ => false,
        }
    }

    pub fn set_pending(&mut self, key: PageKey) {
        let previous = self.entries.remove(&key).and_then(QueryState::into_data);
        tracing::debug!(page = key.page, has_previous = previous.is_some(), "query pending");
        self.entries.insert(key, QueryState::Pending { previous });
    }

    pub fn resolve(&mut self, key: PageKey, data: PageResult, now: Instant) {
        tracing::debug!(page = key.page, users = data.users.len(), "query resolved");
        self.entries.insert(
            key,
            QueryState::Ready {
                data,
                fetched_at: now,
                invalidated: false,
            },
        );
    }

    pub fn fail(&mut self, key: PageKey, error: String) {
        let previous = self.entries.remove(&key).and_then(QueryState::into_data);
        tracing::debug!(page = key.page, %error, "query failed");
        self.entries.insert(key, QueryState::Failed { error, previous });
    }

    /// Replace the key's data with `updater(old)`. Returns false when the key
    /// has nothing to update.
    pub fn set_query_data<F>(&mut self, key: PageKey, updater: F) -> bool
    where
        F: FnOnce(&PageResult) -> PageResult,
    {
        match self.entries.get_mut(&key).and_then(QueryState::data_mut) {
            Some(data) => {
                *data = updater(data);
                true
            }
            None => false,
        }
    }

    /// Mark the key stale so the next query refetches it
    pub fn invalidate(&mut self, key: PageKey) {
        if let Some(QueryState::Ready { invalidated, .. }) = self.entries.get_mut(&key) {
            *invalidated = true;
        }
    }

    /// The key's own data, else the data of the last page shown
    pub fn shown_data(&self, key: PageKey) -> Option<&PageResult> {
        self.get(key)
            .or_else(|| self.last_shown.filter(|k| *k != key).and_then(|k| self.get(k)))
    }

    pub fn view(&mut self, key: PageKey) -> QueryView<'_> {
        if self.get(key).is_some() {
            self.last_shown = Some(key);
        }

        let own = self.entries.get(&key);
        if let Some(data) = own.and_then(QueryState::data) {
            return QueryView::Ready {
                data,
                placeholder: false,
            };
        }
        if let Some(QueryState::Failed { error, .. }) = own {
            return QueryView::Failed { error };
        }

        match self.last_shown.filter(|k| *k != key).and_then(|k| self.get(k)) {
            Some(data) => QueryView::Ready {
                data,
                placeholder: true,
            },
            None => QueryView::Loading,
        }
    }
}
