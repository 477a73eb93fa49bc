use crate::api::DirectoryApi;
use crate::clipboard::Clipboard;
use crate::error::{Error, Result};
use crate::model::{PageResult, User};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn user(id: &str, first: &str, last: &str, city: &str, locked: bool) -> User {
    User {
        id: id.to_string(),
        full_name: format!("{} {}", first, last),
        first_name: first.to_string(),
        last_name: last.to_string(),
        city: city.to_string(),
        locked,
        locked_at: None,
    }
}

pub fn page(users: Vec<User>, total_pages: u64) -> PageResult {
    PageResult {
        users,
        total_users: 42,
        total_pages,
        total_copied: 17,
        today_copied: 4,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    FetchPage(u32),
    LockUser(String),
}

#[derive(Clone, Default)]
pub struct MockDirectoryApi {
    pages: Arc<Mutex<HashMap<u32, PageResult>>>,
    failing_pages: Arc<Mutex<HashSet<u32>>>,
    rejected_locks: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl MockDirectoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, number: u32, result: PageResult) -> Self {
        self.pages.lock().expect("pages lock").insert(number, result);
        self
    }

    pub fn fail_page(&self, number: u32) {
        self.failing_pages.lock().expect("failing lock").insert(number);
    }

    pub fn heal_page(&self, number: u32) {
        self.failing_pages.lock().expect("failing lock").remove(&number);
    }

    pub fn reject_lock(&self, id: &str) {
        self.rejected_locks
            .lock()
            .expect("rejected lock")
            .insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn fetches(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::FetchPage(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn locks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::LockUser(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DirectoryApi for MockDirectoryApi {
    async fn fetch_page(&self, page: u32) -> Result<PageResult> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(ApiCall::FetchPage(page));
        if self.failing_pages.lock().expect("failing lock").contains(&page) {
            return Err(Error::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self
            .pages
            .lock()
            .expect("pages lock")
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }

    async fn lock_user(&self, id: &str) -> Result<()> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(ApiCall::LockUser(id.to_string()));
        if self.rejected_locks.lock().expect("rejected lock").contains(id) {
            return Err(Error::Status {
                status: 409,
                body: "already locked".to_string(),
            });
        }
        Ok(())
    }
}

/// Clipboard that keeps every write in memory
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    writes: Arc<Mutex<Vec<String>>>,
    broken: bool,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            writes: Arc::default(),
            broken: true,
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.broken {
            return Err(Error::Clipboard("no display available".to_string()));
        }
        self.writes.lock().expect("writes lock").push(text.to_string());
        Ok(())
    }
}
