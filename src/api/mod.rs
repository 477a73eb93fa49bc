//! Directory API client.
//!
//! One [`HttpDirectoryApi`] is built per process and shared behind
//! `Arc<dyn DirectoryApi>`; everything else talks to the trait so tests can
//! swap in a mock.

mod http;

use crate::error::Result;
use crate::model::PageResult;
use async_trait::async_trait;

pub use http::{HttpDirectoryApi, client};

/// Remote calls the viewer makes
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// `GET /all-users-collection?page={page}`
    async fn fetch_page(&self, page: u32) -> Result<PageResult>;

    /// `PATCH /lock-user/{id}`; only the status matters
    async fn lock_user(&self, id: &str) -> Result<()>;
}
