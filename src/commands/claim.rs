use crate::api::DirectoryApi;
use crate::cache::PageKey;
use crate::claim::{ClaimResult, ClaimStatus, Claims};
use crate::clipboard::Clipboard;
use crate::error::{Error, Result};
use crate::query::{Outcome, QueryClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Claim a single record without the interactive view
pub fn run(
    api: Arc<dyn DirectoryApi>,
    runtime: &Runtime,
    clipboard: &mut dyn Clipboard,
    page: u32,
    id: &str,
) -> Result<()> {
    let mut client = QueryClient::new(api, runtime.handle().clone(), Duration::ZERO);
    let message = runtime.block_on(claim(&mut client, clipboard, page, id))?;
    println!("{}", message);
    Ok(())
}

/// Load `page`, claim `id` from it and wait for the lock to resolve
pub async fn claim(
    client: &mut QueryClient,
    clipboard: &mut dyn Clipboard,
    page: u32,
    id: &str,
) -> Result<String> {
    let key = PageKey::users(page);
    client.query(key);
    if let Some(Outcome::FetchFailed { error, .. }) = client.settle().await {
        return Err(Error::RequestFailed(format!("page {}: {}", page, error)));
    }

    let user = client
        .cache()
        .get(key)
        .and_then(|p| p.find(id))
        .cloned()
        .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

    let mut claims = Claims::new();
    match claims.start(&user, key, clipboard, client)? {
        ClaimStatus::AlreadyLocked => return Err(Error::AlreadyLocked(id.to_string())),
        ClaimStatus::InFlight | ClaimStatus::Dispatched => {}
    }

    while let Some(outcome) = client.settle().await {
        match claims.finish(&outcome) {
            Some(ClaimResult::Locked { .. }) => {
                let counters = client.cache().get(key).map(|p| (p.today_copied, p.total_copied));
                let (today, total) = counters.unwrap_or_default();
                return Ok(format!(
                    "Claimed {} ({}). Copied today: {}, total: {}",
                    user.full_name, user.id, today, total
                ));
            }
            Some(ClaimResult::Rejected { id, error }) => {
                return Err(Error::ClaimRejected { id, reason: error });
            }
            None => {}
        }
    }

    Err(Error::RequestFailed(format!("lock for {} never resolved", id)))
}
