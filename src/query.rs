//! Fetch orchestration on top of [`QueryCache`].
//!
//! Requests run as tasks on a tokio runtime and report back over a channel.
//! The owner of the [`QueryClient`] applies completions on its own thread via
//! [`QueryClient::poll`] (UI loop) or [`QueryClient::settle`] (async callers),
//! so every cache write and every mutation success callback happens there.

use crate::api::DirectoryApi;
use crate::cache::{PageKey, QueryCache, QueryView};
use crate::error::Result;
use crate::model::PageResult;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type OnSuccess = Box<dyn FnOnce(&mut QueryCache) + Send>;

enum Completion {
    Fetched {
        key: PageKey,
        result: Result<PageResult>,
    },
    Mutated {
        label: String,
        result: Result<()>,
        on_success: OnSuccess,
    },
}

/// Result of applying one completion
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fetched { key: PageKey },
    FetchFailed { key: PageKey, error: String },
    Mutated { label: String },
    MutationFailed { label: String, error: String },
}

pub struct QueryClient {
    api: Arc<dyn DirectoryApi>,
    cache: QueryCache,
    runtime: Handle,
    stale_time: Duration,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl QueryClient {
    pub fn new(api: Arc<dyn DirectoryApi>, runtime: Handle, stale_time: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        QueryClient {
            api,
            cache: QueryCache::new(),
            runtime,
            stale_time,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn api(&self) -> Arc<dyn DirectoryApi> {
        Arc::clone(&self.api)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Number of spawned requests whose completion has not been applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Make sure `key` has data or a fetch on the way.
    ///
    /// Fresh data is served as is and an in-flight fetch for the same key is
    /// reused. Returns true when a new fetch was started.
    pub fn query(&mut self, key: PageKey) -> bool {
        if self.cache.is_pending(key) {
            return false;
        }
        if self.cache.is_fresh(key, self.stale_time, Instant::now()) {
            return false;
        }

        self.cache.set_pending(key);
        self.in_flight += 1;

        let api = self.api();
        let tx = self.tx.clone();
        tracing::info!(page = key.page, "fetching page");
        self.runtime.spawn(async move {
            let result = api.fetch_page(key.page).await;
            let _ = tx.send(Completion::Fetched { key, result });
        });
        true
    }

    /// Drop freshness for `key` and query it again
    pub fn refetch(&mut self, key: PageKey) -> bool {
        self.cache.invalidate(key);
        self.query(key)
    }

    /// Run `mutation` in the background; `on_success` gets the cache once the
    /// mutation resolves without error.
    pub fn mutate<Fut, F>(&mut self, label: impl Into<String>, mutation: Fut, on_success: F)
    where
        Fut: Future<Output = Result<()>> + Send + 'static,
        F: FnOnce(&mut QueryCache) + Send + 'static,
    {
        let label = label.into();
        let tx = self.tx.clone();
        self.in_flight += 1;

        tracing::info!(%label, "mutation dispatched");
        self.runtime.spawn(async move {
            let result = mutation.await;
            let _ = tx.send(Completion::Mutated {
                label,
                result,
                on_success: Box::new(on_success),
            });
        });
    }

    pub fn set_query_data<F>(&mut self, key: PageKey, updater: F) -> bool
    where
        F: FnOnce(&PageResult) -> PageResult,
    {
        self.cache.set_query_data(key, updater)
    }

    pub fn view(&mut self, key: PageKey) -> QueryView<'_> {
        self.cache.view(key)
    }

    /// Apply every completion that has already arrived, without blocking
    pub fn poll(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            outcomes.push(self.apply(completion));
        }
        outcomes
    }

    /// Wait for the next completion and apply it. `None` when nothing is in
    /// flight.
    pub async fn settle(&mut self) -> Option<Outcome> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Settle until nothing is in flight
    pub async fn settle_all(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.settle().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn apply(&mut self, completion: Completion) -> Outcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Fetched { key, result } => match result {
                Ok(data) => {
                    tracing::info!(page = key.page, users = data.users.len(), "page loaded");
                    self.cache.resolve(key, data, Instant::now());
                    Outcome::Fetched { key }
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!(page = key.page, %error, "page fetch failed");
                    self.cache.fail(key, error.clone());
                    Outcome::FetchFailed { key, error }
                }
            },
            Completion::Mutated {
                label,
                result,
                on_success,
            } => match result {
                Ok(()) => {
                    tracing::info!(%label, "mutation succeeded");
                    on_success(&mut self.cache);
                    Outcome::Mutated { label }
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!(%label, %error, "mutation failed");
                    Outcome::MutationFailed { label, error }
                }
            },
        }
    }
}
