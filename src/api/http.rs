use super::DirectoryApi;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::PageResult;
use async_trait::async_trait;
use reqwest::Url;

const USERS_PATH: &str = "all-users-collection";
const LOCK_PATH: &str = "lock-user";

/// reqwest-backed client bound to a single base URL
pub struct HttpDirectoryApi {
    client: reqwest::Client,
    base_url: Url,
}

/// Build the process-wide API client from configuration
pub fn client(config: &Config) -> Result<HttpDirectoryApi> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()?;

    Ok(HttpDirectoryApi {
        client,
        base_url: config.base_url.clone(),
    })
}

impl HttpDirectoryApi {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn page_url(&self, page: u32) -> Result<Url> {
        let mut url = self.join(USERS_PATH)?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    pub fn lock_url(&self, id: &str) -> Result<Url> {
        let mut url = self.join(LOCK_PATH)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| Error::InvalidUrl {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Turn a non-2xx response into [`Error::Status`] with its body
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn fetch_page(&self, page: u32) -> Result<PageResult> {
        let url = self.page_url(page)?;
        tracing::debug!(%url, "fetching page");

        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<PageResult>().await?)
    }

    async fn lock_user(&self, id: &str) -> Result<()> {
        let url = self.lock_url(id)?;
        tracing::debug!(%url, "locking user");

        let response = self.client.patch(url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
