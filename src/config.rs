use crate::error::{Error, Result};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://usa-marketing-server.vercel.app/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub timeout: Duration,
    pub stale_time: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new(base_url: &str, timeout: Duration, stale_time: Duration) -> Result<Self> {
        Ok(Config {
            base_url: parse_base_url(base_url)?,
            timeout,
            stale_time,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        })
    }
}

/// Parse an http(s) base URL and force a trailing slash so relative joins
/// keep any path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| Error::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let config = Config::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_STALE_TIME).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.stale_time, DEFAULT_STALE_TIME);
    }

    #[test]
    fn test_parse_base_url_adds_slash() {
        let url = parse_base_url("http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
    }

    #[test]
    fn test_parse_base_url_rejects_bad_input() {
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_user_agent() {
        let config = Config::new("https://example.com", DEFAULT_TIMEOUT, DEFAULT_STALE_TIME).unwrap();
        assert!(config.user_agent.starts_with("userdeck/"));
    }
}
