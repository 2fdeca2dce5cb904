use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::models::ThreadEntry;

static THREAD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)-(\d+)-(.+)").unwrap());

const METADATA_FILE: &str = "thread.json";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("entry unreadable: {0}")]
    EntryUnreadable(String),
    #[error("malformed thread id: {0}")]
    MalformedThreadId(String),
}

impl ThreadEntry {
    /// Directory segments for the thread's comment files: `2016-01-hello`
    /// becomes `2016/01/hello`.
    pub fn directory(&self) -> Result<String, ResolveError> {
        let caps = THREAD_ID
            .captures(&self.thread)
            .ok_or_else(|| ResolveError::MalformedThreadId(self.thread.clone()))?;
        Ok(format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]))
    }
}

#[async_trait]
pub trait ThreadResolver: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<ThreadEntry, ResolveError>;
}

/// Reads `thread.json` next to the published entry on the site.
pub struct HttpThreadResolver {
    client: reqwest::Client,
    site_url: String,
}

impl HttpThreadResolver {
    pub fn new(site_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, site_url: site_url.trim_end_matches('/').to_string() })
    }

    pub fn metadata_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/{}", self.site_url, METADATA_FILE)
        } else {
            format!("{}/{}/{}", self.site_url, path, METADATA_FILE)
        }
    }
}

#[async_trait]
impl ThreadResolver for HttpThreadResolver {
    async fn resolve(&self, path: &str) -> Result<ThreadEntry, ResolveError> {
        let url = self.metadata_url(path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::EntryUnreadable(format!("{url}: {e}")))?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Err(ResolveError::EntryNotFound(url)),
            s if !s.is_success() => return Err(ResolveError::EntryUnreadable(format!("{url}: status {s}"))),
            _ => {}
        }
        resp.json::<ThreadEntry>()
            .await
            .map_err(|e| ResolveError::EntryUnreadable(format!("{url}: {e}")))
    }
}
