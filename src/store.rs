use async_trait::async_trait;
use base64::Engine as _;
use log::error;
use reqwest::{header, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Repository coordinates, parsed from `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self { owner: owner.to_string(), repo: repo.to_string() })
    }
}

/// Version-controlled content repository operations used by the moderation router.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, StoreError>;
    async fn create_branch(&self, repo: &RepoRef, branch: &str, from_sha: &str) -> Result<(), StoreError>;
    async fn create_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        branch: &str,
        message: &str,
    ) -> Result<(), StoreError>;
    async fn create_pull_request(&self, repo: &RepoRef, title: &str, head: &str, base: &str) -> Result<(), StoreError>;
}

// ---------------- GitHub REST v3 ----------------
pub struct GitHubStore {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: String,
}

impl GitHubStore {
    pub fn new(api_base: &str, token: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, repo: &RepoRef, tail: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.repo),
            tail
        );
        let mut req = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = match resp.json::<GitHubErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        error!("github request failed status={} message={}", status.as_u16(), message);
        Err(StoreError::Status { status: status.as_u16(), message })
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ContentStore for GitHubStore {
    async fn get_branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, StoreError> {
        let req = self.request(Method::GET, repo, &format!("branches/{}", urlencoding::encode(branch)));
        let resp = self.send(req).await?;
        let body: BranchResponse = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(body.commit.sha)
    }

    async fn create_branch(&self, repo: &RepoRef, branch: &str, from_sha: &str) -> Result<(), StoreError> {
        let req = self
            .request(Method::POST, repo, "git/refs")
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": from_sha }));
        self.send(req).await.map(|_| ())
    }

    async fn create_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        branch: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let req = self
            .request(Method::PUT, repo, &format!("contents/{}", encode_path(path)))
            .json(&json!({ "message": message, "content": encoded, "branch": branch }));
        self.send(req).await.map(|_| ())
    }

    async fn create_pull_request(&self, repo: &RepoRef, title: &str, head: &str, base: &str) -> Result<(), StoreError> {
        let req = self
            .request(Method::POST, repo, "pulls")
            .json(&json!({ "title": title, "head": head, "base": base }));
        self.send(req).await.map(|_| ())
    }
}
