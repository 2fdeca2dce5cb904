use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Comment as submitted by a visitor and as persisted in the content repository.
///
/// `ip`, `id`, `date` and `verified` are assigned by the server at intake;
/// whatever the client sent for them is overwritten by [`RawComment::stamp`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawComment {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "www")]
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub verified: bool,
}

impl RawComment {
    /// Assign the server-owned fields. Called exactly once per submission.
    pub fn stamp(&mut self, ip: &str, now: DateTime<Utc>, verified: bool) {
        self.ip = ip.to_string();
        self.id = now.timestamp_nanos_opt().unwrap_or_default().to_string();
        self.date = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        self.verified = verified;
    }

    /// Link-bearing bodies are held for review even when approval is not
    /// required globally.
    pub fn is_suspicious(&self) -> bool {
        let body = self.body.to_lowercase();
        ["http://", "https://", "www."].iter().any(|needle| body.contains(needle))
    }

    pub fn to_parsed(&self) -> ParsedComment {
        ParsedComment {
            id: self.id.clone(),
            parent: self.parent.clone(),
            author: self.author.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            date: self.date.clone(),
            verified: self.verified,
            email_hash: email_hash(&self.email),
        }
    }
}

/// Public view returned to the submitter. Email and IP never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParsedComment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub author: String,
    #[serde(rename = "www")]
    pub url: String,
    pub body: String,
    pub date: String,
    pub verified: bool,
    pub email_hash: String, // gravatar key
}

fn email_hash(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

/// Metadata of a published entry that comments are filed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ThreadEntry {
    pub thread: String,
    pub created_at: DateTime<Utc>,
}

/// Operator moderation policy, fetched from the published site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModerationSettings {
    #[serde(default)]
    pub banned_ips: Vec<String>,
    #[serde(default)]
    pub banned_emails: Vec<String>,
    #[serde(default)]
    pub banned_keywords: Vec<String>,
    /// Seconds after thread creation when new comments stop being accepted; 0 disables.
    #[serde(default)]
    pub timelimit: u64,
    #[serde(default)]
    pub require_approval: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
