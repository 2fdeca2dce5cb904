//! Deny-list screening and thread time limits.
//!
//! Ban matches are silent: the submitter gets an empty success response so
//! automated posters cannot tell they were blocked. A closed thread is a
//! visible rejection.

use chrono::{DateTime, Utc};

use crate::models::{ModerationSettings, ThreadEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanCategory {
    Address,
    Email,
    Keyword,
}

impl BanCategory {
    /// Value of the `X-Banned` diagnostic header.
    pub fn header_value(self) -> &'static str {
        match self {
            BanCategory::Address => "IP-Banned",
            BanCategory::Email => "Email-Banned",
            BanCategory::Keyword => "Keyword-Banned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ThreadClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    SilentBan(BanCategory),
    VisibleReject(Rejection),
}

/// The submitted fields that deny lists are matched against.
#[derive(Debug, Clone, Copy)]
pub struct Screened<'a> {
    pub email: &'a str,
    pub body: &'a str,
    pub url: &'a str,
}

impl Screened<'_> {
    fn contains_any(&self, needles: &[String]) -> bool {
        needles
            .iter()
            .filter(|n| !n.is_empty())
            .any(|n| self.email.contains(n.as_str()) || self.body.contains(n.as_str()) || self.url.contains(n.as_str()))
    }
}

pub fn screen_address(settings: &ModerationSettings, address: &str) -> Verdict {
    if settings.banned_ips.iter().any(|ip| ip == address) {
        Verdict::SilentBan(BanCategory::Address)
    } else {
        Verdict::Allowed
    }
}

pub fn screen_content(settings: &ModerationSettings, fields: Screened<'_>) -> Verdict {
    if fields.contains_any(&settings.banned_emails) {
        Verdict::SilentBan(BanCategory::Email)
    } else if fields.contains_any(&settings.banned_keywords) {
        Verdict::SilentBan(BanCategory::Keyword)
    } else {
        Verdict::Allowed
    }
}

/// Address first, then email lists, then keyword lists.
pub fn screen(settings: &ModerationSettings, address: &str, fields: Screened<'_>) -> Verdict {
    match screen_address(settings, address) {
        Verdict::Allowed => screen_content(settings, fields),
        banned => banned,
    }
}

pub fn check_time_limit(settings: &ModerationSettings, entry: &ThreadEntry, now: DateTime<Utc>) -> Verdict {
    if settings.timelimit == 0 {
        return Verdict::Allowed;
    }
    // limits beyond the representable range never close a thread
    let limit_ms = i64::try_from(settings.timelimit)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .unwrap_or(i64::MAX);
    let age = now.signed_duration_since(entry.created_at);
    if age.num_milliseconds() > limit_ms {
        Verdict::VisibleReject(Rejection::ThreadClosed)
    } else {
        Verdict::Allowed
    }
}
