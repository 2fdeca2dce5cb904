//! Deterministic file naming for new comments.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const SLUG_MAX_CHARS: usize = 50;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9A-Za-z_]").unwrap());
static HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Trimmed, lower-cased first line of the body. Doubles as commit message
/// and pull request title.
pub fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    let first = trimmed.split('\n').next().unwrap_or_default();
    first.trim_end_matches('\r').to_lowercase()
}

pub fn slugify(body: &str) -> String {
    let first = excerpt(body);
    let end = first.char_indices().nth(SLUG_MAX_CHARS).map(|(i, _)| i).unwrap_or(first.len());
    let hyphenated = NON_WORD.replace_all(&first[..end], "-");
    let squeezed = HYPHEN_RUN.replace_all(&hyphenated, "-");
    squeezed.trim_matches('-').to_string()
}

/// `<epoch-millis>-<slug>.json`
pub fn file_name(at: DateTime<Utc>, body: &str) -> String {
    format!("{}-{}.json", at.timestamp_millis(), slugify(body))
}

/// Repository path of a new comment file under the thread's directory.
pub fn comment_path(source: &str, thread_dir: &str, at: DateTime<Utc>, body: &str) -> String {
    let name = file_name(at, body);
    [source, thread_dir, name.as_str()]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
