use std::time::Duration;
use thiserror::Error;

use crate::store::RepoRef;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} must be at least 32 characters long")]
    SecretTooShort(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub jwt_secret: String,
    pub repository: RepoRef,
    pub github_token: Option<String>,
    pub github_api_base: String,
    pub published_branch: String,
    pub threads_source: String,
    pub site_url: String,
    pub settings_path: String,
    pub settings_ttl: Duration,
    pub store_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        fn required(name: &'static str) -> Result<String, ConfigError> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(name))
        }
        fn string_env(name: &str, default: &str) -> String {
            std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
        }
        fn parsed_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
        where
            T::Err: std::fmt::Display,
        {
            match std::env::var(name) {
                Ok(v) if !v.is_empty() => v
                    .parse()
                    .map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
                _ => Ok(default),
            }
        }

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort("JWT_SECRET"));
        }
        let repo_name = required("GITHUB_REPOSITORY")?;
        let repository = RepoRef::parse(&repo_name).ok_or_else(|| ConfigError::Invalid {
            name: "GITHUB_REPOSITORY",
            reason: format!("expected owner/repo, got '{repo_name}'"),
        })?;
        let site_url = required("SITE_URL")?;

        Ok(Self {
            bind_addr: string_env("BIND_ADDR", "0.0.0.0"),
            port: parsed_env("PORT", 8080)?,
            jwt_secret,
            repository,
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            github_api_base: string_env("GITHUB_API_BASE", "https://api.github.com"),
            published_branch: string_env("PUBLISHED_BRANCH", "master"),
            threads_source: string_env("THREADS_SOURCE", "threads"),
            site_url,
            settings_path: string_env("SETTINGS_PATH", "/comments/settings.json"),
            settings_ttl: Duration::from_secs(parsed_env("SETTINGS_TTL_SECS", 60)?),
            store_timeout: Duration::from_secs(parsed_env("STORE_TIMEOUT_SECS", 10)?),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}
