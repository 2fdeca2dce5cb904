use gitcomments::config::{Config, ConfigError};
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: &[&str] = &[
    "JWT_SECRET",
    "GITHUB_REPOSITORY",
    "SITE_URL",
    "GITHUB_TOKEN",
    "GITHUB_API_BASE",
    "PUBLISHED_BRANCH",
    "THREADS_SOURCE",
    "SETTINGS_PATH",
    "SETTINGS_TTL_SECS",
    "STORE_TIMEOUT_SECS",
    "BIND_ADDR",
    "PORT",
    "CORS_ORIGINS",
];

fn reset() {
    for v in VARS {
        env::remove_var(v);
    }
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    env::set_var("GITHUB_REPOSITORY", "acme/blog");
    env::set_var("SITE_URL", "https://blog.example.com");
}

#[test]
#[serial]
fn defaults_apply() {
    reset();
    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg.repository.owner, "acme");
    assert_eq!(cfg.repository.repo, "blog");
    assert_eq!(cfg.github_api_base, "https://api.github.com");
    assert_eq!(cfg.published_branch, "master");
    assert_eq!(cfg.threads_source, "threads");
    assert_eq!(cfg.settings_path, "/comments/settings.json");
    assert_eq!(cfg.settings_ttl, Duration::from_secs(60));
    assert_eq!(cfg.store_timeout, Duration::from_secs(10));
    assert_eq!(cfg.bind_addr, "0.0.0.0");
    assert_eq!(cfg.port, 8080);
    assert!(cfg.github_token.is_none());
    assert!(cfg.cors_origins.is_empty());
}

#[test]
#[serial]
fn overrides_are_read() {
    reset();
    env::set_var("GITHUB_TOKEN", "ghp_x");
    env::set_var("PUBLISHED_BRANCH", "main");
    env::set_var("PORT", "9000");
    env::set_var("STORE_TIMEOUT_SECS", "3");
    env::set_var("CORS_ORIGINS", "https://a.example, https://b.example,");
    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg.github_token.as_deref(), Some("ghp_x"));
    assert_eq!(cfg.published_branch, "main");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_timeout, Duration::from_secs(3));
    assert_eq!(cfg.cors_origins, vec!["https://a.example".to_string(), "https://b.example".to_string()]);
}

#[test]
#[serial]
fn required_values_are_checked() {
    reset();
    env::remove_var("SITE_URL");
    assert_eq!(Config::from_env().unwrap_err(), ConfigError::Missing("SITE_URL"));

    reset();
    env::set_var("JWT_SECRET", "short");
    assert_eq!(Config::from_env().unwrap_err(), ConfigError::SecretTooShort("JWT_SECRET"));

    reset();
    env::set_var("GITHUB_REPOSITORY", "acme");
    assert!(matches!(Config::from_env(), Err(ConfigError::Invalid { name: "GITHUB_REPOSITORY", .. })));

    reset();
    env::set_var("PORT", "eighty");
    assert!(matches!(Config::from_env(), Err(ConfigError::Invalid { name: "PORT", .. })));
}
