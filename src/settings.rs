//! Moderation settings snapshots.
//!
//! Readers get an `Arc` to an immutable snapshot. A refresh loads the new
//! document without holding any lock and then swaps the `Arc`, so no reader
//! ever sees a half-updated policy.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::models::ModerationSettings;

#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> anyhow::Result<ModerationSettings>;
}

/// Fetches the settings document from the published site.
pub struct HttpSettingsSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSettingsSource {
    pub fn new(site_url: &str, path: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}/{}", site_url.trim_end_matches('/'), path.trim_start_matches('/'));
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SettingsSource for HttpSettingsSource {
    async fn load(&self) -> anyhow::Result<ModerationSettings> {
        let resp = self.client.get(&self.url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            // no settings published: nothing banned, no approval required
            return Ok(ModerationSettings::default());
        }
        let resp = resp.error_for_status()?;
        Ok(resp.json::<ModerationSettings>().await?)
    }
}

/// Fixed settings, for deployments that configure policy in-process and for tests.
pub struct StaticSettings(pub ModerationSettings);

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn load(&self) -> anyhow::Result<ModerationSettings> {
        Ok(self.0.clone())
    }
}

struct Snapshot {
    settings: Arc<ModerationSettings>,
    loaded_at: Instant,
}

pub struct SettingsCache {
    source: Arc<dyn SettingsSource>,
    ttl: Duration,
    current: RwLock<Option<Snapshot>>,
    refreshing: Mutex<()>,
}

impl SettingsCache {
    pub fn new(source: Arc<dyn SettingsSource>, ttl: Duration) -> Self {
        Self { source, ttl, current: RwLock::new(None), refreshing: Mutex::new(()) }
    }

    pub fn fixed(settings: ModerationSettings) -> Self {
        Self::new(Arc::new(StaticSettings(settings)), Duration::MAX)
    }

    async fn fresh(&self) -> Option<Arc<ModerationSettings>> {
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|s| s.loaded_at.elapsed() < self.ttl)
            .map(|s| s.settings.clone())
    }

    async fn stale(&self) -> Option<Arc<ModerationSettings>> {
        self.current.read().await.as_ref().map(|s| s.settings.clone())
    }

    /// Current policy, loading it first when missing or expired.
    ///
    /// Only one caller loads at a time. While a load is in flight the others
    /// get the expired snapshot, and wait for the load only when there has
    /// never been one.
    pub async fn snapshot(&self) -> Arc<ModerationSettings> {
        if let Some(s) = self.fresh().await {
            return s;
        }
        let _refresh = match self.refreshing.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(s) = self.stale().await {
                    return s;
                }
                self.refreshing.lock().await
            }
        };
        if let Some(s) = self.fresh().await {
            return s;
        }
        self.refresh().await
    }

    /// Load unconditionally. On failure the previous snapshot stays in place
    /// (defaults when there never was one) and is retried after the next ttl.
    pub async fn refresh(&self) -> Arc<ModerationSettings> {
        let loaded = self.source.load().await;
        let mut guard = self.current.write().await;
        let settings = match loaded {
            Ok(settings) => {
                debug!(?settings, "moderation settings loaded");
                Arc::new(settings)
            }
            Err(e) => {
                warn!(error = %e, "failed to load moderation settings, keeping previous");
                guard.as_ref().map(|s| s.settings.clone()).unwrap_or_default()
            }
        };
        *guard = Some(Snapshot { settings: settings.clone(), loaded_at: Instant::now() });
        settings
    }
}
