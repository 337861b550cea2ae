use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::AuthError;

/// Where trusted signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Current key set, possibly cached.
    async fn keys(&self) -> Result<Arc<JwkSet>, AuthError>;

    /// Called once when a token names a key id the current set lacks.
    async fn refresh(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.keys().await
    }
}

/// Fixed key set, loaded once from JSON.
pub struct StaticJwks {
    keys: Arc<JwkSet>,
}

impl StaticJwks {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys: Arc::new(keys) }
    }

    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let keys: JwkSet = serde_json::from_str(raw)
            .map_err(|e| AuthError::KeysUnavailable(format!("invalid JWKS document: {}", e)))?;
        Ok(Self::new(keys))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AuthError::KeysUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }
}

#[async_trait]
impl KeySource for StaticJwks {
    async fn keys(&self) -> Result<Arc<JwkSet>, AuthError> {
        Ok(self.keys.clone())
    }
}

struct CachedKeys {
    fetched_at: Instant,
    keys: Arc<JwkSet>,
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Forced refreshes closer together than this reuse the cached set.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Issuer's `/.well-known/jwks.json`, cached for `ttl`.
pub struct RemoteJwks {
    url: url::Url,
    client: reqwest::Client,
    ttl: Duration,
    min_refresh: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl RemoteJwks {
    pub fn new(url: url::Url, ttl: Duration) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            ttl,
            min_refresh: MIN_REFRESH_INTERVAL,
            cache: RwLock::new(None),
        }
    }

    pub fn with_min_refresh(mut self, interval: Duration) -> Self {
        self.min_refresh = interval;
        self
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, AuthError> {
        let response = self
            .client
            .get(self.url.clone())
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("JWKS fetch from {} failed: {}", self.url, e);
                AuthError::KeysUnavailable(e.to_string())
            })?;

        let keys: JwkSet = response.json().await.map_err(|e| {
            warn!("JWKS from {} is not a valid key set: {}", self.url, e);
            AuthError::KeysUnavailable(e.to_string())
        })?;

        info!("Fetched {} signing key(s) from {}", keys.keys.len(), self.url);
        Ok(Arc::new(keys))
    }

    /// Returns the cached set if it is younger than `max_age`, otherwise
    /// fetches under the write lock so concurrent callers share one fetch.
    async fn load(&self, max_age: Duration) -> Result<Arc<JwkSet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.fetched_at.elapsed() < max_age) {
                return Ok(cached.keys.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.fetched_at.elapsed() < max_age) {
            return Ok(cached.keys.clone());
        }

        debug!("JWKS cache empty or older than {:?}, fetching", max_age);
        let keys = self.fetch().await?;
        *cache = Some(CachedKeys {
            fetched_at: Instant::now(),
            keys: keys.clone(),
        });
        Ok(keys)
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn keys(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.load(self.ttl).await
    }

    async fn refresh(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.load(self.min_refresh.min(self.ttl)).await
    }
}
