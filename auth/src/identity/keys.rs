use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use reqwest::header::CACHE_CONTROL;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::errors::IdentityError;

/// A provider key set together with how long the provider says it may be cached.
#[derive(Debug, Clone)]
pub struct FetchedKeys {
    pub keys: JwkSet,
    pub max_age: Option<Duration>,
}

/// Where a provider's public signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    /// Fetch the provider's current key set.
    ///
    /// # Errors
    /// * `UpstreamTimeout` - The provider did not answer in time
    /// * `KeyFetchFailed` - The provider answered with an error or garbage
    async fn fetch(&self) -> Result<FetchedKeys, IdentityError>;
}

/// Fetches a JWKS document over HTTPS.
pub struct HttpJwksSource {
    client: reqwest::Client,
    jwks_uri: String,
}

impl HttpJwksSource {
    /// Create a source for `jwks_uri`.
    ///
    /// # Errors
    /// * `KeyFetchFailed` - HTTP client could not be built
    pub fn new(jwks_uri: impl ToString, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::KeyFetchFailed(e.to_string()))?;

        Ok(Self {
            client,
            jwks_uri: jwks_uri.to_string(),
        })
    }
}

#[async_trait]
impl KeySource for HttpJwksSource {
    async fn fetch(&self) -> Result<FetchedKeys, IdentityError> {
        tracing::debug!(jwks_uri = %self.jwks_uri, "Fetching provider keys");

        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::UpstreamTimeout
                } else {
                    IdentityError::KeyFetchFailed(format!(
                        "request to '{}' failed: {}",
                        self.jwks_uri, e
                    ))
                }
            })?;

        if !response.status().is_success() {
            return Err(IdentityError::KeyFetchFailed(format!(
                "'{}' returned status {}",
                self.jwks_uri,
                response.status()
            )));
        }

        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_max_age);

        let keys: JwkSet = response.json().await.map_err(|e| {
            if e.is_timeout() {
                IdentityError::UpstreamTimeout
            } else {
                IdentityError::KeyFetchFailed(format!(
                    "invalid JWKS from '{}': {}",
                    self.jwks_uri, e
                ))
            }
        })?;

        Ok(FetchedKeys { keys, max_age })
    }
}

/// Serves a fixed key set. Used for pinned keys and in tests.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    /// Parse a JWKS JSON document.
    ///
    /// # Errors
    /// * `KeyFetchFailed` - Document is not a valid JWKS
    pub fn from_json(jwks: &str) -> Result<Self, IdentityError> {
        serde_json::from_str(jwks)
            .map(Self::new)
            .map_err(|e| IdentityError::KeyFetchFailed(format!("invalid JWKS: {}", e)))
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<FetchedKeys, IdentityError> {
        Ok(FetchedKeys {
            keys: self.keys.clone(),
            max_age: None,
        })
    }
}

/// Tuning for [`JwksCache`].
#[derive(Debug, Clone)]
pub struct JwksCacheOptions {
    /// Cache lifetime when the provider sends no `max-age`
    pub ttl: Duration,
    /// Deadline for one fetch attempt
    pub fetch_timeout: Duration,
    /// Pause before the single retry of a timed-out fetch
    pub retry_backoff: Duration,
    /// Unknown key ids do not trigger a fetch more often than this
    pub min_refresh_interval: Duration,
}

impl Default for JwksCacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(3),
            retry_backoff: Duration::from_millis(250),
            min_refresh_interval: Duration::from_secs(30),
        }
    }
}

struct CachedKeys {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Read-mostly cache of a provider's signing keys, indexed by `kid`.
///
/// Lookups only take the read lock. When the cache is stale or a `kid` is
/// unknown, one task fetches a new key set while the others wait on the
/// refresh mutex and then reuse its result, including its failure.
pub struct JwksCache {
    source: Arc<dyn KeySource>,
    options: JwksCacheOptions,
    keys: RwLock<Option<CachedKeys>>,
    refresh: Mutex<Option<FailedRefresh>>,
}

/// Outcome of the last refresh when it failed.
struct FailedRefresh {
    finished_at: Instant,
    error: IdentityError,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySource>, options: JwksCacheOptions) -> Self {
        Self {
            source,
            options,
            keys: RwLock::new(None),
            refresh: Mutex::new(None),
        }
    }

    /// Look up a signing key, refreshing the cache when needed.
    ///
    /// # Errors
    /// * `InvalidToken` - The provider does not publish this `kid`
    /// * `UpstreamTimeout` - Refresh timed out twice
    /// * `KeyFetchFailed` - Refresh failed
    pub async fn key(&self, kid: &str) -> Result<Jwk, IdentityError> {
        if let Some(jwk) = self.fresh_key(kid).await {
            return Ok(jwk);
        }

        let queued_at = Instant::now();
        let mut last_failure = self.refresh.lock().await;

        // Someone else may have refreshed while we waited for the mutex.
        {
            let cache = self.keys.read().await;
            if let Some(cached) = cache.as_ref() {
                let now = Instant::now();
                if now < cached.expires_at {
                    if let Some(jwk) = cached.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                    if now.duration_since(cached.fetched_at) < self.options.min_refresh_interval {
                        return Err(unknown_kid(kid));
                    }
                }
            }
        }

        self.refresh_or_reuse_failure(&mut last_failure, queued_at).await?;

        let cache = self.keys.read().await;
        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| unknown_kid(kid))
    }

    /// Force a refresh of the key set.
    ///
    /// # Returns
    /// Number of keys now cached
    pub async fn refresh(&self) -> Result<usize, IdentityError> {
        let queued_at = Instant::now();
        let mut last_failure = self.refresh.lock().await;
        self.refresh_or_reuse_failure(&mut last_failure, queued_at).await
    }

    // A refresh that failed after we queued for the mutex is our answer too,
    // so waiters behind a failing provider do not each fetch again.
    async fn refresh_or_reuse_failure(
        &self,
        last_failure: &mut Option<FailedRefresh>,
        queued_at: Instant,
    ) -> Result<usize, IdentityError> {
        if let Some(failed) = last_failure.as_ref() {
            if failed.finished_at >= queued_at {
                tracing::debug!(error = %failed.error, "Reusing failed provider key refresh");
                return Err(failed.error.clone());
            }
        }

        match self.refresh_locked().await {
            Ok(count) => {
                *last_failure = None;
                Ok(count)
            }
            Err(error) => {
                *last_failure = Some(FailedRefresh {
                    finished_at: Instant::now(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    async fn fresh_key(&self, kid: &str) -> Option<Jwk> {
        let cache = self.keys.read().await;
        cache
            .as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .and_then(|cached| cached.keys.get(kid).cloned())
    }

    // Caller must hold the refresh mutex.
    async fn refresh_locked(&self) -> Result<usize, IdentityError> {
        let fetched = self.fetch_with_retry().await?;

        let mut keys = HashMap::new();
        for jwk in fetched.keys.keys {
            if let Some(kid) = jwk.common.key_id.clone() {
                keys.insert(kid, jwk);
            }
        }

        let count = keys.len();
        let lifetime = fetched.max_age.unwrap_or(self.options.ttl);
        let now = Instant::now();

        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + lifetime,
        });

        tracing::info!(
            keys = count,
            lifetime_secs = lifetime.as_secs(),
            "Provider key cache refreshed"
        );

        Ok(count)
    }

    async fn fetch_with_retry(&self) -> Result<FetchedKeys, IdentityError> {
        match self.fetch_once().await {
            Err(IdentityError::UpstreamTimeout) => {
                tracing::warn!(
                    backoff_ms = self.options.retry_backoff.as_millis() as u64,
                    "Provider key fetch timed out, retrying once"
                );
                tokio::time::sleep(self.options.retry_backoff).await;
                self.fetch_once().await
            }
            result => result,
        }
    }

    async fn fetch_once(&self) -> Result<FetchedKeys, IdentityError> {
        tokio::time::timeout(self.options.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| IdentityError::UpstreamTimeout)?
    }
}

fn unknown_kid(kid: &str) -> IdentityError {
    IdentityError::invalid(format!("no provider key with kid '{}'", kid))
}

/// Extract `max-age` from a `Cache-Control` header value.
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
