//! JWKS caching with lazy, time-based refresh.
//!
//! The cache never refreshes on its own. Callers on the validation path ask
//! it to [`refresh_if_stale`](JwksCache::refresh_if_stale); the first caller
//! after the deadline performs the download while concurrent callers wait on
//! the refresh gate and reuse that outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jwks_observability::{JwksMetrics, OUTCOME_OK};
use reqwest::StatusCode;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::client::JwksClient;
use crate::error::{AuthError, AuthResult};
use crate::jwk::{Jwk, JwkSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// No successful refresh yet.
    Stale,
    Until(Instant),
    /// The refresh interval does not fit on the monotonic clock.
    Forever,
}

impl Freshness {
    fn after(now: Instant, interval: Duration) -> Self {
        match now.checked_add(interval) {
            Some(deadline) => Freshness::Until(deadline),
            None => Freshness::Forever,
        }
    }
}

struct CacheState {
    keys: Arc<JwkSet>,
    freshness: Freshness,
    /// Completed refresh attempts, successful or not.
    attempts: u64,
    last_failure: Option<AuthError>,
}

impl CacheState {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.freshness {
            Freshness::Stale => false,
            Freshness::Until(deadline) => now < deadline,
            Freshness::Forever => true,
        }
    }
}

pub struct JwksCache<C> {
    client: C,
    url: String,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
    refresh_gate: Mutex<()>,
    metrics: JwksMetrics,
}

impl<C> JwksCache<C>
where
    C: JwksClient,
{
    pub fn new(client: C, url: impl Into<String>, refresh_interval: Duration) -> Self {
        Self::with_metrics(client, url, refresh_interval, JwksMetrics::new())
    }

    pub fn with_metrics(
        client: C,
        url: impl Into<String>,
        refresh_interval: Duration,
        metrics: JwksMetrics,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            refresh_interval,
            state: RwLock::new(CacheState {
                keys: Arc::new(JwkSet::default()),
                freshness: Freshness::Stale,
                attempts: 0,
                last_failure: None,
            }),
            refresh_gate: Mutex::new(()),
            metrics,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn metrics(&self) -> &JwksMetrics {
        &self.metrics
    }

    /// Snapshot of the current key set.
    pub async fn keys(&self) -> Arc<JwkSet> {
        self.state.read().await.keys.clone()
    }

    /// Deadline after which the next call to `refresh_if_stale` downloads again.
    ///
    /// `None` before the first successful refresh, and also when the interval
    /// is too large to schedule, in which case the keys never go stale.
    pub async fn next_refresh(&self) -> Option<Instant> {
        match self.state.read().await.freshness {
            Freshness::Until(deadline) => Some(deadline),
            Freshness::Stale | Freshness::Forever => None,
        }
    }

    /// First key whose `kid` matches, from the current snapshot.
    pub async fn get_by_kid(&self, kid: &str) -> Option<Jwk> {
        self.state.read().await.keys.find(kid).cloned()
    }

    /// Downloads the key set if the refresh deadline has passed.
    ///
    /// # Errors
    ///
    /// `JwksFetch` for transport failures and non-200 responses, `JwksDecode`
    /// for a body that is not a JWKS document. On error the cached keys are
    /// left as they were.
    pub async fn refresh_if_stale(&self) -> AuthResult<()> {
        let observed = {
            let state = self.state.read().await;
            if state.is_fresh(Instant::now()) {
                self.metrics.cache_hits.inc();
                return Ok(());
            }
            state.attempts
        };

        let _gate = self.refresh_gate.lock().await;

        {
            let state = self.state.read().await;
            if state.attempts != observed {
                // another caller finished an attempt while we waited
                debug!(url = %self.url, "reusing concurrent JWKS refresh outcome");
                return match &state.last_failure {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                };
            }
        }

        let started = Instant::now();
        let outcome = self.fetch().await;
        self.metrics
            .refresh_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        let mut state = self.state.write().await;
        state.attempts += 1;
        match outcome {
            Ok(set) => {
                let count = set.len();
                state.keys = Arc::new(set);
                state.freshness = Freshness::after(Instant::now(), self.refresh_interval);
                state.last_failure = None;
                self.metrics.keys_loaded.set(count as i64);
                self.metrics.record_refresh(OUTCOME_OK);
                info!(url = %self.url, count, "refreshed JWKS");
                Ok(())
            }
            Err(err) => {
                warn!(url = %self.url, error = %err, "JWKS refresh failed, keeping cached keys");
                self.metrics.record_refresh(err.code());
                state.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> AuthResult<JwkSet> {
        debug!("fetching JWKS");
        let response = self.client.get(&self.url).await?;

        if response.status != StatusCode::OK {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from {}",
                response.status, self.url
            )));
        }

        serde_json::from_slice::<JwkSet>(&response.body)
            .map_err(|err| AuthError::JwksDecode(err.to_string()))
    }
}
