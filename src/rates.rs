//! Exchange-rate cache.
//!
//! Holds one immutable [`RateSnapshot`] behind an `Arc` and swaps it wholesale
//! on a successful refresh. Readers never wait on the network: a failed or
//! timed-out fetch only logs and leaves the previous snapshot in place.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::conversion::Rates;
use crate::errors::RemoteFetchError;
use crate::models::Currency;
use crate::storage::{self, Loaded};

/// The persisted rate document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub rates: Rates,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    pub base_currency: Currency,
}

impl RateSnapshot {
    pub fn defaults() -> Self {
        Self {
            rates: Rates::defaults(),
            last_updated: Some(OffsetDateTime::now_utc()),
            base_currency: Currency::BASE,
        }
    }

    pub fn is_stale(&self, now: OffsetDateTime, threshold: Duration) -> bool {
        match self.last_updated {
            None => true,
            Some(at) => now - at > threshold,
        }
    }
}

/// A remote "latest rates relative to base" endpoint.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Raw code-to-factor mapping for one unit of `base`.
    async fn latest(&self, base: Currency) -> Result<HashMap<String, f64>, RemoteFetchError>;
}

#[derive(Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

/// JSON endpoint whose body carries a top-level `rates` object. `{base}` in
/// the URL template is replaced by the base currency code.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    name: String,
    url_template: String,
    client: reqwest::Client,
}

impl HttpRateSource {
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            url_template: url_template.into(),
            client,
        })
    }

    pub fn url_for(&self, base: Currency) -> String {
        self.url_template.replace("{base}", base.code())
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn latest(&self, base: Currency) -> Result<HashMap<String, f64>, RemoteFetchError> {
        let body: LatestRatesResponse = self
            .client
            .get(self.url_for(base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.rates)
    }
}

/// Accept a remote response only if it prices every supported currency.
pub fn validate_response(raw: HashMap<String, f64>) -> Result<Rates, RemoteFetchError> {
    let mut rates = BTreeMap::new();
    let mut missing = Vec::new();

    for currency in Currency::ALL {
        if currency.is_base() {
            rates.insert(currency, 1.0);
            continue;
        }
        match raw.get(currency.code()) {
            None => missing.push(currency.code().to_string()),
            Some(&value) if !value.is_finite() || value <= 0.0 => {
                return Err(RemoteFetchError::InvalidRate {
                    code: currency.code().to_string(),
                    value,
                });
            }
            Some(&value) => {
                rates.insert(currency, value);
            }
        }
    }

    if !missing.is_empty() {
        return Err(RemoteFetchError::Incomplete(missing));
    }
    Ok(Rates::new(rates))
}

#[derive(Debug, Clone)]
pub struct RateCacheSettings {
    pub path: PathBuf,
    pub staleness: Duration,
    pub fetch_timeout: StdDuration,
}

pub struct RateCache {
    path: PathBuf,
    staleness: Duration,
    fetch_timeout: StdDuration,
    sources: Vec<Box<dyn RateSource>>,
    snapshot: RwLock<Arc<RateSnapshot>>,
    refresh_gate: Mutex<()>,
    /// Completed refresh attempts, successful or not.
    attempts: AtomicU64,
}

impl RateCache {
    /// Load the persisted snapshot, or install and persist the defaults when
    /// it is missing or unreadable. `secondary` is only consulted when
    /// `primary` fails.
    pub fn initialize(
        settings: RateCacheSettings,
        primary: Box<dyn RateSource>,
        secondary: Option<Box<dyn RateSource>>,
    ) -> Self {
        let RateCacheSettings {
            path,
            staleness,
            fetch_timeout,
        } = settings;

        let loaded = match storage::read_json::<RateSnapshot>(&path) {
            Ok(Loaded::Found(snapshot)) if snapshot.base_currency == Currency::BASE => {
                Some(RateSnapshot {
                    rates: snapshot.rates.with_fallbacks(),
                    last_updated: snapshot.last_updated,
                    base_currency: snapshot.base_currency,
                })
            }
            Ok(Loaded::Found(snapshot)) => {
                tracing::warn!(
                    base = %snapshot.base_currency,
                    "persisted rates use a different base currency, ignoring them"
                );
                None
            }
            Ok(Loaded::Missing) => None,
            Ok(Loaded::Malformed(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "rate file is malformed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read rate file");
                None
            }
        };

        let snapshot = match loaded {
            Some(snapshot) => snapshot,
            None => {
                let defaults = RateSnapshot::defaults();
                tracing::info!("installing default exchange rates");
                if let Err(e) = storage::write_json_atomic(&path, &defaults) {
                    tracing::warn!(error = %e, "failed to persist default rates");
                }
                defaults
            }
        };

        let mut sources = vec![primary];
        sources.extend(secondary);

        Self {
            path,
            staleness,
            fetch_timeout,
            sources,
            snapshot: RwLock::new(Arc::new(snapshot)),
            refresh_gate: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    /// The snapshot held right now, without attempting a refresh.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    pub fn is_stale(&self) -> bool {
        self.snapshot().is_stale(OffsetDateTime::now_utc(), self.staleness)
    }

    /// Current rates, refreshed first if they are stale.
    pub async fn get_rates(&self) -> Rates {
        self.refresh_if_stale().await;
        self.snapshot().rates.clone()
    }

    /// Returns whether this call attempted a refresh. Callers that queued
    /// behind another attempt take its outcome instead of fetching again.
    pub async fn refresh_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }
        let seen = self.attempts.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;
        if self.attempts.load(Ordering::Acquire) != seen || !self.is_stale() {
            return false;
        }
        self.refresh_locked().await;
        true
    }

    /// Fetch now regardless of age. Returns whether a source succeeded.
    pub async fn force_refresh(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let refreshed = self.fetch_from_sources().await;
        self.attempts.fetch_add(1, Ordering::Release);
        refreshed
    }

    async fn fetch_from_sources(&self) -> bool {
        for source in &self.sources {
            let outcome =
                match tokio::time::timeout(self.fetch_timeout, source.latest(Currency::BASE)).await
                {
                    Ok(response) => response.and_then(validate_response),
                    Err(_) => Err(RemoteFetchError::Timeout(self.fetch_timeout)),
                };

            match outcome {
                Ok(rates) => {
                    tracing::info!(source = source.name(), ?rates, "exchange rates updated");
                    self.install(RateSnapshot {
                        rates,
                        last_updated: Some(OffsetDateTime::now_utc()),
                        base_currency: Currency::BASE,
                    });
                    return true;
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "rate fetch failed");
                }
            }
        }

        tracing::warn!("all rate sources failed, keeping cached exchange rates");
        false
    }

    fn install(&self, snapshot: RateSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot.clone();

        if let Err(e) = storage::write_json_atomic(&self.path, snapshot.as_ref()) {
            tracing::warn!(error = %e, "failed to persist exchange rates");
        }
    }

    pub fn convert(&self, amount_in_base: f64, target: Currency) -> f64 {
        self.snapshot().rates.convert(amount_in_base, target)
    }

    /// Periodically refresh stale rates in the background.
    pub fn spawn_refresh_worker(self: Arc<Self>, period: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if self.refresh_if_stale().await {
                    tracing::debug!("background rate refresh attempted");
                }
            }
        })
    }
}
