use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::instrument::Instrument;
use super::reference::reference_instruments;
use crate::error::AllocationError;
use crate::AllocationResult;

/// Default bound on a single provider fetch.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of investable instruments. Implementations may block (file or
/// network reads); the cache runs them off the calling thread.
pub trait UniverseProvider: Send + Sync {
    /// Short label used in logs and result assumptions.
    fn name(&self) -> &str;

    /// Fetch the full instrument list. Failures should be reported as
    /// [`AllocationError::DataUnavailable`].
    fn load_universe(&self) -> AllocationResult<Vec<Instrument>>;
}

/// Provider over an already materialised list (JSON input, stdin, tests).
#[derive(Debug, Clone)]
pub struct StaticUniverse {
    label: String,
    instruments: Vec<Instrument>,
}

impl StaticUniverse {
    pub fn new(label: impl Into<String>, instruments: Vec<Instrument>) -> Self {
        StaticUniverse {
            label: label.into(),
            instruments,
        }
    }
}

impl UniverseProvider for StaticUniverse {
    fn name(&self) -> &str {
        &self.label
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        if self.instruments.is_empty() {
            return Err(AllocationError::DataUnavailable(format!(
                "{}: no instruments supplied",
                self.label
            )));
        }
        Ok(self.instruments.clone())
    }
}

/// Where the instruments of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseSource {
    Provider,
    Fallback,
}

/// One loaded universe, shared read-only between requests.
#[derive(Debug, Clone)]
pub struct UniverseSnapshot {
    pub instruments: Arc<Vec<Instrument>>,
    pub source: UniverseSource,
    pub provider: String,
    pub loaded_at: DateTime<Utc>,
    /// Why the provider result was discarded, when `source` is `Fallback`.
    pub fallback_reason: Option<String>,
}

/// Load-once cache in front of a [`UniverseProvider`].
///
/// The first read triggers a bounded fetch. A failed, timed-out, empty or
/// malformed fetch is replaced by the fallback list (the reference universe
/// unless overridden) so callers always get instruments. The snapshot is kept
/// until [`invalidate`](Self::invalidate) / [`reload`](Self::reload) is called
/// or, if configured, until it is older than `max_age`.
pub struct UniverseCache {
    provider: Arc<dyn UniverseProvider>,
    fallback: Vec<Instrument>,
    timeout: Duration,
    max_age: Option<chrono::Duration>,
    snapshot: Option<UniverseSnapshot>,
}

impl UniverseCache {
    pub fn new(provider: Arc<dyn UniverseProvider>) -> Self {
        UniverseCache {
            provider,
            fallback: reference_instruments(),
            timeout: DEFAULT_LOAD_TIMEOUT,
            max_age: None,
            snapshot: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_fallback(mut self, fallback: Vec<Instrument>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Current snapshot, loading it first if absent or expired.
    pub fn get(&mut self) -> &UniverseSnapshot {
        if self.is_stale() {
            self.snapshot = None;
        }
        let snapshot = match self.snapshot.take() {
            Some(s) => s,
            None => self.load_snapshot(),
        };
        self.snapshot.insert(snapshot)
    }

    /// Drop the cached snapshot; the next [`get`](Self::get) refetches.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// Drop the cached snapshot and fetch a new one immediately.
    pub fn reload(&mut self) -> &UniverseSnapshot {
        self.invalidate();
        self.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    fn is_stale(&self) -> bool {
        match (&self.snapshot, self.max_age) {
            (Some(snap), Some(max_age)) => Utc::now() - snap.loaded_at > max_age,
            _ => false,
        }
    }

    fn load_snapshot(&self) -> UniverseSnapshot {
        let provider = self.provider.name().to_string();
        match self.fetch().and_then(validate_universe) {
            Ok(instruments) => {
                tracing::debug!(provider = %provider, count = instruments.len(), "universe loaded");
                UniverseSnapshot {
                    instruments: Arc::new(instruments),
                    source: UniverseSource::Provider,
                    provider,
                    loaded_at: Utc::now(),
                    fallback_reason: None,
                }
            }
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "universe provider failed; using fallback universe");
                UniverseSnapshot {
                    instruments: Arc::new(self.fallback.clone()),
                    source: UniverseSource::Fallback,
                    provider,
                    loaded_at: Utc::now(),
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Run the provider on a worker thread and wait at most `timeout`.
    /// A provider that overruns is abandoned; its eventual result is dropped.
    fn fetch(&self) -> AllocationResult<Vec<Instrument>> {
        let provider = Arc::clone(&self.provider);
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("universe-loader".into())
            .spawn(move || {
                let _ = tx.send(provider.load_universe());
            })
            .map_err(|e| {
                AllocationError::DataUnavailable(format!("could not start loader thread: {}", e))
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(AllocationError::DataUnavailable(format!(
                "{} did not respond within {} ms",
                self.provider.name(),
                self.timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(AllocationError::DataUnavailable(format!(
                "{} loader exited without a result",
                self.provider.name()
            ))),
        }
    }
}

fn validate_universe(instruments: Vec<Instrument>) -> AllocationResult<Vec<Instrument>> {
    if instruments.is_empty() {
        return Err(AllocationError::DataUnavailable(
            "provider returned an empty universe".into(),
        ));
    }
    for (i, inst) in instruments.iter().enumerate() {
        inst.validate(i)
            .map_err(|e| AllocationError::DataUnavailable(e.to_string()))?;
    }
    Ok(instruments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::instrument::Sector;
    use crate::universe::reference::ReferenceUniverse;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider;

    impl UniverseProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
            Err(AllocationError::DataUnavailable("connection refused".into()))
        }
    }

    struct SlowProvider;

    impl UniverseProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }
        fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
            thread::sleep(Duration::from_millis(500));
            Ok(vec![one_instrument()])
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl UniverseProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }
        fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![one_instrument()])
        }
    }

    fn one_instrument() -> Instrument {
        Instrument::new("ONE", Sector::Energy, dec!(100), dec!(0.1), dec!(0.1))
    }

    #[test]
    fn test_provider_result_is_used() {
        let mut cache = UniverseCache::new(Arc::new(ReferenceUniverse));
        let snap = cache.get();
        assert_eq!(snap.source, UniverseSource::Provider);
        assert_eq!(snap.instruments.len(), 15);
    }

    #[test]
    fn test_failure_falls_back_to_reference() {
        let mut cache = UniverseCache::new(Arc::new(FailingProvider));
        let snap = cache.get();
        assert_eq!(snap.source, UniverseSource::Fallback);
        assert_eq!(snap.instruments.len(), 15);
        assert!(snap
            .fallback_reason
            .as_deref()
            .unwrap_or_default()
            .contains("connection refused"));
    }

    #[test]
    fn test_timeout_falls_back() {
        let mut cache =
            UniverseCache::new(Arc::new(SlowProvider)).with_timeout(Duration::from_millis(20));
        let snap = cache.get();
        assert_eq!(snap.source, UniverseSource::Fallback);
    }

    #[test]
    fn test_empty_static_universe_falls_back() {
        let mut cache = UniverseCache::new(Arc::new(StaticUniverse::new("empty", vec![])));
        assert_eq!(cache.get().source, UniverseSource::Fallback);
    }

    #[test]
    fn test_malformed_instrument_falls_back() {
        let bad = Instrument::new("BAD", Sector::Energy, dec!(-1), dec!(0.1), dec!(0.1));
        let mut cache = UniverseCache::new(Arc::new(StaticUniverse::new("bad", vec![bad])));
        assert_eq!(cache.get().source, UniverseSource::Fallback);
    }

    #[test]
    fn test_loads_once_until_invalidated() {
        let provider = Arc::new(CountingProvider::default());
        let mut cache = UniverseCache::new(provider.clone());
        cache.get();
        cache.get();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        cache.invalidate();
        assert!(!cache.is_loaded());
        cache.get();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        cache.reload();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_expired_snapshot_reloads() {
        let provider = Arc::new(CountingProvider::default());
        let mut cache = UniverseCache::new(provider.clone()).with_max_age(chrono::Duration::zero());
        cache.get();
        thread::sleep(Duration::from_millis(5));
        cache.get();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
