use crate::error::{CacheError, Result};
use crate::store::EntryStore;
use lru::LruCache;
use sense_client::{DisambiguationTransport, RetryingInvoker};
use sense_model::DisambiguationResult;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of completed entries held in memory; least recently
    /// used entries are evicted beyond this.
    pub max_entries: usize,
    /// Expected number of concurrent callers. A sizing hint for internal
    /// tables, not a correctness parameter.
    pub concurrency_hint: usize,
    /// Absolute entry lifetime, checked on hit. Generous on purpose: the
    /// real eviction pressure is the size bound.
    pub entry_ttl: Duration,
    /// Directory for the durable entry log. `None` keeps the cache
    /// memory-only: nothing is persisted or replayed.
    pub store_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            concurrency_hint: 4,
            entry_ttl: 365 * DAY,
            store_dir: None,
        }
    }
}

/// Outcome of one shared computation, delivered to every waiter.
type FlightOutcome = std::result::Result<Arc<DisambiguationResult>, Arc<sense_client::ClientError>>;
type FlightReceiver = watch::Receiver<Option<FlightOutcome>>;

struct CachedEntry {
    value: Arc<DisambiguationResult>,
    stored_at: Instant,
}

struct CacheState {
    entries: LruCache<String, CachedEntry>,
    inflight: HashMap<String, FlightReceiver>,
}

/// Memoizing front for the retrying invoker.
///
/// Guarantees per key: the expensive remote computation runs at most once
/// concurrently; every caller of one computation receives the same result by
/// reference (or the same terminal failure); a failed computation never
/// poisons the key, which stays absent and retryable.
///
/// The computation runs on a spawned task, so a caller that abandons its
/// `get` future cannot cancel the work other waiters share. Keys are only
/// inserted once complete; eviction therefore only ever removes completed
/// entries, and an in-flight computation repopulates its key regardless of
/// eviction racing it.
pub struct MemoizingCache<T: ?Sized> {
    invoker: Arc<RetryingInvoker<T>>,
    state: Arc<Mutex<CacheState>>,
    store: Option<Arc<EntryStore>>,
    entry_ttl: Duration,
}

impl<T: ?Sized> std::fmt::Debug for MemoizingCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizingCache")
            .field("entry_ttl", &self.entry_ttl)
            .finish_non_exhaustive()
    }
}

impl<T: DisambiguationTransport + ?Sized + 'static> MemoizingCache<T> {
    /// Builds the cache and, when a store directory is configured, replays
    /// the durable log into memory (first record for a key wins).
    pub fn new(invoker: RetryingInvoker<T>, config: CacheConfig) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        let mut state = CacheState {
            entries: LruCache::new(capacity),
            inflight: HashMap::with_capacity(config.concurrency_hint),
        };

        let store = match &config.store_dir {
            Some(dir) => {
                let store = EntryStore::open(dir)?;
                let mut loaded = 0usize;
                for (key, value) in store.replay()? {
                    if state.entries.contains(&key) {
                        continue;
                    }
                    state.entries.put(
                        key,
                        CachedEntry {
                            value: Arc::new(value),
                            stored_at: Instant::now(),
                        },
                    );
                    loaded += 1;
                }
                log::info!(
                    "loaded {loaded} cache entries from '{}'",
                    store.dir().display()
                );
                Some(Arc::new(store))
            }
            None => None,
        };

        Ok(Self {
            invoker: Arc::new(invoker),
            state: Arc::new(Mutex::new(state)),
            store,
            entry_ttl: config.entry_ttl,
        })
    }

    /// Returns the memoized result for `text`, computing it remotely (once,
    /// shared across concurrent callers) on a miss.
    pub async fn get(&self, text: &str) -> Result<Arc<DisambiguationResult>> {
        let mut rx = {
            let mut state = self.lock_state();

            match state.entries.get(text) {
                Some(entry) if entry.stored_at.elapsed() < self.entry_ttl => {
                    return Ok(entry.value.clone());
                }
                Some(_) => {
                    // Expired: treat as a miss and recompute.
                    state.entries.pop(text);
                }
                None => {}
            }

            match state.inflight.get(text) {
                Some(rx) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.inflight.insert(text.to_string(), rx.clone());
                    self.spawn_computation(text.to_string(), tx);
                    rx
                }
            }
        };

        loop {
            let outcome = rx.borrow_and_update().clone();
            if let Some(outcome) = outcome {
                return outcome.map_err(CacheError::Disambiguation);
            }
            if rx.changed().await.is_err() {
                // The computing task died without publishing (panic); the
                // key is absent again and a later call may retry.
                return Err(CacheError::Other(format!(
                    "disambiguation of '{text}' was abandoned before completion"
                )));
            }
        }
    }

    /// Number of completed entries currently held in memory.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_computation(&self, text: String, tx: watch::Sender<Option<FlightOutcome>>) {
        let invoker = self.invoker.clone();
        let state = self.state.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            let outcome: FlightOutcome = match invoker.invoke(&text).await {
                Ok(result) => {
                    let value = Arc::new(result);
                    // Durability before publication, but never at the cost of
                    // availability: a failed write is logged and the
                    // in-memory value is served regardless.
                    if let Some(store) = &store {
                        if let Err(err) = store.append(&text, &value) {
                            log::warn!("failed to persist cache entry for '{text}': {err}");
                        }
                    }
                    Ok(value)
                }
                Err(err) => Err(Arc::new(err)),
            };

            {
                let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                state.inflight.remove(&text);
                if let Ok(value) = &outcome {
                    state.entries.put(
                        text.clone(),
                        CachedEntry {
                            value: value.clone(),
                            stored_at: Instant::now(),
                        },
                    );
                }
            }

            let _ = tx.send(Some(outcome));
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // The lock is only ever held for table lookups, never across await
        // points or computations.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
