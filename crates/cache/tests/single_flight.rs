use async_trait::async_trait;
use sense_cache::{CacheConfig, CacheError, MemoizingCache};
use sense_client::{
    Authorization, ClientError, DisambiguationTransport, RetryPolicy, RetryingInvoker,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BODY: &str = r#"[{"terms": [{"lemma": "hello", "word": "hello", "POS": "UH", "meanings": []}, {"lemma": "world", "word": "world", "POS": "NN", "meanings": [{"definition": "everything that exists anywhere", "meaning": "universe_n_01"}, {"definition": "people in general", "meaning": "world_n_02"}, {"definition": "all of your experiences", "meaning": "world_n_03"}]}], "scores": [0.33333340921091204, 0.33333334712849727, 0.33333324366059075]}]"#;

/// Counts remote invocations; optionally fails the first N calls and holds
/// each call open for a configurable delay.
struct CountingTransport {
    calls: AtomicUsize,
    failures_before_success: usize,
    delay: Duration,
}

impl CountingTransport {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_before_success: 0,
            delay: Duration::ZERO,
        }
    }

    fn failing_first(failures_before_success: usize) -> Self {
        Self {
            failures_before_success,
            ..Self::new()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DisambiguationTransport for CountingTransport {
    async fn call(&self, _auth: &Authorization, _text: &str) -> sense_client::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.failures_before_success {
            return Err(ClientError::Other(format!("transient failure {call}")));
        }
        Ok(BODY.to_string())
    }
}

fn single_attempt_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    }
}

fn cache_over(
    transport: Arc<CountingTransport>,
    config: CacheConfig,
) -> MemoizingCache<CountingTransport> {
    let invoker = RetryingInvoker::new(transport, Authorization::Public, single_attempt_policy());
    MemoizingCache::new(invoker, config).expect("memory-only cache construction cannot fail")
}

#[tokio::test]
async fn repeated_gets_invoke_the_server_once() {
    let transport = Arc::new(CountingTransport::new());
    let cache = cache_over(transport.clone(), CacheConfig::default());

    let first = cache.get("hello world").await.expect("computes");
    for _ in 0..4 {
        let again = cache.get("hello world").await.expect("cached");
        assert!(Arc::ptr_eq(&first, &again));
    }

    assert_eq!(1, transport.calls());
}

#[tokio::test]
async fn hammering_a_few_keys_invokes_the_server_once_per_key() {
    let transport = Arc::new(CountingTransport::new());
    let config = CacheConfig {
        max_entries: 10,
        ..CacheConfig::default()
    };
    let cache = cache_over(transport.clone(), config);

    // Must stay well under capacity to avoid evictions.
    let distinct_keys = 8;
    for i in 0..100_000 {
        let text = format!("hello world {}", i % distinct_keys);
        cache.get(&text).await.expect("computes or hits");
    }

    assert_eq!(distinct_keys, transport.calls());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_inflight_computation() {
    let transport = Arc::new(CountingTransport::slow(Duration::from_millis(50)));
    let cache = Arc::new(cache_over(transport.clone(), CacheConfig::default()));

    let mut handles = Vec::new();
    for i in 0..100 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.get(&format!("hello world {}", i % 8)).await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("shared result");
    }

    assert_eq!(8, transport.calls());
}

#[tokio::test]
async fn a_failed_computation_does_not_poison_the_key() {
    let transport = Arc::new(CountingTransport::failing_first(1));
    let cache = cache_over(transport.clone(), CacheConfig::default());

    let err = cache.get("hello world").await.expect_err("first try fails");
    assert!(matches!(err, CacheError::Disambiguation(_)));

    cache
        .get("hello world")
        .await
        .expect("key stayed retryable");
    assert_eq!(2, transport.calls());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waiters_observe_the_shared_failure() {
    let transport = Arc::new(CountingTransport {
        calls: AtomicUsize::new(0),
        failures_before_success: usize::MAX,
        delay: Duration::from_millis(50),
    });
    let cache = Arc::new(cache_over(transport.clone(), CacheConfig::default()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get("hello world").await }));
    }
    for handle in handles {
        let outcome = handle.await.expect("task");
        assert!(matches!(outcome, Err(CacheError::Disambiguation(_))));
    }

    // One shared computation, one transport call (single-attempt policy).
    assert_eq!(1, transport.calls());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn eviction_makes_room_and_triggers_recomputation() {
    let transport = Arc::new(CountingTransport::new());
    let config = CacheConfig {
        max_entries: 2,
        ..CacheConfig::default()
    };
    let cache = cache_over(transport.clone(), config);

    cache.get("a").await.expect("computes");
    cache.get("b").await.expect("computes");
    cache.get("c").await.expect("computes, evicting a");
    assert_eq!(2, cache.len());

    cache.get("a").await.expect("recomputes");
    assert_eq!(4, transport.calls());
}

#[tokio::test]
async fn expired_entries_are_treated_as_misses() {
    let transport = Arc::new(CountingTransport::new());
    let config = CacheConfig {
        entry_ttl: Duration::ZERO,
        ..CacheConfig::default()
    };
    let cache = cache_over(transport.clone(), config);

    cache.get("hello world").await.expect("computes");
    cache.get("hello world").await.expect("recomputes");
    assert_eq!(2, transport.calls());
}
