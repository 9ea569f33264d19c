use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sense_cache::{CacheConfig, CacheError, MemoizingCache};
use sense_client::{
    Authorization, DisambiguationTransport, RetryPolicy, RetryingInvoker,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BODY: &str = r#"[{"terms": [{"lemma": "hello", "word": "hello", "POS": "UH", "meanings": []}, {"lemma": "world", "word": "world", "POS": "NN", "meanings": [{"definition": "everything that exists anywhere", "meaning": "universe_n_01"}, {"definition": "people in general", "meaning": "world_n_02"}, {"definition": "all of your experiences", "meaning": "world_n_03"}]}], "scores": [0.33333340921091204, 0.33333334712849727, 0.33333324366059075]}]"#;

struct CountingTransport {
    calls: AtomicUsize,
}

impl CountingTransport {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DisambiguationTransport for CountingTransport {
    async fn call(&self, _auth: &Authorization, _text: &str) -> sense_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(BODY.to_string())
    }
}

fn persistent_cache(
    transport: Arc<CountingTransport>,
    store_dir: &Path,
) -> sense_cache::Result<MemoizingCache<CountingTransport>> {
    let policy = RetryPolicy {
        delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    };
    let invoker = RetryingInvoker::new(transport, Authorization::Public, policy);
    let config = CacheConfig {
        max_entries: 10,
        store_dir: Some(store_dir.to_path_buf()),
        ..CacheConfig::default()
    };
    MemoizingCache::new(invoker, config)
}

fn entry_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .expect("read store dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("entry"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn computed_entries_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let keys = 8;

    let transport = Arc::new(CountingTransport::new());
    let cache = persistent_cache(transport.clone(), dir.path()).expect("construct");

    let mut originals = Vec::new();
    for i in 0..1_000 {
        let text = format!("hello world {}", i % keys);
        let result = cache.get(&text).await.expect("computes or hits");
        if i < keys {
            originals.push(result);
        }
    }
    assert_eq!(keys, transport.calls());
    assert_eq!(keys, entry_files(dir.path()).len());

    // A fresh process over the same directory serves from the replayed log.
    let restarted_transport = Arc::new(CountingTransport::new());
    let restarted =
        persistent_cache(restarted_transport.clone(), dir.path()).expect("construct");
    assert_eq!(keys, restarted.len());

    for (i, original) in originals.iter().enumerate() {
        let replayed = restarted
            .get(&format!("hello world {i}"))
            .await
            .expect("served from replay");
        assert_eq!(**original, *replayed);
    }
    assert_eq!(0, restarted_transport.calls());

    // Replay must not duplicate entry files either.
    assert_eq!(keys, entry_files(dir.path()).len());
}

#[tokio::test]
async fn corrupted_and_truncated_entries_are_skipped_at_startup() {
    let dir = tempfile::tempdir().expect("tempdir");

    let transport = Arc::new(CountingTransport::new());
    let cache = persistent_cache(transport.clone(), dir.path()).expect("construct");
    for i in 0..3 {
        cache.get(&format!("hello world {i}")).await.expect("computes");
    }

    // A file that was never an entry, and a partial write from a crash.
    std::fs::write(dir.path().join("0-garbage.entry"), b"not an entry at all")
        .expect("write garbage");
    let victim = entry_files(dir.path())
        .into_iter()
        .next_back()
        .expect("at least one valid entry");
    let bytes = std::fs::read(&victim).expect("read entry");
    std::fs::write(
        dir.path().join("1-truncated.entry"),
        &bytes[..bytes.len() / 2],
    )
    .expect("write truncated");

    let restarted_transport = Arc::new(CountingTransport::new());
    let restarted =
        persistent_cache(restarted_transport.clone(), dir.path()).expect("startup never fails");
    assert_eq!(3, restarted.len());

    restarted
        .get("hello world 0")
        .await
        .expect("valid entries replayed");
    assert_eq!(0, restarted_transport.calls());
}

#[tokio::test]
async fn a_store_path_that_is_not_a_directory_fails_construction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("cache.entry-store");
    std::fs::write(&file, b"x").expect("write");

    let err = persistent_cache(Arc::new(CountingTransport::new()), &file)
        .expect_err("configuration error is fatal");
    assert!(matches!(err, CacheError::NotADirectory(_)));
}

#[tokio::test]
async fn a_failed_persist_still_serves_the_computed_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_dir = dir.path().join("entries");

    let transport = Arc::new(CountingTransport::new());
    let cache = persistent_cache(transport.clone(), &store_dir).expect("construct");

    // Yank the directory out from under the running cache.
    std::fs::remove_dir_all(&store_dir).expect("remove store dir");

    // Losing durability is recoverable; losing availability is not.
    let result = cache.get("hello world").await.expect("value served");
    assert_eq!(1, result.sentences().len());
    assert_eq!(1, transport.calls());
}
