//! # Sense Cache
//!
//! Crash-recoverable memoizing cache in front of the disambiguation RPC.
//!
//! ## Shape
//!
//! ```text
//! caller ──> MemoizingCache::get(text)
//!              │ hit: shared Arc, no remote call
//!              │ miss: single-flight computation
//!              │         └─> RetryingInvoker ──> remote service
//!              │         └─> EntryStore.append (durable log)
//!              └─> replayed from EntryStore at startup
//! ```
//!
//! Per key, the remote computation runs at most once concurrently; all
//! concurrent callers share the outcome. A bounded LRU holds completed
//! entries; the durable per-entry log survives crashes and warms the next
//! process start.
//!
//! ## Example
//!
//! ```no_run
//! use sense_cache::{CacheConfig, MemoizingCache};
//! use sense_client::{Authorization, HttpTransport, RetryPolicy, RetryingInvoker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new("https://api.example.com/disambiguate")?);
//!     let invoker = RetryingInvoker::new(transport, Authorization::Public, RetryPolicy::default());
//!     let config = CacheConfig {
//!         store_dir: Some("cache.dir".into()),
//!         ..CacheConfig::default()
//!     };
//!     let cache = MemoizingCache::new(invoker, config)?;
//!
//!     let result = cache.get("dish, very hot fat").await?;
//!     println!("{} sentences", result.sentences().len());
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod store;

pub use cache::{CacheConfig, MemoizingCache};
pub use error::{CacheError, Result};
pub use store::EntryStore;
