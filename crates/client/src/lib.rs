//! # Sense Client
//!
//! Transport binding for the remote disambiguation service.
//!
//! The service itself is opaque: one idempotent RPC takes a short text span
//! and returns a JSON analysis. This crate models that boundary as the
//! [`DisambiguationTransport`] trait (with a production HTTP implementation)
//! and wraps it in a [`RetryingInvoker`] that converts transient transport
//! and decode failures into bounded retries with a constant delay.
//!
//! ## Example
//!
//! ```no_run
//! use sense_client::{Authorization, HttpTransport, RetryPolicy, RetryingInvoker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sense_client::Result<()> {
//!     let transport = Arc::new(HttpTransport::new("https://api.example.com/disambiguate")?);
//!     let auth = Authorization::QueryParams {
//!         customer_id: "id".into(),
//!         api_key: "key".into(),
//!     };
//!     let invoker = RetryingInvoker::new(transport, auth, RetryPolicy::default());
//!
//!     let result = invoker.invoke("dish, very hot fat").await?;
//!     println!("{} sentences", result.sentences().len());
//!     Ok(())
//! }
//! ```

mod error;
mod invoker;
mod transport;

pub use error::{ClientError, Result};
pub use invoker::{InterruptPolicy, RetryPolicy, RetryingInvoker};
pub use transport::{Authorization, DisambiguationTransport, HttpTransport};
