use crate::error::{ClientError, Result};
use crate::transport::{Authorization, DisambiguationTransport};
use sense_model::DisambiguationResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// What to do when an interrupt arrives during the backoff sleep.
///
/// The historical behavior is to treat the interrupt as "skip the rest of the
/// sleep and retry now" rather than abandoning the call; both are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptPolicy {
    #[default]
    ProceedToNextRetry,
    Abort,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first, i.e. up to `max_retries + 1`
    /// tries total.
    pub max_retries: u32,
    /// Constant delay between attempts; deliberately not exponential, the
    /// service rate-limits rather than collapses.
    pub delay: Duration,
    pub on_interrupt: InterruptPolicy,
    /// Request size bound in characters; longer inputs are rejected up front
    /// without burning retries.
    pub max_text_len: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(2_000),
            on_interrupt: InterruptPolicy::default(),
            max_text_len: 512,
        }
    }
}

/// Wraps the unreliable RPC with bounded, delayed retry, turning it into
/// either a decoded [`DisambiguationResult`] or a terminal error that carries
/// the text, the attempt count and the last underlying failure.
///
/// Transport failures and decode failures are treated the same: a retry may
/// well get a healthy response from a service that just served a mangled one.
pub struct RetryingInvoker<T: ?Sized> {
    transport: Arc<T>,
    auth: Authorization,
    policy: RetryPolicy,
    interrupt: Option<Arc<Notify>>,
}

impl<T: DisambiguationTransport + ?Sized> RetryingInvoker<T> {
    pub fn new(transport: Arc<T>, auth: Authorization, policy: RetryPolicy) -> Self {
        Self {
            transport,
            auth,
            policy,
            interrupt: None,
        }
    }

    /// Attach an interrupt signal observed during backoff sleeps; see
    /// [`InterruptPolicy`].
    pub fn with_interrupt(mut self, interrupt: Arc<Notify>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn invoke(&self, text: &str) -> Result<DisambiguationResult> {
        let len = text.chars().count();
        if len > self.policy.max_text_len {
            return Err(ClientError::TextTooLong {
                len,
                limit: self.policy.max_text_len,
            });
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match self.attempt(text).await {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };
            log::warn!("disambiguation attempt {attempts} failed for {len}-char text: {err}");

            if attempts > self.policy.max_retries {
                return Err(ClientError::RetriesExhausted {
                    text: text.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }
            self.wait_before_retry(text).await?;
        }
    }

    async fn attempt(&self, text: &str) -> Result<DisambiguationResult> {
        let body = self.transport.call(&self.auth, text).await?;
        Ok(DisambiguationResult::from_json(&body)?)
    }

    async fn wait_before_retry(&self, text: &str) -> Result<()> {
        let Some(interrupt) = &self.interrupt else {
            tokio::time::sleep(self.policy.delay).await;
            return Ok(());
        };

        tokio::select! {
            () = tokio::time::sleep(self.policy.delay) => Ok(()),
            () = interrupt.notified() => match self.policy.on_interrupt {
                InterruptPolicy::ProceedToNextRetry => Ok(()),
                InterruptPolicy::Abort => Err(ClientError::Interrupted {
                    text: text.to_string(),
                }),
            },
        }
    }
}
