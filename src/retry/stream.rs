//! Retrying a lazily started stream
//!
//! An attempt is retried only while it has not yielded any event. Once output
//! reached the caller a failure is terminal, since replaying the request would
//! duplicate what was already delivered.

use backoff::backoff::Backoff;
use futures::StreamExt;

use super::policy::{RetryAttempt, RetryPolicy};
use crate::streaming::ChatStream;

/// Run `make_attempt` until a stream starts delivering, retrying per `policy`.
///
/// `make_attempt` is called once per attempt and must build the whole
/// pipeline (provision, send, normalize) lazily inside the returned stream.
pub fn retry_stream<F>(policy: RetryPolicy, mut make_attempt: F) -> ChatStream
where
    F: FnMut() -> ChatStream + Send + 'static,
{
    let s = async_stream::stream! {
        let mut backoff = policy.backoff();
        let mut retries = 0u32;

        loop {
            let mut inner = make_attempt();
            let mut delivered = false;
            let mut retry_delay = None;

            while let Some(item) = inner.next().await {
                match item {
                    Ok(event) => {
                        delivered = true;
                        yield Ok(event);
                    }
                    Err(error) if !delivered && policy.should_retry(&error, retries) => {
                        let delay = backoff.next_backoff().unwrap_or(policy.max_delay);
                        let attempt = RetryAttempt {
                            attempt: retries + 1,
                            delay,
                            error,
                        };
                        tracing::warn!(
                            attempt = attempt.attempt,
                            max_retries = policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            kind = %attempt.error.kind,
                            "request failed with a transient error; retrying"
                        );
                        policy.notify(&attempt);
                        retry_delay = Some(delay);
                        break;
                    }
                    Err(error) => {
                        if delivered && error.retryable {
                            tracing::debug!(kind = %error.kind, "stream failed after output was delivered; not retrying");
                        }
                        yield Err(error);
                        break;
                    }
                }
            }
            drop(inner);

            match retry_delay {
                Some(delay) => {
                    retries += 1;
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }
    };
    Box::pin(s)
}
