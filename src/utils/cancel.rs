//! Cancellation utilities
//!
//! Cancellation is cooperative: a wrapped stream checks the token between
//! pulls and also races it against a pending pull, so a blocked network read
//! is interrupted promptly. Stopping drops the inner stream, which closes the
//! HTTP response.

use tokio_util::sync::CancellationToken;

use crate::streaming::ChatStream;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Wrap an existing token, e.g. a child of the host's shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request cancellation. Wrapped streams end without a further item.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Make a ChatStream cancellable and return its cancel handle.
pub fn make_cancellable_stream(stream: ChatStream) -> (ChatStream, CancelHandle) {
    let handle = CancelHandle::new();
    let wrapped = cancellable_with_token(stream, handle.token.clone());
    (wrapped, handle)
}

/// Stop `stream` as soon as `token` is cancelled.
pub fn cancellable_with_token(stream: ChatStream, token: CancellationToken) -> ChatStream {
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("stream cancelled by caller");
                    break;
                }
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    Box::pin(s)
}
