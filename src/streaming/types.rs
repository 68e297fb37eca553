//! Stream aliases handed to callers

use futures::Stream;
use std::pin::Pin;

use crate::error::ClassifiedError;
use crate::types::StreamEvent;

/// Pinned, boxed stream of normalized events.
///
/// The stream is lazy: no network traffic happens until it is first polled.
/// Dropping it releases the underlying HTTP response.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClassifiedError>> + Send>>;

/// Chat stream paired with a handle that can stop it from another task.
///
/// # Example
/// ```rust,no_run
/// # use siumai_azure_stream::prelude::*;
/// # async fn example(client: AzureChatClient) {
/// let handle = client.create_message_with_cancel("Be brief.", vec![Message::user("Hi")], None);
/// let cancel = handle.cancel.clone();
/// tokio::spawn(async move {
///     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
///     cancel.cancel();
/// });
/// # }
/// ```
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: crate::utils::cancel::CancelHandle,
}

impl std::fmt::Debug for ChatStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
