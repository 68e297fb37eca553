//! Utilities

pub mod cancel;
pub mod image;

pub use cancel::{CancelHandle, cancellable_with_token, make_cancellable_stream};
