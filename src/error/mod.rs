//! Error Handling Module
//!
//! - `types`: raw `LlmError` produced by transport, parsing and validation
//! - `classify`: `ClassifiedError` taxonomy surfaced to callers
//!
//! # Example
//!
//! ```rust,ignore
//! use siumai_azure_stream::error::{classify, ClassifyContext, ErrorKind, LlmError};
//!
//! let err = classify(&LlmError::api_error(429, "slow down"), &ClassifyContext::default());
//! assert_eq!(err.kind, ErrorKind::RateLimited);
//! assert!(err.retryable);
//! ```

pub mod classify;
pub mod types;

pub use classify::*;
pub use types::*;
