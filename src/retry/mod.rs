//! Retry module
//! - policy.rs: bounded backoff policy over classified errors
//! - stream.rs: retrying a stream until it starts delivering events

pub mod policy;
pub mod stream;

pub use policy::*;
pub use stream::retry_stream;
