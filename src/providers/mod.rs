//! Provider implementations

pub mod azure;
