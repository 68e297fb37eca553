//! Core types shared by the adapter

pub mod capability;
pub mod chat;
pub mod http;
pub mod streaming;
pub mod tools;

pub use capability::{CapabilityRecord, PartialCapability};
pub use chat::{ContentPart, ImageSource, Message, Role, ToolCallRef};
pub use http::HttpConfig;
pub use streaming::{CompletedToolCall, StreamEvent, Usage};
pub use tools::ToolSchema;
