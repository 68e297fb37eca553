//! Streaming primitives shared by providers

pub mod tool_calls;
pub mod types;

pub use tool_calls::{ToolCallFragment, ToolCallReassembler};
pub use types::{ChatStream, ChatStreamHandle};
