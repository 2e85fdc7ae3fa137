//! Wire types shared by the tabwright server and its clients.
//!
//! Everything here is serde-serializable with camelCase field names so the
//! NDJSON transport and tool schemas stay consistent on the wire.

mod cookie;
mod types;

pub use cookie::{Cookie, SameSite};
pub use types::{
	ContentBlock, LoadState, RequestEnvelope, ServerRequest, ServerResponse, StorageKind,
	ToolCallParams, ToolError, ToolInfo, ToolResult, WaitState,
};
