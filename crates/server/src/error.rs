use tabwright_driver::DriverError;
use tabwright_protocol::ToolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Arguments failed structural validation. Raised before any side effect.
	#[error("invalid argument `{field}`: {message}")]
	Validation { field: String, message: String },

	/// Tool name is not in the active set. Deliberately does not distinguish
	/// "does not exist" from "disabled by capability".
	#[error("unknown tool: {0}")]
	UnknownTool(String),

	#[error("no active tab")]
	NoActiveTab,

	#[error("frame not found: {0}")]
	FrameNotFound(String),

	#[error("element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("timeout after {ms}ms waiting for: {what}")]
	Timeout { what: String, ms: u64 },

	/// Driver-side failure, wrapped with the tool that produced it.
	#[error("{tool}: {source}")]
	Driver {
		tool: String,
		#[source]
		source: DriverError,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Validation {
			field: field.into(),
			message: message.into(),
		}
	}

	pub fn driver(tool: impl Into<String>, source: DriverError) -> Self {
		Self::Driver {
			tool: tool.into(),
			source,
		}
	}

	pub fn code(&self) -> &'static str {
		match self {
			Self::Validation { .. } => "INVALID_INPUT",
			Self::UnknownTool(_) => "UNKNOWN_TOOL",
			Self::NoActiveTab => "NO_ACTIVE_TAB",
			Self::FrameNotFound(_) => "FRAME_NOT_FOUND",
			Self::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
			Self::Timeout { .. } => "TIMEOUT",
			Self::Driver { .. } => "DRIVER_ERROR",
			Self::Io(_) => "IO_ERROR",
			Self::Json(_) => "PARSE_ERROR",
		}
	}

	/// Converts to the wire-level `{code, message}` shape.
	pub fn to_tool_error(&self) -> ToolError {
		ToolError {
			code: self.code().to_string(),
			message: self.to_string(),
		}
	}
}
