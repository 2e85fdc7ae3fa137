use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors raised by a browser driver backend.
#[derive(Debug, Error)]
pub enum DriverError {
	#[error("browser launch failed: {0}")]
	Launch(String),

	#[error("driver connection failed: {0}")]
	Connection(String),

	#[error("protocol error: {0}")]
	Protocol(String),

	#[error("navigation failed: {url}: {message}")]
	Navigation { url: String, message: String },

	#[error("javascript evaluation failed: {0}")]
	JsEval(String),

	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("page is closed")]
	PageClosed,
}

impl DriverError {
	/// Builds a timeout error from a duration and a description of the condition.
	pub fn timeout(elapsed: std::time::Duration, condition: impl Into<String>) -> Self {
		Self::Timeout {
			ms: elapsed.as_millis() as u64,
			condition: condition.into(),
		}
	}
}
