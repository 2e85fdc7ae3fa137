//! Transport envelopes and enumerated tool arguments.
//!
//! The server speaks NDJSON: one [`ServerRequest`] per input line, one
//! [`ServerResponse`] per output line, correlated by the optional `id`.

use serde::{Deserialize, Serialize};

/// A request parsed from one NDJSON input line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ServerRequest {
	/// Health check.
	Ping,
	/// List the tools visible to this session (capability-filtered).
	ToolsList,
	/// Invoke a tool by name.
	ToolsCall(ToolCallParams),
	/// End the transport loop.
	Quit,
}

/// A full NDJSON input line: correlation id plus the tagged request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
	/// Identifier echoed in the response for correlation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	#[serde(flatten)]
	pub request: ServerRequest,
}

/// Parameters for a `tools_call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallParams {
	/// Tool name as advertised by `tools_list`.
	pub name: String,
	/// Tool arguments, validated against the tool's declared schema.
	#[serde(default)]
	pub arguments: serde_json::Value,
}

/// A response written as one NDJSON output line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse {
	/// Request identifier echoed for correlation.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	/// `true` if the request succeeded.
	pub ok: bool,

	/// Result payload (present only on success).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<serde_json::Value>,

	/// Error details (present only on failure).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ToolError>,
}

impl ServerResponse {
	/// Builds a success response.
	pub fn ok(id: Option<String>, result: serde_json::Value) -> Self {
		Self {
			id,
			ok: true,
			result: Some(result),
			error: None,
		}
	}

	/// Builds a failure response.
	pub fn err(id: Option<String>, error: ToolError) -> Self {
		Self {
			id,
			ok: false,
			result: None,
			error: Some(error),
		}
	}
}

/// Structured tool failure surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
	/// Stable machine-readable code (e.g. `UNKNOWN_TOOL`, `TIMEOUT`).
	pub code: String,
	/// Human-readable message including the identifying selector/pattern.
	pub message: String,
}

/// One advertised tool in a `tools_list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
	pub name: String,
	pub description: String,
	/// Structural schema the tool's arguments must validate against.
	pub input_schema: serde_json::Value,
}

/// A block of tool result content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
	Text { text: String },
}

impl ContentBlock {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text { text: text.into() }
	}
}

/// Successful tool invocation payload: `{content: [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
	pub content: Vec<ContentBlock>,
}

impl ToolResult {
	/// Builds a result with a single text block.
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			content: vec![ContentBlock::text(text)],
		}
	}

	/// Appends another text block.
	pub fn push_text(&mut self, text: impl Into<String>) {
		self.content.push(ContentBlock::text(text));
	}
}

/// Which web storage a storage tool operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
	Local,
	Session,
}

impl StorageKind {
	/// JavaScript global backing this storage kind.
	pub fn js_object(self) -> &'static str {
		match self {
			Self::Local => "localStorage",
			Self::Session => "sessionStorage",
		}
	}
}

/// Page load state a wait can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
	#[default]
	Load,
	#[serde(rename = "domcontentloaded")]
	DomContentLoaded,
	#[serde(rename = "networkidle")]
	NetworkIdle,
}

/// Element state a selector wait can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
	Attached,
	Detached,
	#[default]
	Visible,
	Hidden,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_envelope_parses_tagged_methods() {
		let req: ServerRequest =
			serde_json::from_str(r#"{"method":"tools_call","params":{"name":"browser_navigate","arguments":{"url":"https://example.com"}}}"#)
				.unwrap();
		match req {
			ServerRequest::ToolsCall(params) => {
				assert_eq!(params.name, "browser_navigate");
				assert_eq!(params.arguments["url"], "https://example.com");
			}
			other => panic!("unexpected request: {other:?}"),
		}
	}

	#[test]
	fn envelope_carries_optional_id_beside_the_method() {
		let env: RequestEnvelope =
			serde_json::from_str(r#"{"id":"7","method":"ping"}"#).unwrap();
		assert_eq!(env.id.as_deref(), Some("7"));
		assert!(matches!(env.request, ServerRequest::Ping));

		let env: RequestEnvelope = serde_json::from_str(r#"{"method":"quit"}"#).unwrap();
		assert!(env.id.is_none());
	}

	#[test]
	fn tool_call_arguments_default_to_null() {
		let req: ServerRequest =
			serde_json::from_str(r#"{"method":"tools_call","params":{"name":"browser_snapshot"}}"#).unwrap();
		match req {
			ServerRequest::ToolsCall(params) => assert!(params.arguments.is_null()),
			other => panic!("unexpected request: {other:?}"),
		}
	}

	#[test]
	fn response_omits_absent_sides() {
		let ok = ServerResponse::ok(Some("1".into()), serde_json::json!({"pong": true}));
		let json = serde_json::to_value(&ok).unwrap();
		assert!(json.get("error").is_none());

		let err = ServerResponse::err(
			None,
			ToolError {
				code: "UNKNOWN_TOOL".into(),
				message: "no such tool".into(),
			},
		);
		let json = serde_json::to_value(&err).unwrap();
		assert!(json.get("result").is_none());
		assert!(json.get("id").is_none());
		assert_eq!(json["error"]["code"], "UNKNOWN_TOOL");
	}

	#[test]
	fn load_state_uses_lowercase_wire_names() {
		assert_eq!(
			serde_json::to_string(&LoadState::DomContentLoaded).unwrap(),
			"\"domcontentloaded\""
		);
		let state: LoadState = serde_json::from_str("\"networkidle\"").unwrap();
		assert_eq!(state, LoadState::NetworkIdle);
	}

	#[test]
	fn content_block_tags_type() {
		let result = ToolResult::text("hello");
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["content"][0]["type"], "text");
		assert_eq!(json["content"][0]["text"], "hello");
	}
}
