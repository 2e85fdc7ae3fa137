//! NDJSON transport over stdio.
//!
//! One JSON request per input line, one JSON response per output line,
//! correlated by the optional `id`. Logs stay on stderr so stdout carries
//! only protocol lines. The session outlives individual requests; EOF ends
//! the transport, and teardown follows the shutdown policy.

use std::sync::Arc;

use serde_json::json;
use tabwright_driver::Browser;
use tabwright_driver::cdp::{CdpBrowser, LaunchOptions};
use tabwright_protocol::{RequestEnvelope, ServerRequest, ServerResponse, ToolError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::SessionContext;
use crate::tools::{Dispatcher, ToolRegistry};

/// Connects or launches the browser per config and serves stdio until EOF
/// or an explicit quit.
pub async fn run(config: ServerConfig) -> Result<()> {
	let browser: Arc<dyn Browser> = match &config.cdp_endpoint {
		Some(endpoint) => Arc::new(
			CdpBrowser::connect(endpoint)
				.await
				.map_err(|e| crate::error::Error::driver("startup", e))?,
		),
		None => Arc::new(
			CdpBrowser::launch(LaunchOptions {
				headless: config.headless,
				..LaunchOptions::default()
			})
			.await
			.map_err(|e| crate::error::Error::driver("startup", e))?,
		),
	};

	let session = SessionContext::new(
		browser,
		config.capabilities.clone(),
		config.default_timeout,
		config.keep_browser_alive,
	);
	let dispatcher = Dispatcher::new(ToolRegistry::builtin(), Arc::clone(&session));

	let stdin = BufReader::new(tokio::io::stdin());
	let stdout = tokio::io::stdout();
	serve(dispatcher, stdin.lines(), stdout).await?;

	session.shutdown().await;
	Ok(())
}

/// The request loop, transport-agnostic for testing.
pub async fn serve<R, W>(
	dispatcher: Dispatcher,
	mut lines: tokio::io::Lines<R>,
	mut out: W,
) -> Result<()>
where
	R: AsyncBufRead + Unpin,
	W: AsyncWrite + Unpin,
{
	info!(target: "server", "serving NDJSON on stdio");

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let (response, quit) = handle_line(&dispatcher, line).await;
		let mut encoded = serde_json::to_vec(&response)?;
		encoded.push(b'\n');
		out.write_all(&encoded).await?;
		out.flush().await?;

		if quit {
			break;
		}
	}

	debug!(target: "server", "transport ended");
	Ok(())
}

async fn handle_line(dispatcher: &Dispatcher, line: &str) -> (ServerResponse, bool) {
	let envelope: RequestEnvelope = match serde_json::from_str(line) {
		Ok(envelope) => envelope,
		Err(e) => {
			return (
				ServerResponse::err(
					None,
					ToolError {
						code: "PARSE_ERROR".to_string(),
						message: format!("invalid request: {e}"),
					},
				),
				false,
			);
		}
	};

	let id = envelope.id;
	match envelope.request {
		ServerRequest::Ping => (ServerResponse::ok(id, json!({ "pong": true })), false),
		ServerRequest::Quit => (ServerResponse::ok(id, json!({ "bye": true })), true),
		ServerRequest::ToolsList => {
			let tools = dispatcher.list_tools();
			(ServerResponse::ok(id, json!({ "tools": tools })), false)
		}
		ServerRequest::ToolsCall(params) => {
			match dispatcher.dispatch(&params.name, &params.arguments).await {
				Ok(result) => {
					let payload = match serde_json::to_value(&result) {
						Ok(payload) => payload,
						Err(e) => {
							return (
								ServerResponse::err(
									id,
									ToolError {
										code: "PARSE_ERROR".to_string(),
										message: e.to_string(),
									},
								),
								false,
							);
						}
					};
					(ServerResponse::ok(id, payload), false)
				}
				Err(e) => (ServerResponse::err(id, e.to_tool_error()), false),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use tabwright_driver::mock::MockBrowser;
	use tokio::io::AsyncBufReadExt;

	use super::*;
	use crate::capability::CapabilitySet;

	fn dispatcher(caps: CapabilitySet) -> Dispatcher {
		let session = SessionContext::new(MockBrowser::new(), caps, Duration::from_secs(5), false);
		Dispatcher::new(ToolRegistry::builtin(), session)
	}

	async fn run_lines(dispatcher: Dispatcher, input: &str) -> Vec<serde_json::Value> {
		let reader = BufReader::new(input.as_bytes());
		let mut out = Vec::new();
		serve(dispatcher, reader.lines(), &mut out).await.unwrap();
		String::from_utf8(out)
			.unwrap()
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect()
	}

	#[tokio::test]
	async fn ping_and_quit_round_trip() {
		let responses = run_lines(
			dispatcher(CapabilitySet::all()),
			"{\"id\":\"1\",\"method\":\"ping\"}\n{\"id\":\"2\",\"method\":\"quit\"}\n",
		)
		.await;
		assert_eq!(responses.len(), 2);
		assert_eq!(responses[0]["id"], "1");
		assert_eq!(responses[0]["result"]["pong"], true);
		assert_eq!(responses[1]["ok"], true);
	}

	#[tokio::test]
	async fn quit_stops_reading_further_lines() {
		let responses = run_lines(
			dispatcher(CapabilitySet::all()),
			"{\"method\":\"quit\"}\n{\"method\":\"ping\"}\n",
		)
		.await;
		assert_eq!(responses.len(), 1);
	}

	#[tokio::test]
	async fn malformed_line_yields_parse_error_and_continues() {
		let responses = run_lines(
			dispatcher(CapabilitySet::all()),
			"this is not json\n{\"method\":\"ping\"}\n",
		)
		.await;
		assert_eq!(responses.len(), 2);
		assert_eq!(responses[0]["ok"], false);
		assert_eq!(responses[0]["error"]["code"], "PARSE_ERROR");
		assert_eq!(responses[1]["ok"], true);
	}

	#[tokio::test]
	async fn tools_list_is_capability_filtered() {
		let responses = run_lines(
			dispatcher(CapabilitySet::core_only()),
			"{\"method\":\"tools_list\"}\n",
		)
		.await;
		let tools = responses[0]["result"]["tools"].as_array().unwrap();
		let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
		assert!(names.contains(&"browser_navigate"));
		assert!(!names.contains(&"browser_evaluate"));
	}
}
