//! Network observation tools: log projections and waits.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::json;
use tabwright_protocol::ToolResult;

use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::network::{RequestFilter, ResponseFilter, WaitKind, WaitOutcome};
use crate::pattern::UrlPattern;

fn status_arg(cx: &ToolContext<'_>, name: &'static str) -> Result<Option<u16>> {
	match cx.u64_arg(name) {
		None => Ok(None),
		Some(value) => u16::try_from(value)
			.map(Some)
			.map_err(|_| Error::validation(name, "not a valid HTTP status")),
	}
}

pub struct NetworkRequests;

#[async_trait]
impl Tool for NetworkRequests {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_network_requests",
			capability: Capability::Network,
			description: "List logged requests, filtered by URL glob, method, and resource type",
			schema: Schema::new()
				.optional("url", FieldKind::String, "URL glob filter")
				.optional("method", FieldKind::String, "HTTP method filter")
				.optional("resource_type", FieldKind::String, "Resource type filter (document, script, fetch, ...)"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let filter = RequestFilter {
			url: cx.str_arg("url").map(UrlPattern::new),
			method: cx.str_arg("method").map(str::to_string),
			resource_type: cx.str_arg("resource_type").map(str::to_string),
		};
		let requests = cx.tab()?.tracker().requests(&filter);
		if requests.is_empty() {
			return Ok(ToolResult::text("No matching requests"));
		}

		let mut out = String::new();
		for request in requests {
			let _ = writeln!(out, "{} {} [{}]", request.method, request.url, request.resource_type);
		}
		Ok(ToolResult::text(out.trim_end().to_string()))
	}
}

pub struct NetworkResponses;

#[async_trait]
impl Tool for NetworkResponses {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_network_responses",
			capability: Capability::Network,
			description: "List logged responses, filtered by URL glob and status",
			schema: Schema::new()
				.optional("url", FieldKind::String, "URL glob filter")
				.optional("status", FieldKind::Integer, "Exact status filter")
				.optional("status_min", FieldKind::Integer, "Lowest status to include")
				.optional("status_max", FieldKind::Integer, "Highest status to include"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let status_min = status_arg(cx, "status_min")?;
		let status_max = status_arg(cx, "status_max")?;
		let status_range = if status_min.is_some() || status_max.is_some() {
			Some((status_min.unwrap_or(0), status_max.unwrap_or(999)))
		} else {
			None
		};
		let filter = ResponseFilter {
			url: cx.str_arg("url").map(UrlPattern::new),
			status: status_arg(cx, "status")?,
			status_range,
		};
		let responses = cx.tab()?.tracker().responses(&filter);
		if responses.is_empty() {
			return Ok(ToolResult::text("No matching responses"));
		}

		let mut out = String::new();
		for response in responses {
			let _ = writeln!(out, "{} {}", response.status, response.url);
		}
		Ok(ToolResult::text(out.trim_end().to_string()))
	}
}

pub struct WaitForRequest;

#[async_trait]
impl Tool for WaitForRequest {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_wait_for_request",
			capability: Capability::Network,
			description: "Wait for the next request whose URL matches a glob pattern",
			schema: Schema::new()
				.required("url", FieldKind::String, "URL glob pattern to wait for")
				.optional("timeout_ms", FieldKind::Integer, "Wait deadline in milliseconds"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let pattern = UrlPattern::new(cx.required_str("url")?);
		let timeout = cx.timeout();

		let outcome = cx
			.tab()?
			.tracker()
			.wait_for(WaitKind::Request, &pattern, timeout)
			.await;
		match outcome {
			WaitOutcome::MatchedRequest(request) => Ok(ToolResult::text(
				serde_json::to_string_pretty(&json!({
					"url": request.url,
					"method": request.method,
					"resourceType": request.resource_type,
				}))?,
			)),
			WaitOutcome::TimedOut => Err(Error::Timeout {
				what: format!("request matching {}", pattern.as_str()),
				ms: timeout.as_millis() as u64,
			}),
			WaitOutcome::MatchedResponse(_) => unreachable!("request wait matched a response"),
		}
	}
}

pub struct WaitForResponse;

#[async_trait]
impl Tool for WaitForResponse {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_wait_for_response",
			capability: Capability::Network,
			description: "Wait for the next response whose URL matches a glob pattern",
			schema: Schema::new()
				.required("url", FieldKind::String, "URL glob pattern to wait for")
				.optional("timeout_ms", FieldKind::Integer, "Wait deadline in milliseconds"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let pattern = UrlPattern::new(cx.required_str("url")?);
		let timeout = cx.timeout();

		let outcome = cx
			.tab()?
			.tracker()
			.wait_for(WaitKind::Response, &pattern, timeout)
			.await;
		match outcome {
			WaitOutcome::MatchedResponse(response) => Ok(ToolResult::text(
				serde_json::to_string_pretty(&json!({
					"url": response.url,
					"status": response.status,
					"ok": response.ok(),
				}))?,
			)),
			WaitOutcome::TimedOut => Err(Error::Timeout {
				what: format!("response matching {}", pattern.as_str()),
				ms: timeout.as_millis() as u64,
			}),
			WaitOutcome::MatchedRequest(_) => unreachable!("response wait matched a request"),
		}
	}
}
