//! Route (interception) tools.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use tabwright_protocol::ToolResult;

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::pattern::UrlPattern;
use crate::routes::RouteDecision;

pub struct RouteAdd;

#[async_trait]
impl Tool for RouteAdd {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_route_add",
			capability: Capability::Network,
			description: "Register an interception rule for requests matching a URL glob",
			schema: Schema::new()
				.required("url", FieldKind::String, "URL glob pattern to intercept")
				.required(
					"action",
					FieldKind::StringEnum(&["abort", "fulfill", "continue"]),
					"Decision applied to matching requests",
				)
				.optional("status", FieldKind::Integer, "Fulfill: response status (default 200)")
				.optional("body", FieldKind::String, "Fulfill: response body")
				.optional("headers", FieldKind::StringMap, "Fulfill/continue: headers")
				.optional("content_type", FieldKind::String, "Fulfill: content-type shorthand")
				.optional("redirect_url", FieldKind::String, "Continue: overridden URL")
				.optional("method", FieldKind::String, "Continue: overridden method")
				.optional("post_data", FieldKind::String, "Continue: overridden request body"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let pattern_str = cx.required_str("url")?;
		let action = cx.required_str("action")?;
		let headers = cx
			.parse_arg::<BTreeMap<String, String>>("headers")?
			.map(|map| map.into_iter().collect::<Vec<_>>());

		let decision = match action {
			"abort" => RouteDecision::Abort,
			"fulfill" => {
				let status = cx.u64_arg("status").unwrap_or(200);
				let status = u16::try_from(status)
					.map_err(|_| Error::validation("status", "not a valid HTTP status"))?;
				RouteDecision::Fulfill {
					status,
					body: cx.str_arg("body").unwrap_or_default().to_string(),
					headers: headers.unwrap_or_default(),
					content_type: cx.str_arg("content_type").map(str::to_string),
				}
			}
			"continue" => RouteDecision::Continue {
				url: cx.str_arg("redirect_url").map(str::to_string),
				method: cx.str_arg("method").map(str::to_string),
				headers,
				post_data: cx.str_arg("post_data").map(str::to_string),
			},
			other => return Err(Error::validation("action", format!("unknown action: {other}"))),
		};

		let kind = decision.kind();
		let tab = cx.tab()?;
		tab.routes()
			.add(tab.page(), UrlPattern::new(pattern_str), decision)
			.await
			.map_err(|e| classify_driver("browser_route_add", e))?;
		Ok(ToolResult::text(format!("Route added for {pattern_str} ({kind})")))
	}
}

pub struct RouteRemove;

#[async_trait]
impl Tool for RouteRemove {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_route_remove",
			capability: Capability::Network,
			description: "Remove the interception rule with an exact URL pattern",
			schema: Schema::new()
				.required("url", FieldKind::String, "Exact pattern of the rule to remove"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let pattern = cx.required_str("url")?;
		let tab = cx.tab()?;
		let removed = tab
			.routes()
			.remove(tab.page(), pattern)
			.await
			.map_err(|e| classify_driver("browser_route_remove", e))?;
		if removed {
			Ok(ToolResult::text(format!("Removed route for {pattern}")))
		} else {
			Ok(ToolResult::text(format!("No route registered for {pattern}")))
		}
	}
}

pub struct RouteList;

#[async_trait]
impl Tool for RouteList {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_route_list",
			capability: Capability::Network,
			description: "List registered interception rules in registration order",
			schema: Schema::new(),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let rules = cx.tab()?.routes().list();
		if rules.is_empty() {
			return Ok(ToolResult::text("No routes registered"));
		}

		let mut out = String::new();
		for (pattern, kind) in rules {
			let _ = writeln!(out, "- {pattern}: {kind}");
		}
		Ok(ToolResult::text(out.trim_end().to_string()))
	}
}
