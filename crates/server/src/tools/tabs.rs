//! Tab lifecycle tools. These manage tabs themselves, so their tab policy
//! is `None` and snapshot effects target whatever tab ends up active.

use std::fmt::Write as _;

use async_trait::async_trait;
use tabwright_protocol::{LoadState, ToolResult};

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};

pub struct TabsList;

#[async_trait]
impl Tool for TabsList {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_tabs_list",
			capability: Capability::Core,
			description: "List open tabs with their indices and URLs",
			schema: Schema::new(),
			tab_policy: TabPolicy::None,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tabs = cx.session.tabs();
		if tabs.is_empty() {
			return Ok(ToolResult::text("No open tabs"));
		}

		let mut out = String::new();
		for tab in tabs {
			let marker = if tab.active { " (active)" } else { "" };
			let _ = writeln!(out, "- {}: {}{marker}", tab.index, tab.url);
		}
		Ok(ToolResult::text(out.trim_end().to_string()))
	}
}

pub struct TabNew;

#[async_trait]
impl Tool for TabNew {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_tab_new",
			capability: Capability::Core,
			description: "Open a new tab, optionally navigating it",
			schema: Schema::new()
				.optional("url", FieldKind::String, "URL to open in the new tab")
				.optional("timeout_ms", FieldKind::Integer, "Navigation deadline in milliseconds"),
			tab_policy: TabPolicy::None,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.session.new_tab().await?;
		if let Some(url) = cx.str_arg("url") {
			tab.page()
				.goto(url, LoadState::Load, cx.timeout())
				.await
				.map_err(|e| classify_driver("browser_tab_new", e))?;
		}
		Ok(ToolResult::text(format!("Opened tab {}", tab.index())))
	}
}

pub struct TabSelect;

#[async_trait]
impl Tool for TabSelect {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_tab_select",
			capability: Capability::Core,
			description: "Activate the tab at an index",
			schema: Schema::new()
				.required("index", FieldKind::Integer, "Index of the tab to activate"),
			tab_policy: TabPolicy::None,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let index = cx
			.u64_arg("index")
			.ok_or_else(|| Error::validation("index", "missing required field"))? as usize;
		let tab = cx
			.session
			.select_tab(index)
			.map_err(|_| Error::validation("index", format!("no open tab at index {index}")))?;
		Ok(ToolResult::text(format!("Selected tab {} ({})", index, tab.url())))
	}
}

pub struct TabClose;

#[async_trait]
impl Tool for TabClose {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_tab_close",
			capability: Capability::Core,
			description: "Close the tab at an index (the active tab by default)",
			schema: Schema::new()
				.optional("index", FieldKind::Integer, "Index of the tab to close"),
			tab_policy: TabPolicy::None,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let index = cx.u64_arg("index").map(|i| i as usize);
		let closed = match cx.session.close_tab(index).await {
			Ok(closed) => closed,
			Err(Error::NoActiveTab) if index.is_some() => {
				return Err(Error::validation(
					"index",
					format!("no open tab at index {}", index.unwrap_or_default()),
				));
			}
			Err(e) => return Err(e),
		};
		Ok(ToolResult::text(format!("Closed tab {closed}")))
	}
}
