//! Navigation tools.

use async_trait::async_trait;
use tabwright_protocol::{LoadState, ToolResult};

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::Result;

pub struct Navigate;

#[async_trait]
impl Tool for Navigate {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_navigate",
			capability: Capability::Core,
			description: "Navigate the active tab to a URL",
			schema: Schema::new()
				.required("url", FieldKind::String, "Absolute URL to navigate to")
				.optional("timeout_ms", FieldKind::Integer, "Navigation deadline in milliseconds"),
			tab_policy: TabPolicy::Ensure,
			effects: SideEffects::SNAPSHOT_AND_IDLE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let url = cx.required_str("url")?;
		let tab = cx.tab()?;
		tab.page()
			.goto(url, LoadState::Load, cx.timeout())
			.await
			.map_err(|e| classify_driver("browser_navigate", e))?;
		Ok(ToolResult::text(format!("Navigated to {url}")))
	}
}

pub struct NavigateBack;

#[async_trait]
impl Tool for NavigateBack {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_navigate_back",
			capability: Capability::Core,
			description: "Go back one entry in the active tab's history",
			schema: Schema::new()
				.optional("timeout_ms", FieldKind::Integer, "Navigation deadline in milliseconds"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.tab()?;
		tab.page()
			.go_back(cx.timeout())
			.await
			.map_err(|e| classify_driver("browser_navigate_back", e))?;
		Ok(ToolResult::text(format!("Navigated back to {}", tab.url())))
	}
}
