//! Wait tools: selector state and load state.

use async_trait::async_trait;
use tabwright_protocol::{LoadState, ToolResult, WaitState};

use super::dispatch::{classify_driver, IDLE_QUIET_WINDOW};
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};

pub struct WaitForSelector;

#[async_trait]
impl Tool for WaitForSelector {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_wait_for_selector",
			capability: Capability::Core,
			description: "Wait for an element matching a selector to reach a state",
			schema: Schema::new()
				.required("selector", FieldKind::String, "CSS selector to wait for")
				.optional(
					"state",
					FieldKind::StringEnum(&["attached", "detached", "visible", "hidden"]),
					"Target element state (default: visible)",
				)
				.optional("timeout_ms", FieldKind::Integer, "Wait deadline in milliseconds"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let selector = cx.required_str("selector")?;
		let state = cx.parse_arg::<WaitState>("state")?.unwrap_or_default();
		let tab = cx.tab()?;
		let target = tab.frame_target()?;

		tab.page()
			.wait_for_selector(&target, selector, state, cx.timeout())
			.await
			.map_err(|e| classify_driver("browser_wait_for_selector", e))?;
		Ok(ToolResult::text(format!(
			"Element {selector} is {}",
			format!("{state:?}").to_lowercase()
		)))
	}
}

pub struct WaitForLoadState;

#[async_trait]
impl Tool for WaitForLoadState {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_wait_for_load_state",
			capability: Capability::Core,
			description: "Wait for the active tab to reach a load state",
			schema: Schema::new()
				.optional(
					"state",
					FieldKind::StringEnum(&["load", "domcontentloaded", "networkidle"]),
					"Load state to wait for (default: load)",
				)
				.optional("timeout_ms", FieldKind::Integer, "Wait deadline in milliseconds"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let state = cx.parse_arg::<LoadState>("state")?.unwrap_or_default();
		let tab = cx.tab()?;
		let timeout = cx.timeout();

		// Network idle is observed from the tracker, not the driver; an
		// explicit wait for it fails on timeout, unlike the post-navigation
		// synchronization which only logs.
		if state == LoadState::NetworkIdle {
			let idle = tab.tracker().wait_for_idle(IDLE_QUIET_WINDOW, timeout).await;
			if !idle {
				return Err(Error::Timeout {
					what: "networkidle".to_string(),
					ms: timeout.as_millis() as u64,
				});
			}
		} else {
			tab.page()
				.wait_for_load(state, timeout)
				.await
				.map_err(|e| classify_driver("browser_wait_for_load_state", e))?;
		}
		Ok(ToolResult::text(format!(
			"Reached load state: {}",
			format!("{state:?}").to_lowercase()
		)))
	}
}
