use async_trait::async_trait;
use tabwright_protocol::ToolResult;

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::Result;

/// Evaluates JavaScript in the currently selected frame.
pub struct Evaluate;

#[async_trait]
impl Tool for Evaluate {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_evaluate",
			capability: Capability::Javascript,
			description: "Evaluate a JavaScript expression in the current frame",
			schema: Schema::new()
				.required("expression", FieldKind::String, "Expression to evaluate"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let expression = cx.required_str("expression")?;
		let tab = cx.tab()?;
		let target = tab.frame_target()?;

		let value = tab
			.page()
			.evaluate(&target, expression)
			.await
			.map_err(|e| classify_driver("browser_evaluate", e))?;
		Ok(ToolResult::text(serde_json::to_string_pretty(&value)?))
	}
}
