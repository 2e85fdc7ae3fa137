use async_trait::async_trait;
use tabwright_protocol::ToolResult;

use super::{Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::Result;

/// The snapshot itself is the declared side effect; the handler only
/// contributes the URL line.
pub struct Snapshot;

#[async_trait]
impl Tool for Snapshot {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_snapshot",
			capability: Capability::Core,
			description: "Capture a structural snapshot of the active tab",
			schema: Schema::new(),
			tab_policy: TabPolicy::Ensure,
			effects: SideEffects::SNAPSHOT,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.tab()?;
		Ok(ToolResult::text(format!("Current URL: {}", tab.url())))
	}
}
