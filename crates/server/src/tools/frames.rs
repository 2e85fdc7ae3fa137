use async_trait::async_trait;
use tabwright_protocol::ToolResult;

use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::Result;

/// Selects the frame subsequent frame-scoped tools operate on. The
/// selection lasts until the next top-level navigation.
pub struct SwitchFrame;

#[async_trait]
impl Tool for SwitchFrame {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_switch_frame",
			capability: Capability::Frames,
			description: "Select a frame by id, name, or URL; omit to return to the main frame",
			schema: Schema::new()
				.optional("frame", FieldKind::String, "Frame id, name, or URL"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.tab()?;
		tab.switch_frame(cx.str_arg("frame")).await?;
		Ok(ToolResult::text(format!("Current frame: {}", tab.current_frame_label())))
	}
}
