//! Generation-stamped "current frame" pointer.
//!
//! The stamp ties a frame selection to the navigation generation it was made
//! in. A top-level navigation bumps the tab's generation and resets the
//! context to the main frame in the event pump, so a selection made before
//! the navigation can never silently target a detached frame.

use tabwright_driver::{EvalTarget, FrameInfo};

#[derive(Debug, Clone)]
pub struct FrameContext {
	target: EvalTarget,
	/// Human-readable identifier for error messages.
	label: String,
	generation: u64,
}

impl FrameContext {
	pub fn main(generation: u64) -> Self {
		Self {
			target: EvalTarget::MainFrame,
			label: "main".to_string(),
			generation,
		}
	}

	pub fn select(frame: &FrameInfo, label: &str, generation: u64) -> Self {
		if frame.is_main {
			return Self::main(generation);
		}
		Self {
			target: EvalTarget::Frame(frame.id.clone()),
			label: label.to_string(),
			generation,
		}
	}

	pub fn is_main(&self) -> bool {
		matches!(self.target, EvalTarget::MainFrame)
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// The evaluation target, valid only while `generation` still matches
	/// the tab's navigation generation.
	pub fn target(&self) -> &EvalTarget {
		&self.target
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selecting_the_main_frame_normalizes_the_label() {
		let main = FrameInfo {
			id: "f1".to_string(),
			name: None,
			url: "https://a.test/".to_string(),
			is_main: true,
		};
		let ctx = FrameContext::select(&main, "f1", 3);
		assert!(ctx.is_main());
		assert_eq!(ctx.label(), "main");
		assert_eq!(ctx.generation(), 3);
	}

	#[test]
	fn child_frame_targets_by_id() {
		let child = FrameInfo {
			id: "f2".to_string(),
			name: Some("sidebar".to_string()),
			url: "https://a.test/side".to_string(),
			is_main: false,
		};
		let ctx = FrameContext::select(&child, "sidebar", 1);
		assert!(!ctx.is_main());
		match ctx.target() {
			EvalTarget::Frame(id) => assert_eq!(id, "f2"),
			other => panic!("unexpected target: {other:?}"),
		}
	}
}
