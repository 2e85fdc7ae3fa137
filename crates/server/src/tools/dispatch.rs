//! The dispatch pipeline: lookup, validation, tab resolution, execution
//! under the tab's lock, declared side effects, serialization.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tabwright_protocol::{ToolInfo, ToolResult};
use tracing::{debug, info};

use super::{TabPolicy, Tool, ToolContext, ToolDescriptor, ToolRegistry};
use crate::error::{Error, Result};
use crate::session::{SessionContext, Tab};

/// Quiet window defining "network idle".
pub const IDLE_QUIET_WINDOW: Duration = Duration::from_millis(500);

pub struct Dispatcher {
	registry: ToolRegistry,
	session: Arc<SessionContext>,
}

impl Dispatcher {
	pub fn new(registry: ToolRegistry, session: Arc<SessionContext>) -> Self {
		Self { registry, session }
	}

	pub fn session(&self) -> &Arc<SessionContext> {
		&self.session
	}

	/// The tools visible to this session.
	pub fn list_tools(&self) -> Vec<ToolInfo> {
		self.registry.list(self.session.capabilities())
	}

	/// Runs one tool call end to end. Every failure comes back classified;
	/// nothing is retried.
	pub async fn dispatch(&self, name: &str, args: &Value) -> Result<ToolResult> {
		let tool = self
			.registry
			.find(self.session.capabilities(), name)
			.ok_or_else(|| Error::UnknownTool(name.to_string()))?;
		let descriptor = tool.descriptor();

		// Validation happens before any side effect.
		descriptor.schema.validate(args)?;

		let tab = match descriptor.tab_policy {
			TabPolicy::None => None,
			TabPolicy::Ensure => Some(self.session.ensure_tab().await?),
			TabPolicy::Require => Some(self.session.current_tab()?),
		};

		info!(target: "dispatch", tool = descriptor.name, tab = tab.as_ref().map(|t| t.index()), "dispatch");

		let cx = ToolContext {
			session: &self.session,
			tab: tab.clone(),
			args,
		};

		// Two calls against the same tab never interleave. The guard covers
		// the declared effects too: the snapshot attached to a call reflects
		// that call's work, not a faster neighbor's.
		let result = match &tab {
			Some(tab) => {
				let _guard = tab.exec_lock().lock().await;
				let mut result = tool.execute(&cx).await?;
				self.apply_effects(&descriptor, tab, &mut result).await?;
				result
			}
			None => {
				let mut result = tool.execute(&cx).await?;
				// Tab-managing tools (policy None) leave the active tab
				// changed; effects target whatever is active now.
				let wants_effects =
					descriptor.effects.wait_network_idle || descriptor.effects.capture_snapshot;
				if wants_effects {
					if let Ok(tab) = self.session.current_tab() {
						let _guard = tab.exec_lock().lock().await;
						self.apply_effects(&descriptor, &tab, &mut result).await?;
					}
				}
				result
			}
		};
		Ok(result)
	}

	/// Applies the descriptor's declared synchronization in fixed order:
	/// idle wait, then snapshot capture. Callers hold the tab's exec lock.
	async fn apply_effects(
		&self,
		descriptor: &ToolDescriptor,
		tab: &Arc<Tab>,
		result: &mut ToolResult,
	) -> Result<()> {
		if descriptor.effects.wait_network_idle {
			let idle = tab
				.tracker()
				.wait_for_idle(IDLE_QUIET_WINDOW, self.session.default_timeout())
				.await;
			if !idle {
				debug!(target: "dispatch", tool = descriptor.name, "network never went idle");
			}
		}

		if descriptor.effects.capture_snapshot {
			let snapshot = tab
				.page()
				.snapshot()
				.await
				.map_err(|e| Error::driver(descriptor.name, e))?;
			result.push_text(format!("### Page state\nurl: {}\n\n{snapshot}", tab.url()));
		}
		Ok(())
	}
}

/// Maps a driver failure out of a wait-style call, surfacing driver
/// timeouts as the caller-visible timeout taxonomy.
pub(super) fn classify_driver(tool: &'static str, e: tabwright_driver::DriverError) -> Error {
	match e {
		tabwright_driver::DriverError::Timeout { ms, condition } => Error::Timeout {
			what: condition,
			ms,
		},
		other => Error::driver(tool, other),
	}
}
