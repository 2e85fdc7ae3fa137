//! Tool descriptors, the registry, and dispatch.
//!
//! Tools are registered once at startup in a fixed order; the set a session
//! can see and invoke is the capability-filtered subset in that same order.

mod cookies;
mod dispatch;
mod evaluate;
mod frames;
mod navigation;
mod network;
mod routing;
mod schema;
mod snapshot;
mod storage;
mod tabs;
mod waiting;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tabwright_protocol::{ToolInfo, ToolResult};

pub use dispatch::Dispatcher;
pub use schema::{Field, FieldKind, Schema};

use crate::capability::{Capability, CapabilitySet};
use crate::error::{Error, Result};
use crate::session::{SessionContext, Tab};

/// How a tool obtains its tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabPolicy {
	/// The tool manages tabs itself (or needs none).
	None,
	/// Use the active tab, creating the first one lazily.
	Ensure,
	/// Use the active tab; fail with `NoActiveTab` if there is none.
	Require,
}

/// Synchronization applied by the dispatcher after the handler runs,
/// in fixed order: idle wait first, then snapshot capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffects {
	pub wait_network_idle: bool,
	pub capture_snapshot: bool,
}

impl SideEffects {
	pub const NONE: Self = Self {
		wait_network_idle: false,
		capture_snapshot: false,
	};
	pub const SNAPSHOT: Self = Self {
		wait_network_idle: false,
		capture_snapshot: true,
	};
	pub const SNAPSHOT_AND_IDLE: Self = Self {
		wait_network_idle: true,
		capture_snapshot: true,
	};
}

/// Everything the dispatcher needs to know about a tool besides its handler.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
	pub name: &'static str,
	pub capability: Capability,
	pub description: &'static str,
	pub schema: Schema,
	pub tab_policy: TabPolicy,
	pub effects: SideEffects,
}

/// A named, schema-validated, capability-gated command.
#[async_trait]
pub trait Tool: Send + Sync {
	fn descriptor(&self) -> ToolDescriptor;

	/// Runs with validated arguments and a tab resolved per the descriptor's
	/// policy. Handlers never apply synchronization themselves; the
	/// dispatcher does, uniformly, from the descriptor.
	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult>;
}

/// Per-invocation context handed to a tool handler.
pub struct ToolContext<'a> {
	pub session: &'a Arc<SessionContext>,
	pub tab: Option<Arc<Tab>>,
	pub args: &'a Value,
}

impl ToolContext<'_> {
	/// The resolved tab; present whenever the tab policy is not `None`.
	pub fn tab(&self) -> Result<&Arc<Tab>> {
		self.tab.as_ref().ok_or(Error::NoActiveTab)
	}

	pub fn str_arg(&self, name: &str) -> Option<&str> {
		self.args.get(name).and_then(Value::as_str)
	}

	pub fn required_str(&self, name: &'static str) -> Result<&str> {
		self.str_arg(name)
			.ok_or_else(|| Error::validation(name, "missing required field"))
	}

	pub fn u64_arg(&self, name: &str) -> Option<u64> {
		self.args.get(name).and_then(Value::as_u64)
	}

	pub fn bool_arg(&self, name: &str) -> Option<bool> {
		self.args.get(name).and_then(Value::as_bool)
	}

	/// Deserializes a structured argument (enum, cookie list, string map),
	/// naming the field on failure.
	pub fn parse_arg<T: DeserializeOwned>(&self, name: &'static str) -> Result<Option<T>> {
		match self.args.get(name) {
			None | Some(Value::Null) => Ok(None),
			Some(value) => serde_json::from_value(value.clone())
				.map(Some)
				.map_err(|e| Error::validation(name, e.to_string())),
		}
	}

	/// The wait deadline: `timeout_ms` argument or the session default.
	pub fn timeout(&self) -> Duration {
		self.u64_arg("timeout_ms")
			.map(Duration::from_millis)
			.unwrap_or_else(|| self.session.default_timeout())
	}
}

/// The immutable tool table, built once at startup.
pub struct ToolRegistry {
	tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
	/// All built-in tools in their advertised order.
	pub fn builtin() -> Self {
		let tools: Vec<Arc<dyn Tool>> = vec![
			Arc::new(navigation::Navigate),
			Arc::new(navigation::NavigateBack),
			Arc::new(snapshot::Snapshot),
			Arc::new(waiting::WaitForSelector),
			Arc::new(waiting::WaitForLoadState),
			Arc::new(tabs::TabsList),
			Arc::new(tabs::TabNew),
			Arc::new(tabs::TabSelect),
			Arc::new(tabs::TabClose),
			Arc::new(evaluate::Evaluate),
			Arc::new(frames::SwitchFrame),
			Arc::new(cookies::CookiesGet),
			Arc::new(cookies::CookiesSet),
			Arc::new(cookies::CookiesClear),
			Arc::new(storage::StorageGet),
			Arc::new(storage::StorageSet),
			Arc::new(storage::StorageClear),
			Arc::new(network::NetworkRequests),
			Arc::new(network::NetworkResponses),
			Arc::new(network::WaitForRequest),
			Arc::new(network::WaitForResponse),
			Arc::new(routing::RouteAdd),
			Arc::new(routing::RouteRemove),
			Arc::new(routing::RouteList),
		];
		Self { tools }
	}

	/// The capability-filtered subset, preserving registration order.
	pub fn active_set(&self, caps: &CapabilitySet) -> Vec<Arc<dyn Tool>> {
		self.tools
			.iter()
			.filter(|tool| caps.contains(tool.descriptor().capability))
			.cloned()
			.collect()
	}

	/// Looks a tool up within the active set only; a tool outside it is
	/// indistinguishable from one that does not exist.
	pub fn find(&self, caps: &CapabilitySet, name: &str) -> Option<Arc<dyn Tool>> {
		self.tools
			.iter()
			.find(|tool| {
				let descriptor = tool.descriptor();
				descriptor.name == name && caps.contains(descriptor.capability)
			})
			.cloned()
	}

	/// The advertisement for `tools_list`.
	pub fn list(&self, caps: &CapabilitySet) -> Vec<ToolInfo> {
		self.active_set(caps)
			.iter()
			.map(|tool| {
				let descriptor = tool.descriptor();
				ToolInfo {
					name: descriptor.name.to_string(),
					description: descriptor.description.to_string(),
					input_schema: descriptor.schema.to_json_schema(),
				}
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn active_set_filters_by_capability_preserving_order() {
		let registry = ToolRegistry::builtin();

		let core_only = registry.active_set(&CapabilitySet::core_only());
		assert!(core_only
			.iter()
			.all(|tool| tool.descriptor().capability == Capability::Core));
		assert_eq!(core_only[0].descriptor().name, "browser_navigate");

		let with_network = registry
			.active_set(&CapabilitySet::from_names(&["network"]).unwrap());
		let names: Vec<&str> = with_network.iter().map(|t| t.descriptor().name).collect();
		assert!(names.contains(&"browser_route_add"));
		assert!(!names.contains(&"browser_evaluate"));

		// Registration order survives filtering.
		let all = registry.active_set(&CapabilitySet::all());
		let filtered_positions: Vec<usize> = names
			.iter()
			.map(|n| all.iter().position(|t| t.descriptor().name == *n).unwrap())
			.collect();
		assert!(filtered_positions.windows(2).all(|w| w[0] < w[1]));
	}

	#[test]
	fn find_hides_capability_disabled_tools() {
		let registry = ToolRegistry::builtin();
		let caps = CapabilitySet::core_only();
		assert!(registry.find(&caps, "browser_evaluate").is_none());
		assert!(registry.find(&caps, "browser_navigate").is_some());
		assert!(registry.find(&caps, "no_such_tool").is_none());
	}

	#[test]
	fn every_tool_name_is_unique() {
		let registry = ToolRegistry::builtin();
		let mut names: Vec<&str> = registry
			.active_set(&CapabilitySet::all())
			.iter()
			.map(|t| t.descriptor().name)
			.collect();
		let total = names.len();
		names.sort_unstable();
		names.dedup();
		assert_eq!(names.len(), total);
	}
}
