//! Web storage tools. The `type` argument selects local vs session storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tabwright_protocol::{StorageKind, ToolResult};

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};

const STORAGE_KINDS: &[&str] = &["local", "session"];

fn storage_kind(cx: &ToolContext<'_>) -> Result<StorageKind> {
	cx.parse_arg::<StorageKind>("type")?
		.ok_or_else(|| Error::validation("type", "missing required field"))
}

pub struct StorageGet;

#[async_trait]
impl Tool for StorageGet {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_storage_get",
			capability: Capability::Storage,
			description: "Read all entries from local or session storage",
			schema: Schema::new()
				.required("type", FieldKind::StringEnum(STORAGE_KINDS), "Storage to read"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let kind = storage_kind(cx)?;
		let tab = cx.tab()?;
		let entries = tab
			.page()
			.storage_entries(kind)
			.await
			.map_err(|e| classify_driver("browser_storage_get", e))?;
		Ok(ToolResult::text(serde_json::to_string_pretty(&entries)?))
	}
}

pub struct StorageSet;

#[async_trait]
impl Tool for StorageSet {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_storage_set",
			capability: Capability::Storage,
			description: "Write entries into local or session storage",
			schema: Schema::new()
				.required("type", FieldKind::StringEnum(STORAGE_KINDS), "Storage to write")
				.required("entries", FieldKind::StringMap, "Key/value pairs to store"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let kind = storage_kind(cx)?;
		let entries: BTreeMap<String, String> = cx
			.parse_arg("entries")?
			.ok_or_else(|| Error::validation("entries", "missing required field"))?;
		let tab = cx.tab()?;
		tab.page()
			.set_storage(kind, &entries)
			.await
			.map_err(|e| classify_driver("browser_storage_set", e))?;
		Ok(ToolResult::text(format!(
			"Stored {} entr{} in {}",
			entries.len(),
			if entries.len() == 1 { "y" } else { "ies" },
			kind.js_object()
		)))
	}
}

pub struct StorageClear;

#[async_trait]
impl Tool for StorageClear {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_storage_clear",
			capability: Capability::Storage,
			description: "Clear local or session storage",
			schema: Schema::new()
				.required("type", FieldKind::StringEnum(STORAGE_KINDS), "Storage to clear"),
			tab_policy: TabPolicy::Require,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let kind = storage_kind(cx)?;
		let tab = cx.tab()?;
		tab.page()
			.clear_storage(kind)
			.await
			.map_err(|e| classify_driver("browser_storage_clear", e))?;
		Ok(ToolResult::text(format!("Cleared {}", kind.js_object())))
	}
}
