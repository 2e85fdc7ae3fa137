//! Cookie tools.

use async_trait::async_trait;
use tabwright_protocol::{Cookie, ToolResult};

use super::dispatch::classify_driver;
use super::{FieldKind, Schema, SideEffects, TabPolicy, Tool, ToolContext, ToolDescriptor};
use crate::capability::Capability;
use crate::error::{Error, Result};

pub struct CookiesGet;

#[async_trait]
impl Tool for CookiesGet {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_cookies_get",
			capability: Capability::Storage,
			description: "List cookies, optionally filtered by name",
			schema: Schema::new()
				.optional("name", FieldKind::String, "Only return cookies with this name"),
			tab_policy: TabPolicy::Ensure,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.tab()?;
		let mut cookies = tab
			.page()
			.cookies()
			.await
			.map_err(|e| classify_driver("browser_cookies_get", e))?;
		if let Some(name) = cx.str_arg("name") {
			cookies.retain(|cookie| cookie.name == name);
		}
		Ok(ToolResult::text(serde_json::to_string_pretty(&cookies)?))
	}
}

pub struct CookiesSet;

#[async_trait]
impl Tool for CookiesSet {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_cookies_set",
			capability: Capability::Storage,
			description: "Set one or more cookies",
			schema: Schema::new()
				.required("cookies", FieldKind::ObjectArray, "Cookies to set"),
			tab_policy: TabPolicy::Ensure,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let cookies: Vec<Cookie> = cx
			.parse_arg("cookies")?
			.ok_or_else(|| Error::validation("cookies", "missing required field"))?;
		let tab = cx.tab()?;
		tab.page()
			.set_cookies(&cookies)
			.await
			.map_err(|e| classify_driver("browser_cookies_set", e))?;
		Ok(ToolResult::text(format!("Set {} cookie(s)", cookies.len())))
	}
}

pub struct CookiesClear;

#[async_trait]
impl Tool for CookiesClear {
	fn descriptor(&self) -> ToolDescriptor {
		ToolDescriptor {
			name: "browser_cookies_clear",
			capability: Capability::Storage,
			description: "Clear all cookies",
			schema: Schema::new(),
			tab_policy: TabPolicy::Ensure,
			effects: SideEffects::NONE,
		}
	}

	async fn execute(&self, cx: &ToolContext<'_>) -> Result<ToolResult> {
		let tab = cx.tab()?;
		tab.page()
			.clear_cookies()
			.await
			.map_err(|e| classify_driver("browser_cookies_clear", e))?;
		Ok(ToolResult::text("Cleared cookies"))
	}
}
