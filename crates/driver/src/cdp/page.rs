//! Page-level CDP connection implementing the [`Page`] trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tabwright_protocol::{Cookie, LoadState, SameSite, StorageKind, WaitState};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use super::client::CdpClient;
use super::snapshot;
use crate::error::{DriverError, Result};
use crate::types::{
	EvalTarget, FrameInfo, InterceptedRequest, PageEvent, RequestEvent, ResponseEvent, RouteAction,
};
use crate::Page;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One CDP page target.
pub struct CdpPage {
	client: Arc<CdpClient>,
	browser: Arc<CdpClient>,
	target_id: String,
	events_tx: broadcast::Sender<PageEvent>,
	url: Arc<Mutex<String>>,
	/// frame id -> execution context id, maintained from Runtime events.
	contexts: Arc<Mutex<HashMap<String, u64>>>,
	closed: AtomicBool,
	pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl CdpPage {
	/// Connects to a page target and wires its event stream.
	pub(super) async fn attach(
		browser: Arc<CdpClient>,
		target_id: String,
		ws_url: &str,
	) -> Result<Self> {
		let client = Arc::new(CdpClient::connect(ws_url).await?);

		client.enable_domain("Page").await?;
		client.enable_domain("Runtime").await?;
		client.enable_domain("Network").await?;
		client.enable_domain("DOM").await?;
		client.enable_domain("Accessibility").await?;

		let (events_tx, _) = broadcast::channel(1024);
		let contexts = Arc::new(Mutex::new(HashMap::new()));

		let page = Self {
			client,
			browser,
			target_id,
			events_tx,
			url: Arc::new(Mutex::new("about:blank".to_string())),
			contexts,
			closed: AtomicBool::new(false),
			pumps: Mutex::new(Vec::new()),
		};
		page.spawn_pumps();
		Ok(page)
	}

	fn spawn_pumps(&self) {
		let mut pumps = self.pumps.lock();

		let tx = self.events_tx.clone();
		let mut rx = self.client.subscribe_event("Network.requestWillBeSent");
		pumps.push(tokio::spawn(async move {
			while let Some(params) = rx.recv().await {
				let request = &params["request"];
				let _ = tx.send(PageEvent::Request(RequestEvent {
					id: str_field(&params, "requestId"),
					url: str_field(request, "url"),
					method: str_field(request, "method"),
					resource_type: params
						.get("type")
						.and_then(Value::as_str)
						.unwrap_or("other")
						.to_lowercase(),
					headers: header_map(request.get("headers")),
				}));
			}
		}));

		let tx = self.events_tx.clone();
		let mut rx = self.client.subscribe_event("Network.responseReceived");
		pumps.push(tokio::spawn(async move {
			while let Some(params) = rx.recv().await {
				let response = &params["response"];
				let _ = tx.send(PageEvent::Response(ResponseEvent {
					request_id: str_field(&params, "requestId"),
					url: str_field(response, "url"),
					status: response.get("status").and_then(Value::as_u64).unwrap_or(0) as u16,
					headers: header_map(response.get("headers")),
				}));
			}
		}));

		let tx = self.events_tx.clone();
		let url_slot = Arc::clone(&self.url);
		let mut rx = self.client.subscribe_event("Page.frameNavigated");
		pumps.push(tokio::spawn(async move {
			while let Some(params) = rx.recv().await {
				let frame = &params["frame"];
				let is_main = frame.get("parentId").is_none();
				let url = str_field(frame, "url");
				if is_main {
					*url_slot.lock() = url.clone();
				}
				let _ = tx.send(PageEvent::FrameNavigated {
					frame_id: str_field(frame, "id"),
					url,
					is_main,
				});
			}
		}));

		let tx = self.events_tx.clone();
		let mut rx = self.client.subscribe_event("Fetch.requestPaused");
		pumps.push(tokio::spawn(async move {
			while let Some(params) = rx.recv().await {
				let request = &params["request"];
				let _ = tx.send(PageEvent::Intercepted(InterceptedRequest {
					route_id: str_field(&params, "requestId"),
					url: str_field(request, "url"),
					method: str_field(request, "method"),
					resource_type: params
						.get("resourceType")
						.and_then(Value::as_str)
						.unwrap_or("other")
						.to_lowercase(),
					headers: header_map(request.get("headers")),
				}));
			}
		}));

		let tx = self.events_tx.clone();
		let mut rx = self.client.subscribe_event("Inspector.targetCrashed");
		pumps.push(tokio::spawn(async move {
			while rx.recv().await.is_some() {
				let _ = tx.send(PageEvent::Crashed {
					reason: "target crashed".to_string(),
				});
			}
		}));

		let contexts = Arc::clone(&self.contexts);
		let mut rx = self.client.subscribe_event("Runtime.executionContextCreated");
		pumps.push(tokio::spawn(async move {
			while let Some(params) = rx.recv().await {
				let context = &params["context"];
				let Some(id) = context.get("id").and_then(Value::as_u64) else { continue };
				if let Some(frame_id) = context
					.get("auxData")
					.and_then(|aux| aux.get("frameId"))
					.and_then(Value::as_str)
				{
					contexts.lock().insert(frame_id.to_string(), id);
				}
			}
		}));

		let contexts = Arc::clone(&self.contexts);
		let mut rx = self.client.subscribe_event("Runtime.executionContextsCleared");
		pumps.push(tokio::spawn(async move {
			while rx.recv().await.is_some() {
				contexts.lock().clear();
			}
		}));
	}

	fn ensure_open(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			Err(DriverError::PageClosed)
		} else {
			Ok(())
		}
	}

	async fn eval_raw(&self, target: &EvalTarget, expression: &str) -> Result<Value> {
		let mut params = json!({
			"expression": expression,
			"returnByValue": true,
			"awaitPromise": true,
		});
		if let EvalTarget::Frame(frame_id) = target {
			let context_id = self.contexts.lock().get(frame_id).copied().ok_or_else(|| {
				DriverError::Protocol(format!("no execution context for frame {frame_id}"))
			})?;
			params["contextId"] = json!(context_id);
		}

		let result = self.client.send("Runtime.evaluate", params).await?;
		if let Some(details) = result.get("exceptionDetails") {
			let text = details
				.get("exception")
				.and_then(|e| e.get("description"))
				.and_then(Value::as_str)
				.unwrap_or_else(|| {
					details.get("text").and_then(Value::as_str).unwrap_or("evaluation threw")
				});
			return Err(DriverError::JsEval(text.to_string()));
		}
		Ok(result
			.get("result")
			.and_then(|r| r.get("value"))
			.cloned()
			.unwrap_or(Value::Null))
	}

	/// Polls `predicate_js` (an expression yielding a boolean) until true.
	async fn poll_until(
		&self,
		target: &EvalTarget,
		predicate_js: &str,
		timeout: Duration,
		condition: &str,
	) -> Result<()> {
		let start = Instant::now();
		loop {
			if self.eval_raw(target, predicate_js).await?.as_bool() == Some(true) {
				return Ok(());
			}
			if start.elapsed() >= timeout {
				return Err(DriverError::timeout(timeout, condition));
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}
}

#[async_trait]
impl Page for CdpPage {
	fn events(&self) -> broadcast::Receiver<PageEvent> {
		self.events_tx.subscribe()
	}

	fn url(&self) -> String {
		self.url.lock().clone()
	}

	async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> Result<()> {
		self.ensure_open()?;
		let result = self.client.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
			return Err(DriverError::Navigation {
				url: url.to_string(),
				message: error_text.to_string(),
			});
		}
		*self.url.lock() = url.to_string();

		// Network idle is tracked above the driver; wait for load here.
		let state = match wait_until {
			LoadState::NetworkIdle => LoadState::Load,
			other => other,
		};
		self.wait_for_load(state, timeout).await
	}

	async fn go_back(&self, timeout: Duration) -> Result<()> {
		self.ensure_open()?;
		let history = self.client.send("Page.getNavigationHistory", json!({})).await?;
		let current = history.get("currentIndex").and_then(Value::as_u64).unwrap_or(0);
		if current == 0 {
			return Err(DriverError::Navigation {
				url: self.url(),
				message: "no previous history entry".to_string(),
			});
		}
		let entries = history.get("entries").and_then(Value::as_array).cloned().unwrap_or_default();
		let entry = entries
			.get(current as usize - 1)
			.ok_or_else(|| DriverError::Protocol("navigation history out of range".to_string()))?;
		let entry_id = entry
			.get("id")
			.and_then(Value::as_u64)
			.ok_or_else(|| DriverError::Protocol("history entry has no id".to_string()))?;

		self.client
			.send("Page.navigateToHistoryEntry", json!({ "entryId": entry_id }))
			.await?;
		if let Some(url) = entry.get("url").and_then(Value::as_str) {
			*self.url.lock() = url.to_string();
		}
		self.wait_for_load(LoadState::Load, timeout).await
	}

	async fn evaluate(&self, target: &EvalTarget, expression: &str) -> Result<Value> {
		self.ensure_open()?;
		self.eval_raw(target, expression).await
	}

	async fn wait_for_selector(
		&self,
		target: &EvalTarget,
		selector: &str,
		state: WaitState,
		timeout: Duration,
	) -> Result<()> {
		self.ensure_open()?;
		let sel = serde_json::to_string(selector)
			.map_err(|e| DriverError::Protocol(format!("encode selector: {e}")))?;
		let predicate = match state {
			WaitState::Attached => format!("!!document.querySelector({sel})"),
			WaitState::Detached => format!("!document.querySelector({sel})"),
			WaitState::Visible => format!(
				"(() => {{ const el = document.querySelector({sel}); \
				 return !!el && (el.offsetWidth > 0 || el.offsetHeight > 0 || el.getClientRects().length > 0); }})()"
			),
			WaitState::Hidden => format!(
				"(() => {{ const el = document.querySelector({sel}); \
				 return !el || (el.offsetWidth === 0 && el.offsetHeight === 0 && el.getClientRects().length === 0); }})()"
			),
		};
		self.poll_until(target, &predicate, timeout, &format!("selector {selector}"))
			.await
	}

	async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()> {
		self.ensure_open()?;
		let predicate = match state {
			LoadState::DomContentLoaded => {
				"document.readyState === 'interactive' || document.readyState === 'complete'"
			}
			// NetworkIdle is handled by the request tracker; load is the
			// closest driver-level condition.
			LoadState::Load | LoadState::NetworkIdle => "document.readyState === 'complete'",
		};
		self.poll_until(&EvalTarget::MainFrame, predicate, timeout, "page load").await
	}

	async fn snapshot(&self) -> Result<String> {
		self.ensure_open()?;
		let tree = self.client.send("Accessibility.getFullAXTree", json!({})).await?;
		Ok(snapshot::render(&tree))
	}

	async fn frame_tree(&self) -> Result<Vec<FrameInfo>> {
		self.ensure_open()?;
		let result = self.client.send("Page.getFrameTree", json!({})).await?;
		let mut frames = Vec::new();
		if let Some(root) = result.get("frameTree") {
			collect_frames(root, true, &mut frames);
		}
		Ok(frames)
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		self.ensure_open()?;
		let result = self.client.send("Network.getCookies", json!({})).await?;
		let cookies = result
			.get("cookies")
			.and_then(Value::as_array)
			.map(|list| list.iter().map(cookie_from_cdp).collect())
			.unwrap_or_default();
		Ok(cookies)
	}

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
		self.ensure_open()?;
		let encoded: Vec<Value> = cookies.iter().map(cookie_to_cdp).collect();
		self.client.send("Network.setCookies", json!({ "cookies": encoded })).await?;
		Ok(())
	}

	async fn clear_cookies(&self) -> Result<()> {
		self.ensure_open()?;
		self.client.send("Network.clearBrowserCookies", json!({})).await?;
		Ok(())
	}

	async fn storage_entries(&self, kind: StorageKind) -> Result<BTreeMap<String, String>> {
		self.ensure_open()?;
		let script = format!(
			"(() => {{ const s = {}; const out = {{}}; \
			 for (let i = 0; i < s.length; i++) {{ const k = s.key(i); out[k] = s.getItem(k); }} \
			 return out; }})()",
			kind.js_object()
		);
		let value = self.eval_raw(&EvalTarget::MainFrame, &script).await?;
		let entries = value
			.as_object()
			.map(|map| {
				map.iter()
					.filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
					.collect()
			})
			.unwrap_or_default();
		Ok(entries)
	}

	async fn set_storage(&self, kind: StorageKind, entries: &BTreeMap<String, String>) -> Result<()> {
		self.ensure_open()?;
		let payload = serde_json::to_string(entries)
			.map_err(|e| DriverError::Protocol(format!("encode storage payload: {e}")))?;
		let script = format!(
			"(() => {{ const s = {}; const entries = {payload}; \
			 for (const [k, v] of Object.entries(entries)) s.setItem(k, v); }})()",
			kind.js_object()
		);
		self.eval_raw(&EvalTarget::MainFrame, &script).await.map(|_| ())
	}

	async fn clear_storage(&self, kind: StorageKind) -> Result<()> {
		self.ensure_open()?;
		self.eval_raw(&EvalTarget::MainFrame, &format!("{}.clear()", kind.js_object()))
			.await
			.map(|_| ())
	}

	async fn set_intercepting(&self, enabled: bool) -> Result<()> {
		self.ensure_open()?;
		if enabled {
			self.client
				.send(
					"Fetch.enable",
					json!({ "patterns": [{ "urlPattern": "*" }], "handleAuthRequests": false }),
				)
				.await?;
		} else {
			self.client.send("Fetch.disable", json!({})).await?;
		}
		Ok(())
	}

	async fn resolve_route(&self, route_id: &str, action: RouteAction) -> Result<()> {
		self.ensure_open()?;
		match action {
			RouteAction::Abort => {
				self.client
					.send(
						"Fetch.failRequest",
						json!({ "requestId": route_id, "errorReason": "Aborted" }),
					)
					.await?;
			}
			RouteAction::Fulfill { status, headers, body } => {
				let header_values: Vec<Value> = headers
					.iter()
					.map(|(name, value)| json!({ "name": name, "value": value }))
					.collect();
				let encoded = base64::engine::general_purpose::STANDARD.encode(body.as_bytes());
				self.client
					.send(
						"Fetch.fulfillRequest",
						json!({
							"requestId": route_id,
							"responseCode": status,
							"responseHeaders": header_values,
							"body": encoded,
						}),
					)
					.await?;
			}
			RouteAction::Continue { url, method, headers, post_data } => {
				let mut params = json!({ "requestId": route_id });
				if let Some(url) = url {
					params["url"] = json!(url);
				}
				if let Some(method) = method {
					params["method"] = json!(method);
				}
				if let Some(headers) = headers {
					let header_values: Vec<Value> = headers
						.iter()
						.map(|(name, value)| json!({ "name": name, "value": value }))
						.collect();
					params["headers"] = json!(header_values);
				}
				if let Some(post_data) = post_data {
					let encoded = base64::engine::general_purpose::STANDARD.encode(post_data.as_bytes());
					params["postData"] = json!(encoded);
				}
				self.client.send("Fetch.continueRequest", params).await?;
			}
		}
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		for pump in self.pumps.lock().drain(..) {
			pump.abort();
		}
		if let Err(e) = self
			.browser
			.send("Target.closeTarget", json!({ "targetId": self.target_id }))
			.await
		{
			debug!(target: "cdp", error = %e, "closeTarget failed (may already be closed)");
		}
		Ok(())
	}
}

impl Drop for CdpPage {
	fn drop(&mut self) {
		for pump in self.pumps.lock().drain(..) {
			pump.abort();
		}
	}
}

fn str_field(value: &Value, key: &str) -> String {
	value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn header_map(headers: Option<&Value>) -> HashMap<String, String> {
	headers
		.and_then(Value::as_object)
		.map(|map| {
			map.iter()
				.filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
				.collect()
		})
		.unwrap_or_default()
}

fn collect_frames(node: &Value, is_main: bool, out: &mut Vec<FrameInfo>) {
	if let Some(frame) = node.get("frame") {
		out.push(FrameInfo {
			id: str_field(frame, "id"),
			name: frame
				.get("name")
				.and_then(Value::as_str)
				.filter(|name| !name.is_empty())
				.map(str::to_string),
			url: str_field(frame, "url"),
			is_main,
		});
	}
	if let Some(children) = node.get("childFrames").and_then(Value::as_array) {
		for child in children {
			collect_frames(child, false, out);
		}
	}
}

fn cookie_from_cdp(value: &Value) -> Cookie {
	Cookie {
		name: str_field(value, "name"),
		value: str_field(value, "value"),
		domain: value.get("domain").and_then(Value::as_str).map(str::to_string),
		path: value.get("path").and_then(Value::as_str).map(str::to_string),
		expires: value.get("expires").and_then(Value::as_f64),
		http_only: value.get("httpOnly").and_then(Value::as_bool),
		secure: value.get("secure").and_then(Value::as_bool),
		same_site: value.get("sameSite").and_then(Value::as_str).and_then(|s| match s {
			"Strict" => Some(SameSite::Strict),
			"Lax" => Some(SameSite::Lax),
			"None" => Some(SameSite::None),
			_ => None,
		}),
	}
}

fn cookie_to_cdp(cookie: &Cookie) -> Value {
	let mut value = json!({ "name": cookie.name, "value": cookie.value });
	if let Some(domain) = &cookie.domain {
		value["domain"] = json!(domain);
	}
	if let Some(path) = &cookie.path {
		value["path"] = json!(path);
	}
	if let Some(expires) = cookie.expires {
		value["expires"] = json!(expires);
	}
	if let Some(http_only) = cookie.http_only {
		value["httpOnly"] = json!(http_only);
	}
	if let Some(secure) = cookie.secure {
		value["secure"] = json!(secure);
	}
	if let Some(same_site) = cookie.same_site {
		value["sameSite"] = json!(match same_site {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		});
	}
	value
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cookie_conversion_round_trips_fields() {
		let cdp = json!({
			"name": "s",
			"value": "v",
			"domain": ".example.com",
			"path": "/",
			"expires": 1700000000.0,
			"httpOnly": true,
			"secure": false,
			"sameSite": "Strict"
		});
		let cookie = cookie_from_cdp(&cdp);
		assert_eq!(cookie.name, "s");
		assert_eq!(cookie.same_site, Some(SameSite::Strict));

		let back = cookie_to_cdp(&cookie);
		assert_eq!(back["domain"], ".example.com");
		assert_eq!(back["sameSite"], "Strict");
	}

	#[test]
	fn frame_collection_walks_children() {
		let tree = json!({
			"frame": { "id": "main", "url": "https://example.com" },
			"childFrames": [
				{ "frame": { "id": "child", "name": "sidebar", "url": "https://example.com/side" } }
			]
		});
		let mut frames = Vec::new();
		collect_frames(&tree, true, &mut frames);
		assert_eq!(frames.len(), 2);
		assert!(frames[0].is_main);
		assert_eq!(frames[1].name.as_deref(), Some("sidebar"));
		assert!(!frames[1].is_main);
	}

	#[test]
	fn header_map_keeps_string_values() {
		let headers = json!({ "Content-Type": "text/html", "X-Count": 3 });
		let map = header_map(Some(&headers));
		assert_eq!(map.get("Content-Type").map(String::as_str), Some("text/html"));
		assert!(!map.contains_key("X-Count"));
	}
}
