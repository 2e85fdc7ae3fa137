//! Scriptable in-process driver for tests.
//!
//! [`MockPage`] records every driver call and lets tests script evaluation
//! results, element states, and network behavior. `fetch_from_page` simulates
//! an in-page fetch flowing through the interception machinery exactly like
//! the CDP backend: request event, paused-route event, decision via
//! [`Page::resolve_route`], then the resulting response event (if any).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tabwright_protocol::{Cookie, LoadState, StorageKind, WaitState};
use tokio::sync::{broadcast, oneshot};

use crate::error::{DriverError, Result};
use crate::types::{
	EvalTarget, FrameInfo, InterceptedRequest, PageEvent, RequestEvent, ResponseEvent, RouteAction,
};
use crate::{Browser, Page};

/// Outcome of a simulated in-page fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
	pub url: String,
	pub status: u16,
	pub body: String,
	pub aborted: bool,
}

/// Scripted element presence for selector waits.
#[derive(Debug, Clone, Copy, Default)]
struct ElementState {
	attached: bool,
	visible: bool,
}

#[derive(Default)]
pub struct MockBrowser {
	pages: Mutex<Vec<Arc<MockPage>>>,
	closed: AtomicBool,
}

impl MockBrowser {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Pages created so far, in creation order.
	pub fn pages(&self) -> Vec<Arc<MockPage>> {
		self.pages.lock().clone()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Browser for MockBrowser {
	async fn new_page(&self) -> Result<Arc<dyn Page>> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(DriverError::Connection("browser closed".to_string()));
		}
		let page = Arc::new(MockPage::new());
		self.pages.lock().push(Arc::clone(&page));
		Ok(page as Arc<dyn Page>)
	}

	async fn close(&self) -> Result<()> {
		self.closed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

pub struct MockPage {
	events_tx: broadcast::Sender<PageEvent>,
	url: Mutex<String>,
	history: Mutex<Vec<String>>,
	failing_urls: Mutex<Vec<String>>,
	eval_results: Mutex<HashMap<String, Value>>,
	eval_log: Mutex<Vec<(EvalTarget, String)>>,
	elements: Mutex<HashMap<String, ElementState>>,
	snapshot_text: Mutex<String>,
	frames: Mutex<Vec<FrameInfo>>,
	cookies: Mutex<Vec<Cookie>>,
	local_storage: Mutex<BTreeMap<String, String>>,
	session_storage: Mutex<BTreeMap<String, String>>,
	intercepting: AtomicBool,
	intercept_transitions: Mutex<Vec<bool>>,
	pending_routes: Mutex<HashMap<String, oneshot::Sender<RouteAction>>>,
	resolved_routes: Mutex<Vec<(String, RouteAction)>>,
	passthrough: Mutex<HashMap<String, (u16, String)>>,
	next_id: AtomicU64,
	closed: AtomicBool,
	close_calls: AtomicUsize,
}

impl MockPage {
	fn new() -> Self {
		let (events_tx, _) = broadcast::channel(1024);
		Self {
			events_tx,
			url: Mutex::new("about:blank".to_string()),
			history: Mutex::new(Vec::new()),
			failing_urls: Mutex::new(Vec::new()),
			eval_results: Mutex::new(HashMap::new()),
			eval_log: Mutex::new(Vec::new()),
			elements: Mutex::new(HashMap::new()),
			snapshot_text: Mutex::new("- document".to_string()),
			frames: Mutex::new(vec![FrameInfo {
				id: "frame-main".to_string(),
				name: None,
				url: "about:blank".to_string(),
				is_main: true,
			}]),
			cookies: Mutex::new(Vec::new()),
			local_storage: Mutex::new(BTreeMap::new()),
			session_storage: Mutex::new(BTreeMap::new()),
			intercepting: AtomicBool::new(false),
			intercept_transitions: Mutex::new(Vec::new()),
			pending_routes: Mutex::new(HashMap::new()),
			resolved_routes: Mutex::new(Vec::new()),
			passthrough: Mutex::new(HashMap::new()),
			next_id: AtomicU64::new(1),
			closed: AtomicBool::new(false),
			close_calls: AtomicUsize::new(0),
		}
	}

	// Scripting surface for tests.

	/// Publishes a raw page event to subscribers.
	pub fn emit(&self, event: PageEvent) {
		let _ = self.events_tx.send(event);
	}

	/// Emits a request event, returning its id for later correlation.
	pub fn emit_request(&self, url: &str, method: &str, resource_type: &str) -> String {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
		self.emit(PageEvent::Request(RequestEvent {
			id: id.clone(),
			url: url.to_string(),
			method: method.to_string(),
			resource_type: resource_type.to_string(),
			headers: HashMap::new(),
		}));
		id
	}

	/// Emits a response event correlated to `request_id`.
	pub fn emit_response(&self, request_id: &str, url: &str, status: u16) {
		self.emit(PageEvent::Response(ResponseEvent {
			request_id: request_id.to_string(),
			url: url.to_string(),
			status,
			headers: HashMap::new(),
		}));
	}

	pub fn set_eval_result(&self, expression: &str, value: Value) {
		self.eval_results.lock().insert(expression.to_string(), value);
	}

	/// Expressions evaluated so far, with the frame they targeted.
	pub fn eval_log(&self) -> Vec<(EvalTarget, String)> {
		self.eval_log.lock().clone()
	}

	pub fn set_element(&self, selector: &str, attached: bool, visible: bool) {
		self.elements
			.lock()
			.insert(selector.to_string(), ElementState { attached, visible });
	}

	pub fn set_snapshot(&self, text: &str) {
		*self.snapshot_text.lock() = text.to_string();
	}

	pub fn add_frame(&self, id: &str, name: Option<&str>, url: &str) {
		self.frames.lock().push(FrameInfo {
			id: id.to_string(),
			name: name.map(str::to_string),
			url: url.to_string(),
			is_main: false,
		});
	}

	/// Scripts navigation failure for a URL.
	pub fn fail_navigation(&self, url: &str) {
		self.failing_urls.lock().push(url.to_string());
	}

	/// Scripts the response a non-intercepted (or continued) fetch receives.
	pub fn set_passthrough_response(&self, url: &str, status: u16, body: &str) {
		self.passthrough.lock().insert(url.to_string(), (status, body.to_string()));
	}

	/// History of `set_intercepting` calls, for 0↔1 lifecycle assertions.
	pub fn intercept_transitions(&self) -> Vec<bool> {
		self.intercept_transitions.lock().clone()
	}

	pub fn is_intercepting(&self) -> bool {
		self.intercepting.load(Ordering::SeqCst)
	}

	/// Route decisions applied via `resolve_route`, in order.
	pub fn resolved_routes(&self) -> Vec<(String, RouteAction)> {
		self.resolved_routes.lock().clone()
	}

	pub fn close_calls(&self) -> usize {
		self.close_calls.load(Ordering::SeqCst)
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Simulates the page itself issuing a fetch.
	///
	/// Emits the request event, routes through interception when enabled, and
	/// emits the resulting response event unless the request was aborted.
	pub async fn fetch_from_page(&self, url: &str, method: &str) -> Result<FetchOutcome> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
		self.emit(PageEvent::Request(RequestEvent {
			id: id.clone(),
			url: url.to_string(),
			method: method.to_string(),
			resource_type: "fetch".to_string(),
			headers: HashMap::new(),
		}));

		let action = if self.intercepting.load(Ordering::SeqCst) {
			let (tx, rx) = oneshot::channel();
			self.pending_routes.lock().insert(id.clone(), tx);
			self.emit(PageEvent::Intercepted(InterceptedRequest {
				route_id: id.clone(),
				url: url.to_string(),
				method: method.to_string(),
				resource_type: "fetch".to_string(),
				headers: HashMap::new(),
			}));
			tokio::time::timeout(Duration::from_secs(2), rx)
				.await
				.map_err(|_| DriverError::timeout(Duration::from_secs(2), "route decision"))?
				.map_err(|_| DriverError::Protocol("route decision dropped".to_string()))?
		} else {
			RouteAction::pass_through()
		};

		match action {
			RouteAction::Abort => Ok(FetchOutcome {
				url: url.to_string(),
				status: 0,
				body: String::new(),
				aborted: true,
			}),
			RouteAction::Fulfill { status, body, .. } => {
				self.emit_response(&id, url, status);
				Ok(FetchOutcome {
					url: url.to_string(),
					status,
					body,
					aborted: false,
				})
			}
			RouteAction::Continue { url: override_url, .. } => {
				let final_url = override_url.unwrap_or_else(|| url.to_string());
				let (status, body) = self
					.passthrough
					.lock()
					.get(&final_url)
					.cloned()
					.unwrap_or((200, String::new()));
				self.emit_response(&id, &final_url, status);
				Ok(FetchOutcome {
					url: final_url,
					status,
					body,
					aborted: false,
				})
			}
		}
	}
}

#[async_trait]
impl Page for MockPage {
	fn events(&self) -> broadcast::Receiver<PageEvent> {
		self.events_tx.subscribe()
	}

	fn url(&self) -> String {
		self.url.lock().clone()
	}

	async fn goto(&self, url: &str, _wait_until: LoadState, _timeout: Duration) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(DriverError::PageClosed);
		}
		if self.failing_urls.lock().iter().any(|failing| failing == url) {
			return Err(DriverError::Navigation {
				url: url.to_string(),
				message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
			});
		}
		let previous = {
			let mut slot = self.url.lock();
			std::mem::replace(&mut *slot, url.to_string())
		};
		self.history.lock().push(previous);
		self.emit(PageEvent::FrameNavigated {
			frame_id: "frame-main".to_string(),
			url: url.to_string(),
			is_main: true,
		});
		Ok(())
	}

	async fn go_back(&self, _timeout: Duration) -> Result<()> {
		let Some(previous) = self.history.lock().pop() else {
			return Err(DriverError::Navigation {
				url: self.url(),
				message: "no previous history entry".to_string(),
			});
		};
		*self.url.lock() = previous.clone();
		self.emit(PageEvent::FrameNavigated {
			frame_id: "frame-main".to_string(),
			url: previous,
			is_main: true,
		});
		Ok(())
	}

	async fn evaluate(&self, target: &EvalTarget, expression: &str) -> Result<Value> {
		self.eval_log.lock().push((target.clone(), expression.to_string()));
		Ok(self.eval_results.lock().get(expression).cloned().unwrap_or(Value::Null))
	}

	async fn wait_for_selector(
		&self,
		_target: &EvalTarget,
		selector: &str,
		state: WaitState,
		timeout: Duration,
	) -> Result<()> {
		let element = self.elements.lock().get(selector).copied().unwrap_or_default();
		let satisfied = match state {
			WaitState::Attached => element.attached,
			WaitState::Detached => !element.attached,
			WaitState::Visible => element.attached && element.visible,
			WaitState::Hidden => !element.attached || !element.visible,
		};
		if satisfied {
			Ok(())
		} else {
			Err(DriverError::timeout(timeout, format!("selector {selector}")))
		}
	}

	async fn wait_for_load(&self, _state: LoadState, _timeout: Duration) -> Result<()> {
		Ok(())
	}

	async fn snapshot(&self) -> Result<String> {
		Ok(self.snapshot_text.lock().clone())
	}

	async fn frame_tree(&self) -> Result<Vec<FrameInfo>> {
		Ok(self.frames.lock().clone())
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		Ok(self.cookies.lock().clone())
	}

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
		self.cookies.lock().extend_from_slice(cookies);
		Ok(())
	}

	async fn clear_cookies(&self) -> Result<()> {
		self.cookies.lock().clear();
		Ok(())
	}

	async fn storage_entries(&self, kind: StorageKind) -> Result<BTreeMap<String, String>> {
		Ok(match kind {
			StorageKind::Local => self.local_storage.lock().clone(),
			StorageKind::Session => self.session_storage.lock().clone(),
		})
	}

	async fn set_storage(&self, kind: StorageKind, entries: &BTreeMap<String, String>) -> Result<()> {
		let mut storage = match kind {
			StorageKind::Local => self.local_storage.lock(),
			StorageKind::Session => self.session_storage.lock(),
		};
		for (key, value) in entries {
			storage.insert(key.clone(), value.clone());
		}
		Ok(())
	}

	async fn clear_storage(&self, kind: StorageKind) -> Result<()> {
		match kind {
			StorageKind::Local => self.local_storage.lock().clear(),
			StorageKind::Session => self.session_storage.lock().clear(),
		}
		Ok(())
	}

	async fn set_intercepting(&self, enabled: bool) -> Result<()> {
		self.intercepting.store(enabled, Ordering::SeqCst);
		self.intercept_transitions.lock().push(enabled);
		Ok(())
	}

	async fn resolve_route(&self, route_id: &str, action: RouteAction) -> Result<()> {
		let sender = self.pending_routes.lock().remove(route_id);
		self.resolved_routes.lock().push((route_id.to_string(), action.clone()));
		match sender {
			Some(tx) => {
				let _ = tx.send(action);
				Ok(())
			}
			None => Err(DriverError::Protocol(format!("no paused route {route_id}"))),
		}
	}

	async fn close(&self) -> Result<()> {
		self.close_calls.fetch_add(1, Ordering::SeqCst);
		self.closed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn fetch_without_interception_uses_passthrough_response() {
		let browser = MockBrowser::new();
		let _page = browser.new_page().await.unwrap();
		let page = browser.pages().pop().unwrap();
		page.set_passthrough_response("https://example.com/x", 201, "made");

		let outcome = page.fetch_from_page("https://example.com/x", "GET").await.unwrap();
		assert_eq!(outcome.status, 201);
		assert_eq!(outcome.body, "made");
		assert!(!outcome.aborted);
	}

	#[tokio::test]
	async fn intercepted_fetch_waits_for_route_decision() {
		let browser = MockBrowser::new();
		let _page = browser.new_page().await.unwrap();
		let page = browser.pages().pop().unwrap();
		page.set_intercepting(true).await.unwrap();

		let mut events = page.events();
		let fetcher = Arc::clone(&page);
		let handle =
			tokio::spawn(async move { fetcher.fetch_from_page("https://example.com/api", "GET").await });

		// First the request event, then the paused route.
		let route_id = loop {
			match events.recv().await.unwrap() {
				PageEvent::Intercepted(paused) => break paused.route_id,
				_ => continue,
			}
		};
		page.resolve_route(
			&route_id,
			RouteAction::Fulfill {
				status: 200,
				headers: vec![],
				body: "{\"mocked\":true}".to_string(),
			},
		)
		.await
		.unwrap();

		let outcome = handle.await.unwrap().unwrap();
		assert_eq!(outcome.status, 200);
		assert_eq!(outcome.body, "{\"mocked\":true}");
	}

	#[tokio::test]
	async fn go_back_restores_previous_url() {
		let browser = MockBrowser::new();
		let _page = browser.new_page().await.unwrap();
		let page = browser.pages().pop().unwrap();

		page.goto("https://a.test/", LoadState::Load, Duration::from_secs(1)).await.unwrap();
		page.goto("https://b.test/", LoadState::Load, Duration::from_secs(1)).await.unwrap();
		page.go_back(Duration::from_secs(1)).await.unwrap();
		assert_eq!(page.url(), "https://a.test/");

		page.go_back(Duration::from_secs(1)).await.unwrap();
		assert!(page.go_back(Duration::from_secs(1)).await.is_err());
	}
}
