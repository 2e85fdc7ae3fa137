//! Browser driver seam for the tabwright server.
//!
//! The dispatch core never talks to a browser directly; it consumes the
//! [`Browser`] and [`Page`] traits defined here. The production backend is
//! [`cdp`] (Chrome DevTools Protocol over WebSocket); tests use the
//! scriptable [`mock`] backend (feature `mock`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tabwright_protocol::{Cookie, LoadState, StorageKind, WaitState};
use tokio::sync::broadcast;

pub mod cdp;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod types;

pub use error::{DriverError, Result};
pub use types::{
	EvalTarget, FrameInfo, InterceptedRequest, PageEvent, RequestEvent, RequestId, ResponseEvent,
	RouteAction,
};

/// A connected browser that can open pages.
///
/// Exclusively owned by one session; pages it creates are exclusively owned
/// by one tab each.
#[async_trait]
pub trait Browser: Send + Sync {
	/// Opens a fresh page (tab).
	async fn new_page(&self) -> Result<Arc<dyn Page>>;

	/// Closes the browser and all its pages. Idempotent.
	async fn close(&self) -> Result<()>;
}

/// One browser page and the operations the tool surface needs from it.
///
/// All waits take explicit timeouts; a timeout stops waiting but does not
/// abort driver work already in flight.
#[async_trait]
pub trait Page: Send + Sync {
	/// Subscribes to this page's event stream.
	///
	/// Events are emitted in the order the underlying driver reports them.
	fn events(&self) -> broadcast::Receiver<PageEvent>;

	/// Last committed main-frame URL.
	fn url(&self) -> String;

	async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> Result<()>;

	async fn go_back(&self, timeout: Duration) -> Result<()>;

	/// Evaluates a JavaScript expression in the given frame, returning its
	/// JSON value.
	async fn evaluate(&self, target: &EvalTarget, expression: &str) -> Result<serde_json::Value>;

	/// Waits until an element matching `selector` reaches `state` in the
	/// given frame.
	async fn wait_for_selector(
		&self,
		target: &EvalTarget,
		selector: &str,
		state: WaitState,
		timeout: Duration,
	) -> Result<()>;

	/// Waits for `load` or `domcontentloaded`. Network idle is tracked above
	/// the driver and must not be requested here.
	async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()>;

	/// Captures a structural text snapshot of the page (accessibility tree).
	async fn snapshot(&self) -> Result<String>;

	/// Current frame tree, main frame first.
	async fn frame_tree(&self) -> Result<Vec<FrameInfo>>;

	async fn cookies(&self) -> Result<Vec<Cookie>>;

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()>;

	async fn clear_cookies(&self) -> Result<()>;

	async fn storage_entries(&self, kind: StorageKind) -> Result<BTreeMap<String, String>>;

	async fn set_storage(&self, kind: StorageKind, entries: &BTreeMap<String, String>) -> Result<()>;

	async fn clear_storage(&self, kind: StorageKind) -> Result<()>;

	/// Enables or disables request interception. While enabled, every request
	/// surfaces as [`PageEvent::Intercepted`] and stays paused until
	/// [`resolve_route`](Self::resolve_route) is called for it.
	async fn set_intercepting(&self, enabled: bool) -> Result<()>;

	/// Applies a decision to a paused request.
	async fn resolve_route(&self, route_id: &str, action: RouteAction) -> Result<()>;

	/// Closes the page. Idempotent; closing an already-closed page is a no-op.
	async fn close(&self) -> Result<()>;
}
