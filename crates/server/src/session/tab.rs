//! One logical tab: a page handle plus its frame, network, and route state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tabwright_driver::{EvalTarget, Page, PageEvent};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::frame::FrameContext;
use crate::error::{Error, Result};
use crate::network::RequestTracker;
use crate::routes::RouteRegistry;

/// Wraps one page handle and owns everything scoped to it.
///
/// The event pump subscribes to the page's event stream and keeps the
/// request log, the frame context, and route resolution current without any
/// tool call being in flight.
pub struct Tab {
	index: usize,
	page: Arc<dyn Page>,
	frame: Arc<Mutex<FrameContext>>,
	/// Bumped on every top-level navigation.
	generation: Arc<AtomicU64>,
	tracker: Arc<RequestTracker>,
	routes: Arc<RouteRegistry>,
	/// Serializes tool execution against this tab.
	exec_lock: tokio::sync::Mutex<()>,
	pump: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
}

impl Tab {
	pub fn new(index: usize, page: Arc<dyn Page>) -> Arc<Self> {
		let tab = Arc::new(Self {
			index,
			page,
			frame: Arc::new(Mutex::new(FrameContext::main(0))),
			generation: Arc::new(AtomicU64::new(0)),
			tracker: Arc::new(RequestTracker::new()),
			routes: Arc::new(RouteRegistry::new()),
			exec_lock: tokio::sync::Mutex::new(()),
			pump: Mutex::new(None),
			closed: AtomicBool::new(false),
		});
		let handle = tab.spawn_pump();
		*tab.pump.lock() = Some(handle);
		tab
	}

	fn spawn_pump(&self) -> JoinHandle<()> {
		let mut events = self.page.events();
		let page = Arc::clone(&self.page);
		let frame = Arc::clone(&self.frame);
		let generation = Arc::clone(&self.generation);
		let tracker = Arc::clone(&self.tracker);
		let routes = Arc::clone(&self.routes);
		let index = self.index;

		tokio::spawn(async move {
			loop {
				let event = match events.recv().await {
					Ok(event) => event,
					Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
						warn!(target: "session", tab = index, missed, "event pump lagged");
						continue;
					}
					Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
				};

				match event {
					PageEvent::Request(request) => tracker.record_request(request),
					PageEvent::Response(response) => tracker.record_response(response),
					PageEvent::FrameNavigated { url, is_main, .. } => {
						if is_main {
							// Reset to the main frame synchronously with the
							// navigation, never lazily.
							let next = generation.fetch_add(1, Ordering::SeqCst) + 1;
							*frame.lock() = FrameContext::main(next);
							debug!(target: "session", tab = index, %url, "top-level navigation");
						}
					}
					PageEvent::Intercepted(request) => {
						routes.handle_intercepted(&page, request).await;
					}
					PageEvent::Crashed { reason } => {
						warn!(target: "session", tab = index, %reason, "page crashed");
					}
				}
			}
		})
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn page(&self) -> &Arc<dyn Page> {
		&self.page
	}

	pub fn url(&self) -> String {
		self.page.url()
	}

	pub fn tracker(&self) -> &Arc<RequestTracker> {
		&self.tracker
	}

	pub fn routes(&self) -> &Arc<RouteRegistry> {
		&self.routes
	}

	pub fn exec_lock(&self) -> &tokio::sync::Mutex<()> {
		&self.exec_lock
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// The evaluation target of the current frame selection.
	///
	/// A selection stamped with an older navigation generation is stale:
	/// main silently re-stamps, a child frame fails with `FrameNotFound`.
	pub fn frame_target(&self) -> Result<EvalTarget> {
		let current = self.generation.load(Ordering::SeqCst);
		let mut ctx = self.frame.lock();
		if ctx.generation() != current {
			if !ctx.is_main() {
				return Err(Error::FrameNotFound(ctx.label().to_string()));
			}
			*ctx = FrameContext::main(current);
		}
		Ok(ctx.target().clone())
	}

	pub fn current_frame_label(&self) -> String {
		self.frame.lock().label().to_string()
	}

	/// Selects a frame by id, name, or URL; `None` selects the main frame.
	pub async fn switch_frame(&self, selector: Option<&str>) -> Result<()> {
		let generation = self.generation.load(Ordering::SeqCst);
		let Some(selector) = selector else {
			*self.frame.lock() = FrameContext::main(generation);
			return Ok(());
		};

		let frames = self
			.page
			.frame_tree()
			.await
			.map_err(|e| Error::driver("browser_switch_frame", e))?;
		let found = frames
			.iter()
			.find(|f| f.id == selector || f.name.as_deref() == Some(selector) || f.url == selector)
			.ok_or_else(|| Error::FrameNotFound(selector.to_string()))?;

		*self.frame.lock() = FrameContext::select(found, selector, generation);
		Ok(())
	}

	/// Closes the underlying page. Idempotent; driver errors during close
	/// are logged and swallowed.
	pub async fn close(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		if let Some(handle) = self.pump.lock().take() {
			handle.abort();
		}
		if let Err(e) = self.page.close().await {
			debug!(target: "session", tab = self.index, error = %e, "page close failed");
		}
	}
}

impl Drop for Tab {
	fn drop(&mut self) {
		if let Some(handle) = self.pump.lock().take() {
			handle.abort();
		}
	}
}
