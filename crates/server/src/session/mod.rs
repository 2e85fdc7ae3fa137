//! The long-lived session: one browser connection and its tabs.

mod frame;
mod tab;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tabwright_driver::Browser;
use tracing::{debug, info};

pub use frame::FrameContext;
pub use tab::Tab;

use crate::capability::CapabilitySet;
use crate::error::{Error, Result};

/// One advertised tab in a `browser_tabs_list` result.
#[derive(Debug, Clone)]
pub struct TabSummary {
	pub index: usize,
	pub url: String,
	pub active: bool,
}

/// Owns the browser connection, the capability set, and the tab collection.
///
/// Tab indices are stable: closing a tab retires its slot and later tabs
/// keep their indices. Closing the active tab re-activates the most recently
/// created live tab.
pub struct SessionContext {
	browser: Arc<dyn Browser>,
	capabilities: CapabilitySet,
	tabs: Mutex<Vec<Option<Arc<Tab>>>>,
	active: Mutex<Option<usize>>,
	default_timeout: Duration,
	keep_browser_alive: bool,
}

impl SessionContext {
	pub fn new(
		browser: Arc<dyn Browser>,
		capabilities: CapabilitySet,
		default_timeout: Duration,
		keep_browser_alive: bool,
	) -> Arc<Self> {
		Arc::new(Self {
			browser,
			capabilities,
			tabs: Mutex::new(Vec::new()),
			active: Mutex::new(None),
			default_timeout,
			keep_browser_alive,
		})
	}

	pub fn capabilities(&self) -> &CapabilitySet {
		&self.capabilities
	}

	pub fn default_timeout(&self) -> Duration {
		self.default_timeout
	}

	/// The active tab, or `NoActiveTab`.
	pub fn current_tab(&self) -> Result<Arc<Tab>> {
		let active = (*self.active.lock()).ok_or(Error::NoActiveTab)?;
		self.tab_at(active)
	}

	/// The active tab, lazily creating the first one.
	pub async fn ensure_tab(&self) -> Result<Arc<Tab>> {
		if let Ok(tab) = self.current_tab() {
			return Ok(tab);
		}
		self.new_tab().await
	}

	/// Creates and activates a new tab.
	pub async fn new_tab(&self) -> Result<Arc<Tab>> {
		let page = self
			.browser
			.new_page()
			.await
			.map_err(|e| Error::driver("browser_tab_new", e))?;

		let tab = {
			let mut tabs = self.tabs.lock();
			let index = tabs.len();
			let tab = Tab::new(index, page);
			tabs.push(Some(Arc::clone(&tab)));
			*self.active.lock() = Some(index);
			tab
		};
		info!(target: "session", tab = tab.index(), "tab created");
		Ok(tab)
	}

	/// Activates the tab at `index`.
	pub fn select_tab(&self, index: usize) -> Result<Arc<Tab>> {
		let tab = self.tab_at(index)?;
		*self.active.lock() = Some(index);
		Ok(tab)
	}

	/// Closes the tab at `index` (the active tab if `None`), retires its
	/// slot, and re-activates the most recently created live tab.
	pub async fn close_tab(&self, index: Option<usize>) -> Result<usize> {
		let index = match index {
			Some(index) => index,
			None => (*self.active.lock()).ok_or(Error::NoActiveTab)?,
		};
		let tab = self.tab_at(index)?;
		tab.close().await;

		let next_active = {
			let mut tabs = self.tabs.lock();
			tabs[index] = None;
			tabs.iter()
				.enumerate()
				.rev()
				.find_map(|(i, slot)| slot.as_ref().map(|_| i))
		};
		{
			let mut active = self.active.lock();
			if *active == Some(index) {
				*active = next_active;
			}
		}
		info!(target: "session", tab = index, active = ?next_active, "tab closed");
		Ok(index)
	}

	/// Live tabs in index order, with the active one marked.
	pub fn tabs(&self) -> Vec<TabSummary> {
		let active = *self.active.lock();
		self.tabs
			.lock()
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| {
				slot.as_ref().map(|tab| TabSummary {
					index,
					url: tab.url(),
					active: active == Some(index),
				})
			})
			.collect()
	}

	fn tab_at(&self, index: usize) -> Result<Arc<Tab>> {
		self.tabs
			.lock()
			.get(index)
			.and_then(|slot| slot.clone())
			.ok_or(Error::NoActiveTab)
	}

	/// Tears the session down: closes all tabs, then the browser unless it
	/// is configured to outlive the session. Cleanup errors are swallowed.
	pub async fn shutdown(&self) {
		let tabs: Vec<Arc<Tab>> = self.tabs.lock().iter().flatten().cloned().collect();
		for tab in tabs {
			tab.close().await;
		}
		self.tabs.lock().clear();
		*self.active.lock() = None;

		if self.keep_browser_alive {
			debug!(target: "session", "leaving browser alive on shutdown");
			return;
		}
		if let Err(e) = self.browser.close().await {
			debug!(target: "session", error = %e, "browser close failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use tabwright_driver::mock::MockBrowser;

	use super::*;

	fn session(browser: Arc<MockBrowser>) -> Arc<SessionContext> {
		SessionContext::new(browser, CapabilitySet::all(), Duration::from_secs(5), false)
	}

	#[tokio::test]
	async fn ensure_tab_creates_lazily_once() {
		let browser = MockBrowser::new();
		let session = session(Arc::clone(&browser));

		assert!(matches!(session.current_tab(), Err(Error::NoActiveTab)));
		let first = session.ensure_tab().await.unwrap();
		let second = session.ensure_tab().await.unwrap();
		assert_eq!(first.index(), second.index());
		assert_eq!(browser.pages().len(), 1);
	}

	#[tokio::test]
	async fn closing_active_tab_reactivates_most_recent_live() {
		let browser = MockBrowser::new();
		let session = session(Arc::clone(&browser));

		session.new_tab().await.unwrap(); // 0
		session.new_tab().await.unwrap(); // 1
		session.new_tab().await.unwrap(); // 2, active

		session.close_tab(None).await.unwrap();
		assert_eq!(session.current_tab().unwrap().index(), 1);

		// Indices are retired, not compacted.
		let listed = session.tabs();
		let indices: Vec<usize> = listed.iter().map(|t| t.index).collect();
		assert_eq!(indices, [0, 1]);
	}

	#[tokio::test]
	async fn closing_inactive_tab_keeps_the_active_one() {
		let browser = MockBrowser::new();
		let session = session(Arc::clone(&browser));

		session.new_tab().await.unwrap(); // 0
		session.new_tab().await.unwrap(); // 1, active
		session.close_tab(Some(0)).await.unwrap();
		assert_eq!(session.current_tab().unwrap().index(), 1);
	}

	#[tokio::test]
	async fn closing_the_last_tab_leaves_no_active() {
		let browser = MockBrowser::new();
		let session = session(Arc::clone(&browser));

		session.new_tab().await.unwrap();
		session.close_tab(None).await.unwrap();
		assert!(matches!(session.current_tab(), Err(Error::NoActiveTab)));
		assert!(session.tabs().is_empty());
	}

	#[tokio::test]
	async fn shutdown_leaves_the_browser_alive_when_asked() {
		let browser = MockBrowser::new();
		let keep_alive = SessionContext::new(
			Arc::clone(&browser) as Arc<dyn Browser>,
			CapabilitySet::all(),
			Duration::from_secs(5),
			true,
		);
		keep_alive.new_tab().await.unwrap();
		keep_alive.shutdown().await;
		assert!(!browser.is_closed());
	}

	#[tokio::test]
	async fn shutdown_closes_the_browser_by_default() {
		let browser = MockBrowser::new();
		let owned = session(Arc::clone(&browser));
		owned.new_tab().await.unwrap();
		owned.shutdown().await;
		assert!(browser.is_closed());
	}
}
