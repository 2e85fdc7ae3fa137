//! Browser-level CDP connection and page creation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::process::Child;
use tracing::{debug, info};

use super::client::CdpClient;
use super::launch::{self, LaunchOptions};
use super::page::CdpPage;
use crate::error::{DriverError, Result};
use crate::{Browser, Page};

/// A Chromium-family browser reachable over CDP.
///
/// Either launched as a child process or attached to via an existing
/// debugging endpoint. Owns the browser-level WebSocket connection; each
/// page gets its own target-level connection.
pub struct CdpBrowser {
	client: Arc<CdpClient>,
	http_base: String,
	child: Mutex<Option<Child>>,
}

impl CdpBrowser {
	/// Launches a local browser and connects to it.
	pub async fn launch(options: LaunchOptions) -> Result<Self> {
		let launched = launch::launch(&options).await?;
		let client = CdpClient::connect(&launched.ws_url).await?;
		info!(target: "cdp", port = launched.port, "browser launched");

		Ok(Self {
			client: Arc::new(client),
			http_base: format!("http://127.0.0.1:{}", launched.port),
			child: Mutex::new(Some(launched.child)),
		})
	}

	/// Attaches to an already-running browser by its HTTP debugging endpoint.
	pub async fn connect(http_endpoint: &str) -> Result<Self> {
		let ws_url = launch::discover_ws_url(http_endpoint).await?;
		let client = CdpClient::connect(&ws_url).await?;
		info!(target: "cdp", endpoint = http_endpoint, "attached to browser");

		Ok(Self {
			client: Arc::new(client),
			http_base: http_endpoint.trim_end_matches('/').to_string(),
			child: Mutex::new(None),
		})
	}
}

#[async_trait]
impl Browser for CdpBrowser {
	async fn new_page(&self) -> Result<Arc<dyn Page>> {
		let result = self
			.client
			.send("Target.createTarget", json!({ "url": "about:blank" }))
			.await?;
		let target_id = result
			.get("targetId")
			.and_then(Value::as_str)
			.ok_or_else(|| DriverError::Protocol("createTarget returned no targetId".to_string()))?
			.to_string();

		let ws_url = launch::target_ws_url(&self.http_base, &target_id).await?;
		let page = CdpPage::attach(Arc::clone(&self.client), target_id, &ws_url).await?;
		Ok(Arc::new(page) as Arc<dyn Page>)
	}

	async fn close(&self) -> Result<()> {
		// Graceful close first; the process kill is a fallback.
		if let Err(e) = self.client.send("Browser.close", json!({})).await {
			debug!(target: "cdp", error = %e, "Browser.close failed (may already be closed)");
		}
		if let Some(mut child) = self.child.lock().take() {
			let _ = child.start_kill();
		}
		Ok(())
	}
}
