//! Chromium discovery and launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::process::{Child, Command};
use tracing::info;

use crate::error::{DriverError, Result};

/// Options for launching a local Chromium-family browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub headless: bool,
	/// Profile directory; a temp-style path is created if absent.
	pub user_data_dir: Option<PathBuf>,
	/// Explicit binary path, otherwise discovered from well-known locations.
	pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			headless: true,
			user_data_dir: None,
			executable: None,
		}
	}
}

/// A launched browser process plus its debugging endpoint.
pub struct LaunchedBrowser {
	pub child: Child,
	pub port: u16,
	pub ws_url: String,
}

/// Launches a browser with a remote-debugging port and waits for CDP readiness.
pub async fn launch(options: &LaunchOptions) -> Result<LaunchedBrowser> {
	let binary = match &options.executable {
		Some(path) => path.clone(),
		None => find_browser_binary()
			.ok_or_else(|| DriverError::Launch("no chromium-family browser found".to_string()))?,
	};

	let port = find_free_port().await?;
	let user_data_dir = match &options.user_data_dir {
		Some(dir) => dir.clone(),
		None => std::env::temp_dir().join(format!("tabwright-profile-{port}")),
	};
	std::fs::create_dir_all(&user_data_dir)
		.map_err(|e| DriverError::Launch(format!("create user data dir: {e}")))?;

	let args = browser_args(port, &user_data_dir, options.headless);

	info!(
		target: "cdp",
		binary = %binary.display(),
		port,
		headless = options.headless,
		"launching browser"
	);

	let child = Command::new(&binary)
		.args(&args)
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.kill_on_drop(true)
		.spawn()
		.map_err(|e| DriverError::Launch(format!("spawn {}: {e}", binary.display())))?;

	let ws_url = wait_for_endpoint(port, Duration::from_secs(15)).await?;

	Ok(LaunchedBrowser { child, port, ws_url })
}

/// Resolves the browser-level WebSocket URL of an already-running browser
/// from its HTTP debugging endpoint (e.g. `http://localhost:9222`).
pub async fn discover_ws_url(http_endpoint: &str) -> Result<String> {
	let url = format!("{}/json/version", http_endpoint.trim_end_matches('/'));
	let body: Value = reqwest::get(&url)
		.await
		.map_err(|e| DriverError::Connection(format!("query {url}: {e}")))?
		.json()
		.await
		.map_err(|e| DriverError::Connection(format!("parse {url}: {e}")))?;

	body.get("webSocketDebuggerUrl")
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| DriverError::Connection(format!("{url} returned no webSocketDebuggerUrl")))
}

/// Resolves a page target's WebSocket URL via `/json/list`, retrying while
/// the target registers.
pub async fn target_ws_url(http_base: &str, target_id: &str) -> Result<String> {
	let url = format!("{}/json/list", http_base.trim_end_matches('/'));

	for attempt in 0..10 {
		if attempt > 0 {
			tokio::time::sleep(Duration::from_millis(300)).await;
		}
		let Ok(resp) = reqwest::get(&url).await else { continue };
		let Ok(targets) = resp.json::<Vec<Value>>().await else { continue };

		for target in &targets {
			if target.get("id").and_then(Value::as_str) == Some(target_id) {
				if let Some(ws) = target.get("webSocketDebuggerUrl").and_then(Value::as_str) {
					return Ok(ws.to_string());
				}
			}
		}
	}

	Err(DriverError::Connection(format!(
		"no WebSocket URL for target {target_id} after retries"
	)))
}

async fn wait_for_endpoint(port: u16, timeout: Duration) -> Result<String> {
	let start = Instant::now();
	let url = format!("http://127.0.0.1:{port}/json/version");

	loop {
		if start.elapsed() > timeout {
			return Err(DriverError::Launch(format!(
				"CDP endpoint not ready after {}s on port {port}",
				timeout.as_secs()
			)));
		}

		if let Ok(resp) = reqwest::get(&url).await {
			if let Ok(body) = resp.json::<Value>().await {
				if let Some(ws) = body.get("webSocketDebuggerUrl").and_then(Value::as_str) {
					return Ok(ws.to_string());
				}
			}
		}

		tokio::time::sleep(Duration::from_millis(200)).await;
	}
}

async fn find_free_port() -> Result<u16> {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
		.await
		.map_err(|e| DriverError::Launch(format!("bind for free port: {e}")))?;
	let port = listener
		.local_addr()
		.map_err(|e| DriverError::Launch(format!("local addr: {e}")))?
		.port();
	drop(listener);
	Ok(port)
}

fn browser_args(port: u16, user_data_dir: &Path, headless: bool) -> Vec<String> {
	let mut args = vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", user_data_dir.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
		"--disable-background-networking".to_string(),
		"--disable-extensions".to_string(),
		"--disable-sync".to_string(),
		"--metrics-recording-only".to_string(),
		"--password-store=basic".to_string(),
	];
	if headless {
		args.push("--headless=new".to_string());
	}
	args.push("--window-size=1280,720".to_string());
	args.push("about:blank".to_string());
	args
}

fn find_browser_binary() -> Option<PathBuf> {
	let candidates: &[&str] = if cfg!(target_os = "macos") {
		&[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
	} else if cfg!(target_os = "linux") {
		&[
			"google-chrome",
			"google-chrome-stable",
			"chromium",
			"chromium-browser",
			"microsoft-edge",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium",
		]
	} else {
		&[
			r"C:\Program Files\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
		]
	};

	for candidate in candidates {
		let path = Path::new(candidate);
		if path.exists() {
			return Some(path.to_path_buf());
		}
		if !candidate.contains('/') && !candidate.contains('\\') {
			if let Ok(found) = which::which(candidate) {
				return Some(found);
			}
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn headless_flag_is_conditional() {
		let dir = PathBuf::from("/tmp/profile");
		let headless = browser_args(9222, &dir, true);
		assert!(headless.iter().any(|a| a == "--headless=new"));

		let headed = browser_args(9222, &dir, false);
		assert!(!headed.iter().any(|a| a.starts_with("--headless")));
		assert!(headed.iter().any(|a| a == "--remote-debugging-port=9222"));
	}
}
