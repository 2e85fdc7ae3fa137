//! Low-level CDP WebSocket client: command correlation and event fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use crate::error::{DriverError, Result};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;
type ListenerMap = Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Value>>>>>;

/// A CDP WebSocket client bound to one target (browser or page).
///
/// Commands are correlated to responses by id; events fan out to per-method
/// subscribers registered with [`subscribe_event`](Self::subscribe_event).
pub struct CdpClient {
	ws_tx: mpsc::Sender<String>,
	pending: PendingMap,
	next_id: AtomicU64,
	listeners: ListenerMap,
	reader: JoinHandle<()>,
	writer: JoinHandle<()>,
}

impl CdpClient {
	/// Connects to a CDP WebSocket endpoint.
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let (stream, _) = connect_async(ws_url)
			.await
			.map_err(|e| DriverError::Connection(format!("connect to {ws_url} failed: {e}")))?;
		let (mut sink, mut source) = stream.split();

		let (ws_tx, mut ws_rx) = mpsc::channel::<String>(256);
		let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
		let listeners: ListenerMap = Arc::new(Mutex::new(HashMap::new()));

		let writer = tokio::spawn(async move {
			while let Some(msg) = ws_rx.recv().await {
				if let Err(e) = sink.send(Message::Text(msg.into())).await {
					error!(target: "cdp", error = %e, "websocket write failed");
					break;
				}
			}
		});

		let pending_reader = Arc::clone(&pending);
		let listeners_reader = Arc::clone(&listeners);
		let reader = tokio::spawn(async move {
			while let Some(msg) = source.next().await {
				match msg {
					Ok(Message::Text(text)) => {
						let Ok(value) = serde_json::from_str::<Value>(&text) else {
							continue;
						};
						if let Some(id) = value.get("id").and_then(Value::as_u64) {
							if let Some(tx) = pending_reader.lock().remove(&id) {
								let _ = tx.send(value);
							}
						} else if let Some(method) = value.get("method").and_then(Value::as_str) {
							let params = value.get("params").cloned().unwrap_or(Value::Null);
							let listeners = listeners_reader.lock();
							if let Some(senders) = listeners.get(method) {
								for tx in senders {
									// Slow subscribers drop events rather than
									// stalling the protocol reader.
									let _ = tx.try_send(params.clone());
								}
							}
						}
					}
					Ok(Message::Close(_)) => {
						debug!(target: "cdp", "websocket closed by peer");
						break;
					}
					Err(e) => {
						warn!(target: "cdp", error = %e, "websocket read failed");
						break;
					}
					_ => {}
				}
			}
		});

		Ok(Self {
			ws_tx,
			pending,
			next_id: AtomicU64::new(1),
			listeners,
			reader,
			writer,
		})
	}

	/// Sends a command and awaits its response's `result` payload.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let msg = json!({ "id": id, "method": method, "params": params });

		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		self.ws_tx
			.send(msg.to_string())
			.await
			.map_err(|_| DriverError::Connection("websocket writer gone".to_string()))?;

		match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
			Ok(Ok(response)) => {
				if let Some(err) = response.get("error") {
					Err(DriverError::Protocol(format!("{method}: {err}")))
				} else {
					Ok(response.get("result").cloned().unwrap_or(Value::Null))
				}
			}
			Ok(Err(_)) => Err(DriverError::Connection("response channel closed".to_string())),
			Err(_) => {
				self.pending.lock().remove(&id);
				Err(DriverError::timeout(COMMAND_TIMEOUT, format!("CDP command {method}")))
			}
		}
	}

	/// Subscribes to a CDP event method, receiving its `params` payloads.
	pub fn subscribe_event(&self, method: &str) -> mpsc::Receiver<Value> {
		let (tx, rx) = mpsc::channel(256);
		self.listeners.lock().entry(method.to_string()).or_default().push(tx);
		rx
	}

	/// Enables a CDP domain (`Page`, `Runtime`, `Network`, ...).
	pub async fn enable_domain(&self, domain: &str) -> Result<()> {
		self.send(&format!("{domain}.enable"), json!({})).await.map(|_| ())
	}
}

impl Drop for CdpClient {
	fn drop(&mut self) {
		self.reader.abort();
		self.writer.abort();
	}
}
