//! Insertion-ordered request/response log with live event fan-out.

use indexmap::IndexMap;
use parking_lot::Mutex;
use tabwright_driver::{RequestEvent, ResponseEvent};
use tokio::sync::broadcast;

use crate::pattern::UrlPattern;

/// One logged request and, once received, its response.
#[derive(Debug, Clone)]
pub struct LogEntry {
	pub request: RequestEvent,
	pub response: Option<ResponseEvent>,
}

/// A log event re-broadcast to live subscribers (waits, idle detection).
#[derive(Debug, Clone)]
pub enum TrackerEvent {
	Request(RequestEvent),
	Response(ResponseEvent),
}

/// Filter clauses for request projections; clauses compose as logical AND.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
	pub url: Option<UrlPattern>,
	pub method: Option<String>,
	pub resource_type: Option<String>,
}

impl RequestFilter {
	fn matches(&self, request: &RequestEvent) -> bool {
		if let Some(url) = &self.url {
			if !url.is_match(&request.url) {
				return false;
			}
		}
		if let Some(method) = &self.method {
			if !method.eq_ignore_ascii_case(&request.method) {
				return false;
			}
		}
		if let Some(resource_type) = &self.resource_type {
			if resource_type != &request.resource_type {
				return false;
			}
		}
		true
	}
}

/// Filter clauses for response projections.
#[derive(Debug, Clone, Default)]
pub struct ResponseFilter {
	pub url: Option<UrlPattern>,
	pub status: Option<u16>,
	/// Inclusive `[min, max]` status range.
	pub status_range: Option<(u16, u16)>,
}

impl ResponseFilter {
	fn matches(&self, response: &ResponseEvent) -> bool {
		if let Some(url) = &self.url {
			if !url.is_match(&response.url) {
				return false;
			}
		}
		if let Some(status) = self.status {
			if response.status != status {
				return false;
			}
		}
		if let Some((min, max)) = self.status_range {
			if response.status < min || response.status > max {
				return false;
			}
		}
		true
	}
}

/// Ordered per-tab log correlating requests to responses.
///
/// Entries are appended in the order the driver emits them and are never
/// removed until the tab closes. Every recorded event is also re-broadcast
/// so waits observe it without polling the log.
pub struct RequestTracker {
	log: Mutex<IndexMap<String, LogEntry>>,
	events: broadcast::Sender<TrackerEvent>,
}

impl Default for RequestTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl RequestTracker {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(256);
		Self {
			log: Mutex::new(IndexMap::new()),
			events,
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.events.subscribe()
	}

	pub fn record_request(&self, request: RequestEvent) {
		self.log.lock().insert(
			request.id.clone(),
			LogEntry {
				request: request.clone(),
				response: None,
			},
		);
		let _ = self.events.send(TrackerEvent::Request(request));
	}

	pub fn record_response(&self, response: ResponseEvent) {
		if let Some(entry) = self.log.lock().get_mut(&response.request_id) {
			entry.response = Some(response.clone());
		}
		// Responses without a logged request still feed waits and idle.
		let _ = self.events.send(TrackerEvent::Response(response));
	}

	/// Requests satisfying every filter clause, preserving arrival order.
	pub fn requests(&self, filter: &RequestFilter) -> Vec<RequestEvent> {
		self.log
			.lock()
			.values()
			.filter(|entry| filter.matches(&entry.request))
			.map(|entry| entry.request.clone())
			.collect()
	}

	/// Received responses satisfying every filter clause, in log order.
	pub fn responses(&self, filter: &ResponseFilter) -> Vec<ResponseEvent> {
		self.log
			.lock()
			.values()
			.filter_map(|entry| entry.response.as_ref())
			.filter(|response| filter.matches(response))
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		self.log.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.log.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn request(id: &str, url: &str, method: &str, resource_type: &str) -> RequestEvent {
		RequestEvent {
			id: id.to_string(),
			url: url.to_string(),
			method: method.to_string(),
			resource_type: resource_type.to_string(),
			headers: HashMap::new(),
		}
	}

	fn response(request_id: &str, url: &str, status: u16) -> ResponseEvent {
		ResponseEvent {
			request_id: request_id.to_string(),
			url: url.to_string(),
			status,
			headers: HashMap::new(),
		}
	}

	#[test]
	fn filters_compose_as_and_preserving_order() {
		let tracker = RequestTracker::new();
		tracker.record_request(request("1", "https://a.test/one.js", "GET", "script"));
		tracker.record_request(request("2", "https://a.test/two.js", "POST", "script"));
		tracker.record_request(request("3", "https://a.test/three.css", "GET", "stylesheet"));
		tracker.record_request(request("4", "https://a.test/four.js", "GET", "script"));

		let filter = RequestFilter {
			url: Some(UrlPattern::new("**/*.js")),
			method: Some("GET".to_string()),
			resource_type: Some("script".to_string()),
		};
		let matched = tracker.requests(&filter);
		let urls: Vec<&str> = matched.iter().map(|r| r.url.as_str()).collect();
		assert_eq!(urls, ["https://a.test/one.js", "https://a.test/four.js"]);
	}

	#[test]
	fn responses_fill_their_request_entry() {
		let tracker = RequestTracker::new();
		tracker.record_request(request("1", "https://a.test/x", "GET", "fetch"));
		assert!(tracker.responses(&ResponseFilter::default()).is_empty());

		tracker.record_response(response("1", "https://a.test/x", 200));
		let responses = tracker.responses(&ResponseFilter::default());
		assert_eq!(responses.len(), 1);
		assert_eq!(responses[0].status, 200);
	}

	#[test]
	fn status_range_is_inclusive() {
		let tracker = RequestTracker::new();
		tracker.record_request(request("1", "https://a.test/a", "GET", "fetch"));
		tracker.record_request(request("2", "https://a.test/b", "GET", "fetch"));
		tracker.record_response(response("1", "https://a.test/a", 404));
		tracker.record_response(response("2", "https://a.test/b", 500));

		let filter = ResponseFilter {
			status_range: Some((400, 499)),
			..ResponseFilter::default()
		};
		let matched = tracker.responses(&filter);
		assert_eq!(matched.len(), 1);
		assert_eq!(matched[0].status, 404);
	}
}
