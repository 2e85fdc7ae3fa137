//! Driver-level event and value types consumed by the dispatch core.

use std::collections::HashMap;

/// Identifier of a request within one page, stable across its response.
pub type RequestId = String;

/// Outbound request metadata as emitted by the driver.
#[derive(Debug, Clone)]
pub struct RequestEvent {
	pub id: RequestId,
	pub url: String,
	pub method: String,
	/// Driver-reported resource type (`document`, `xhr`, `fetch`, `image`, ...),
	/// lowercased.
	pub resource_type: String,
	pub headers: HashMap<String, String>,
}

/// Response metadata correlated to an earlier [`RequestEvent`] by id.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
	pub request_id: RequestId,
	pub url: String,
	pub status: u16,
	pub headers: HashMap<String, String>,
}

impl ResponseEvent {
	/// `true` for 2xx statuses.
	pub fn ok(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// A request paused by network interception, awaiting a [`RouteAction`]
/// via [`Page::resolve_route`](crate::Page::resolve_route).
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
	pub route_id: String,
	pub url: String,
	pub method: String,
	pub resource_type: String,
	pub headers: HashMap<String, String>,
}

/// Decision applied to an intercepted request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteAction {
	/// Terminate the request with a network error.
	Abort,
	/// Short-circuit with a synthetic response.
	Fulfill {
		status: u16,
		headers: Vec<(String, String)>,
		body: String,
	},
	/// Forward the request, optionally with overrides.
	Continue {
		url: Option<String>,
		method: Option<String>,
		headers: Option<Vec<(String, String)>>,
		post_data: Option<String>,
	},
}

impl RouteAction {
	/// Continue with no overrides; the default for unmatched requests.
	pub fn pass_through() -> Self {
		Self::Continue {
			url: None,
			method: None,
			headers: None,
			post_data: None,
		}
	}
}

/// Events a page emits on its broadcast channel.
#[derive(Debug, Clone)]
pub enum PageEvent {
	Request(RequestEvent),
	Response(ResponseEvent),
	FrameNavigated {
		frame_id: String,
		url: String,
		is_main: bool,
	},
	Intercepted(InterceptedRequest),
	Crashed {
		reason: String,
	},
}

/// One frame in the page's current frame tree.
#[derive(Debug, Clone)]
pub struct FrameInfo {
	pub id: String,
	pub name: Option<String>,
	pub url: String,
	pub is_main: bool,
}

/// Frame an evaluation or selector wait targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalTarget {
	MainFrame,
	Frame(String),
}
