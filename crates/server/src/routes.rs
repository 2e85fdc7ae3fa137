//! Per-tab request-interception rules.
//!
//! Rules are an ordered list consulted synchronously per intercepted request;
//! the most recently registered matching rule wins. Driver-level interception
//! is installed when the rule count goes 0→1 and torn down on 1→0, keeping
//! the subscription lifecycle explicit.

use std::sync::Arc;

use parking_lot::Mutex;
use tabwright_driver::{InterceptedRequest, Page, RouteAction};
use tracing::debug;

use crate::pattern::UrlPattern;

/// What to do with a request matching a route's pattern.
#[derive(Debug, Clone)]
pub enum RouteDecision {
	Abort,
	Fulfill {
		status: u16,
		body: String,
		headers: Vec<(String, String)>,
		content_type: Option<String>,
	},
	Continue {
		url: Option<String>,
		method: Option<String>,
		headers: Option<Vec<(String, String)>>,
		post_data: Option<String>,
	},
}

impl RouteDecision {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Abort => "abort",
			Self::Fulfill { .. } => "fulfill",
			Self::Continue { .. } => "continue",
		}
	}

	fn to_action(&self) -> RouteAction {
		match self {
			Self::Abort => RouteAction::Abort,
			Self::Fulfill {
				status,
				body,
				headers,
				content_type,
			} => {
				let mut headers = headers.clone();
				// An explicit content-type header wins over the shorthand.
				if let Some(ct) = content_type {
					let present = headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
					if !present {
						headers.push(("content-type".to_string(), ct.clone()));
					}
				}
				RouteAction::Fulfill {
					status: *status,
					headers,
					body: body.clone(),
				}
			}
			Self::Continue {
				url,
				method,
				headers,
				post_data,
			} => RouteAction::Continue {
				url: url.clone(),
				method: method.clone(),
				headers: headers.clone(),
				post_data: post_data.clone(),
			},
		}
	}
}

struct RouteRule {
	pattern: UrlPattern,
	decision: RouteDecision,
}

/// Ordered interception rules for one tab.
pub struct RouteRegistry {
	rules: Mutex<Vec<RouteRule>>,
}

impl Default for RouteRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl RouteRegistry {
	pub fn new() -> Self {
		Self {
			rules: Mutex::new(Vec::new()),
		}
	}

	/// Appends a rule, or replaces the existing rule with the same pattern.
	/// Installs driver interception on the first rule.
	pub async fn add(
		&self,
		page: &Arc<dyn Page>,
		pattern: UrlPattern,
		decision: RouteDecision,
	) -> tabwright_driver::Result<()> {
		let install = {
			let mut rules = self.rules.lock();
			let was_empty = rules.is_empty();
			match rules.iter_mut().find(|rule| rule.pattern == pattern) {
				Some(existing) => existing.decision = decision,
				None => rules.push(RouteRule { pattern, decision }),
			}
			was_empty
		};
		if install {
			page.set_intercepting(true).await?;
		}
		Ok(())
	}

	/// Removes the rule with exactly this pattern string. Tears down driver
	/// interception when the last rule goes. Returns whether a rule existed.
	pub async fn remove(
		&self,
		page: &Arc<dyn Page>,
		pattern: &str,
	) -> tabwright_driver::Result<bool> {
		let (removed, uninstall) = {
			let mut rules = self.rules.lock();
			let before = rules.len();
			rules.retain(|rule| rule.pattern.as_str() != pattern);
			let removed = rules.len() < before;
			(removed, removed && rules.is_empty())
		};
		if uninstall {
			page.set_intercepting(false).await?;
		}
		Ok(removed)
	}

	/// `(pattern, decision kind)` pairs in registration order.
	pub fn list(&self) -> Vec<(String, &'static str)> {
		self.rules
			.lock()
			.iter()
			.map(|rule| (rule.pattern.as_str().to_string(), rule.decision.kind()))
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.lock().is_empty()
	}

	/// Resolves one intercepted request: most recently registered matching
	/// rule wins; no match continues unmodified.
	pub async fn handle_intercepted(&self, page: &Arc<dyn Page>, request: InterceptedRequest) {
		let action = self
			.rules
			.lock()
			.iter()
			.rev()
			.find(|rule| rule.pattern.is_match(&request.url))
			.map(|rule| rule.decision.to_action())
			.unwrap_or_else(RouteAction::pass_through);

		debug!(
			target: "routes",
			url = %request.url,
			route_id = %request.route_id,
			"resolving intercepted request"
		);
		if let Err(e) = page.resolve_route(&request.route_id, action).await {
			debug!(target: "routes", error = %e, "route resolution failed");
		}
	}
}
