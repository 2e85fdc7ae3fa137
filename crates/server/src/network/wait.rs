//! Wait predicates over the live tracker stream.
//!
//! A wait races a fresh subscription against a deadline. The outcome is an
//! explicit value, not an error; the dispatcher converts `TimedOut` into the
//! caller-visible timeout. Dropping the future discards the subscription, so
//! an event arriving after the deadline can never resolve an abandoned wait.

use std::time::Duration;

use tabwright_driver::{RequestEvent, ResponseEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::warn;

use super::tracker::{RequestTracker, TrackerEvent};
use crate::pattern::UrlPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
	Request,
	Response,
}

#[derive(Debug, Clone)]
pub enum WaitOutcome {
	MatchedRequest(RequestEvent),
	MatchedResponse(ResponseEvent),
	TimedOut,
}

impl RequestTracker {
	/// Waits for the first event of `kind` whose URL matches `pattern`.
	///
	/// Only events arriving after the call are considered.
	pub async fn wait_for(
		&self,
		kind: WaitKind,
		pattern: &UrlPattern,
		timeout: Duration,
	) -> WaitOutcome {
		let mut events = self.subscribe();
		let deadline = Instant::now() + timeout;

		loop {
			let event = match tokio::time::timeout_at(deadline, events.recv()).await {
				Err(_) => return WaitOutcome::TimedOut,
				// A lagged receiver may have dropped the matching event; the
				// wait keeps going, but not silently.
				Ok(Err(RecvError::Lagged(missed))) => {
					warn!(target: "network", missed, "wait subscription lagged");
					continue;
				}
				Ok(Err(RecvError::Closed)) => continue,
				Ok(Ok(event)) => event,
			};

			match (kind, event) {
				(WaitKind::Request, TrackerEvent::Request(request))
					if pattern.is_match(&request.url) =>
				{
					return WaitOutcome::MatchedRequest(request);
				}
				(WaitKind::Response, TrackerEvent::Response(response))
					if pattern.is_match(&response.url) =>
				{
					return WaitOutcome::MatchedResponse(response);
				}
				_ => {}
			}
		}
	}

	/// Waits until no tracker event has arrived for `quiet_window`, bounded
	/// by `timeout`. Returns `false` if the page never went quiet in time.
	pub async fn wait_for_idle(&self, quiet_window: Duration, timeout: Duration) -> bool {
		let mut events = self.subscribe();
		let deadline = Instant::now() + timeout;

		loop {
			let quiet_until = Instant::now() + quiet_window;
			if quiet_until >= deadline {
				// Not enough budget left for a full quiet window; one last
				// truncated wait decides it.
				return tokio::time::timeout_at(deadline, events.recv()).await.is_err();
			}
			if tokio::time::timeout_at(quiet_until, events.recv()).await.is_err() {
				return true;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::sync::Arc;

	use super::*;

	fn request(id: &str, url: &str) -> RequestEvent {
		RequestEvent {
			id: id.to_string(),
			url: url.to_string(),
			method: "GET".to_string(),
			resource_type: "fetch".to_string(),
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

	#[tokio::test]
	async fn wait_resolves_with_first_matching_response() {
		let tracker = Arc::new(RequestTracker::new());
		let waiter = Arc::clone(&tracker);
		let wait = tokio::spawn(async move {
			waiter
				.wait_for(WaitKind::Response, &UrlPattern::new("**/x"), Duration::from_secs(5))
				.await
		});
		tokio::task::yield_now().await;

		tracker.record_request(request("1", "https://a.test/other"));
		tracker.record_response(response("1", "https://a.test/other", 200));
		tracker.record_request(request("2", "https://a.test/x"));
		tracker.record_response(response("2", "https://a.test/x", 201));

		match wait.await.unwrap() {
			WaitOutcome::MatchedResponse(resp) => {
				assert_eq!(resp.url, "https://a.test/x");
				assert_eq!(resp.status, 201);
			}
			other => panic!("unexpected outcome: {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn wait_times_out_and_late_events_do_not_resolve_it() {
		let tracker = Arc::new(RequestTracker::new());
		let waiter = Arc::clone(&tracker);
		let wait = tokio::spawn(async move {
			waiter
				.wait_for(WaitKind::Request, &UrlPattern::new("**/x"), Duration::from_millis(100))
				.await
		});

		tokio::time::sleep(Duration::from_millis(200)).await;
		let outcome = wait.await.unwrap();
		assert!(matches!(outcome, WaitOutcome::TimedOut));

		// The subscription died with the wait; recording now must not panic
		// or resurrect anything.
		tracker.record_request(request("1", "https://a.test/x"));
		assert_eq!(tracker.len(), 1);
	}

	#[tokio::test]
	async fn lagged_subscription_still_resolves_on_a_later_match() {
		let tracker = Arc::new(RequestTracker::new());
		let waiter = Arc::clone(&tracker);
		let wait = tokio::spawn(async move {
			waiter
				.wait_for(WaitKind::Request, &UrlPattern::new("**/target"), Duration::from_secs(5))
				.await
		});
		tokio::task::yield_now().await;

		// Overflow the subscription's buffer while the waiter is parked, then
		// emit the match it is actually after.
		for i in 0..300 {
			tracker.record_request(request(&i.to_string(), "https://a.test/noise"));
		}
		tracker.record_request(request("match", "https://a.test/target"));

		match wait.await.unwrap() {
			WaitOutcome::MatchedRequest(req) => assert_eq!(req.url, "https://a.test/target"),
			other => panic!("unexpected outcome: {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn idle_waits_out_the_quiet_window() {
		let tracker = Arc::new(RequestTracker::new());
		let idler = Arc::clone(&tracker);
		let idle = tokio::spawn(async move {
			idler
				.wait_for_idle(Duration::from_millis(500), Duration::from_secs(5))
				.await
		});
		tokio::task::yield_now().await;

		// Activity resets the window.
		tokio::time::sleep(Duration::from_millis(300)).await;
		tracker.record_request(request("1", "https://a.test/x"));
		tokio::time::sleep(Duration::from_millis(600)).await;

		assert!(idle.await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn idle_gives_up_at_the_deadline() {
		let tracker = Arc::new(RequestTracker::new());
		let idler = Arc::clone(&tracker);
		let idle = tokio::spawn(async move {
			idler
				.wait_for_idle(Duration::from_millis(500), Duration::from_millis(800))
				.await
		});
		tokio::task::yield_now().await;

		for i in 0..10 {
			tokio::time::sleep(Duration::from_millis(200)).await;
			tracker.record_request(request(&i.to_string(), "https://a.test/busy"));
		}

		assert!(!idle.await.unwrap());
	}
}
