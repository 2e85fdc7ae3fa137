//! Dispatcher pipeline behavior: gating, validation, tab policies, and
//! post-execution synchronization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{harness, text_of};
use serde_json::json;
use tabwright::capability::CapabilitySet;
use tabwright::Error;

#[tokio::test]
async fn disabled_and_missing_tools_fail_identically() {
	let (_browser, dispatcher) = harness(CapabilitySet::core_only());

	let disabled = dispatcher
		.dispatch("browser_evaluate", &json!({"expression": "1"}))
		.await
		.unwrap_err();
	let missing = dispatcher.dispatch("browser_levitate", &json!({})).await.unwrap_err();

	assert_eq!(disabled.to_tool_error().code, "UNKNOWN_TOOL");
	assert_eq!(missing.to_tool_error().code, "UNKNOWN_TOOL");
	// Same message shape, no hint that one exists behind a capability.
	assert!(disabled.to_string().starts_with("unknown tool:"));
	assert!(missing.to_string().starts_with("unknown tool:"));
}

#[tokio::test]
async fn validation_failure_precedes_any_side_effect() {
	let (browser, dispatcher) = harness(CapabilitySet::all());

	let err = dispatcher
		.dispatch("browser_navigate", &json!({"url": 5}))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Validation { ref field, .. } if field == "url"));

	// ensure_tab never ran: no page was created.
	assert!(browser.pages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn navigate_attaches_a_snapshot_after_idle() {
	let (browser, dispatcher) = harness(CapabilitySet::all());

	let result = dispatcher
		.dispatch("browser_navigate", &json!({"url": "https://a.test/"}))
		.await
		.unwrap();

	assert_eq!(browser.pages().len(), 1);
	assert_eq!(result.content.len(), 2);
	let text = text_of(&result);
	assert!(text.contains("Navigated to https://a.test/"));
	assert!(text.contains("### Page state"));
	assert!(text.contains("url: https://a.test/"));
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_is_classified_as_driver_error() {
	let (browser, dispatcher) = harness(CapabilitySet::all());

	// First navigation creates the page so it can be scripted to fail.
	dispatcher
		.dispatch("browser_navigate", &json!({"url": "https://a.test/"}))
		.await
		.unwrap();
	browser.pages()[0].fail_navigation("https://broken.test/");

	let err = dispatcher
		.dispatch("browser_navigate", &json!({"url": "https://broken.test/"}))
		.await
		.unwrap_err();
	let wire = err.to_tool_error();
	assert_eq!(wire.code, "DRIVER_ERROR");
	assert!(wire.message.contains("browser_navigate"));
	assert!(wire.message.contains("ERR_NAME_NOT_RESOLVED"));
}

#[tokio::test]
async fn require_policy_fails_without_a_tab() {
	let (_browser, dispatcher) = harness(CapabilitySet::all());

	let err = dispatcher
		.dispatch("browser_evaluate", &json!({"expression": "1 + 1"}))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::NoActiveTab));
}

#[tokio::test]
async fn ensure_policy_creates_the_first_tab() {
	let (browser, dispatcher) = harness(CapabilitySet::all());

	let result = dispatcher.dispatch("browser_snapshot", &json!({})).await.unwrap();
	assert_eq!(browser.pages().len(), 1);
	assert!(text_of(&result).contains("### Page state"));
}

#[tokio::test(start_paused = true)]
async fn closing_the_active_tab_reactivates_the_most_recent_remaining() {
	let (_browser, dispatcher) = harness(CapabilitySet::all());

	for _ in 0..3 {
		dispatcher.dispatch("browser_tab_new", &json!({})).await.unwrap();
	}
	dispatcher.dispatch("browser_tab_close", &json!({})).await.unwrap();

	let listing = dispatcher.dispatch("browser_tabs_list", &json!({})).await.unwrap();
	let text = text_of(&listing);
	assert!(text.contains("- 1: about:blank (active)"), "got: {text}");
	assert!(!text.contains("- 2:"));
}

#[tokio::test(start_paused = true)]
async fn tab_select_activates_by_index_and_rejects_retired_slots() {
	let (_browser, dispatcher) = harness(CapabilitySet::all());

	dispatcher.dispatch("browser_tab_new", &json!({})).await.unwrap();
	dispatcher.dispatch("browser_tab_new", &json!({})).await.unwrap();
	dispatcher.dispatch("browser_tab_close", &json!({"index": 0})).await.unwrap();

	let err = dispatcher
		.dispatch("browser_tab_select", &json!({"index": 0}))
		.await
		.unwrap_err();
	assert_eq!(err.to_tool_error().code, "INVALID_INPUT");

	let ok = dispatcher
		.dispatch("browser_tab_select", &json!({"index": 1}))
		.await
		.unwrap();
	assert!(text_of(&ok).contains("Selected tab 1"));
}

#[tokio::test(start_paused = true)]
async fn tab_lock_covers_the_effects_phase() {
	let (_browser, dispatcher) = harness(CapabilitySet::all());
	dispatcher
		.dispatch("browser_navigate", &json!({"url": "https://a.test/"}))
		.await
		.unwrap();

	// Call A parks in its post-navigation idle wait with the tab lock held.
	let nav = Arc::clone(&dispatcher);
	let a = tokio::spawn(async move {
		nav.dispatch("browser_navigate", &json!({"url": "https://a.test/next"})).await
	});
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert!(!a.is_finished());

	// Call B on the same tab must queue behind A's effects, not slip in
	// between A's handler and A's snapshot.
	let eval = Arc::clone(&dispatcher);
	let b = tokio::spawn(async move {
		eval.dispatch("browser_evaluate", &json!({"expression": "1"})).await
	});
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert!(!a.is_finished());
	assert!(!b.is_finished());

	a.await.unwrap().unwrap();
	b.await.unwrap().unwrap();
}

#[tokio::test]
async fn unexpected_argument_is_rejected_by_name() {
	let (_browser, dispatcher) = harness(CapabilitySet::all());

	let err = dispatcher
		.dispatch("browser_snapshot", &json!({"surprise": true}))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Validation { ref field, .. } if field == "surprise"));
}
