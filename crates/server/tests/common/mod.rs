//! Shared harness: a dispatcher wired to the scriptable driver.

use std::sync::Arc;
use std::time::Duration;

use tabwright::capability::CapabilitySet;
use tabwright::session::SessionContext;
use tabwright::tools::{Dispatcher, ToolRegistry};
use tabwright_driver::mock::MockBrowser;
use tabwright_protocol::{ContentBlock, ToolResult};

pub fn harness(caps: CapabilitySet) -> (Arc<MockBrowser>, Arc<Dispatcher>) {
	let browser = MockBrowser::new();
	let session = SessionContext::new(
		Arc::clone(&browser) as Arc<dyn tabwright_driver::Browser>,
		caps,
		Duration::from_secs(5),
		false,
	);
	let dispatcher = Arc::new(Dispatcher::new(ToolRegistry::builtin(), session));
	(browser, dispatcher)
}

pub fn text_of(result: &ToolResult) -> String {
	result
		.content
		.iter()
		.map(|block| match block {
			ContentBlock::Text { text } => text.as_str(),
		})
		.collect::<Vec<_>>()
		.join("\n")
}
