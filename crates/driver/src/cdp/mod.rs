//! Chrome DevTools Protocol backend.
//!
//! Talks to a Chromium-family browser over its debugging WebSocket. The
//! browser is either launched locally with a remote-debugging port or
//! attached to via an existing CDP endpoint.

mod browser;
mod client;
mod launch;
mod page;
mod snapshot;

pub use browser::CdpBrowser;
pub use client::CdpClient;
pub use launch::LaunchOptions;
