//! CLI surface and the owned server configuration it resolves into.

use std::time::Duration;

use clap::Parser;

use crate::capability::CapabilitySet;

#[derive(Debug, Parser)]
#[command(name = "tabwright", about = "Capability-gated browser tool server over stdio")]
pub struct Cli {
	/// Capabilities to enable beyond `core` (comma-separated:
	/// javascript, frames, storage, network). Default: all.
	#[arg(long, value_delimiter = ',')]
	pub caps: Option<Vec<String>>,

	/// Attach to a running browser's HTTP debugging endpoint
	/// (e.g. http://localhost:9222) instead of launching one.
	#[arg(long)]
	pub cdp_endpoint: Option<String>,

	/// Launch the browser with a visible window.
	#[arg(long)]
	pub headed: bool,

	/// Leave the browser running when the server shuts down.
	#[arg(long)]
	pub keep_browser_alive: bool,

	/// Default deadline for navigations and waits, in milliseconds.
	#[arg(long, default_value_t = 30_000)]
	pub timeout_ms: u64,

	/// Increase log verbosity (-v, -vv).
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

/// Resolved configuration the server runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub capabilities: CapabilitySet,
	pub cdp_endpoint: Option<String>,
	pub headless: bool,
	pub keep_browser_alive: bool,
	pub default_timeout: Duration,
}

impl ServerConfig {
	pub fn from_cli(cli: &Cli) -> std::result::Result<Self, String> {
		let capabilities = match &cli.caps {
			None => CapabilitySet::all(),
			Some(names) => CapabilitySet::from_names(names)?,
		};
		Ok(Self {
			capabilities,
			cdp_endpoint: cli.cdp_endpoint.clone(),
			headless: !cli.headed,
			keep_browser_alive: cli.keep_browser_alive,
			default_timeout: Duration::from_millis(cli.timeout_ms),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_enables_all_capabilities() {
		let cli = Cli::parse_from(["tabwright"]);
		let config = ServerConfig::from_cli(&cli).unwrap();
		assert!(config.capabilities.contains(crate::capability::Capability::Network));
		assert!(config.headless);
		assert_eq!(config.default_timeout, Duration::from_millis(30_000));
	}

	#[test]
	fn caps_flag_narrows_the_set() {
		let cli = Cli::parse_from(["tabwright", "--caps", "storage,frames"]);
		let config = ServerConfig::from_cli(&cli).unwrap();
		assert!(config.capabilities.contains(crate::capability::Capability::Storage));
		assert!(!config.capabilities.contains(crate::capability::Capability::Network));
	}

	#[test]
	fn unknown_capability_is_rejected() {
		let cli = Cli::parse_from(["tabwright", "--caps", "telepathy"]);
		assert!(ServerConfig::from_cli(&cli).is_err());
	}
}
