//! Capability tags and the session's fixed capability set.
//!
//! Tools declare a required capability; the session is constructed with a set
//! that never changes for its lifetime. `core` is always enabled.

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	Core,
	Javascript,
	Frames,
	Storage,
	Network,
}

impl Capability {
	pub const ALL: &'static [Capability] = &[
		Capability::Core,
		Capability::Javascript,
		Capability::Frames,
		Capability::Storage,
		Capability::Network,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Core => "core",
			Self::Javascript => "javascript",
			Self::Frames => "frames",
			Self::Storage => "storage",
			Self::Network => "network",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"core" => Some(Self::Core),
			"javascript" => Some(Self::Javascript),
			"frames" => Some(Self::Frames),
			"storage" => Some(Self::Storage),
			"network" => Some(Self::Network),
			_ => None,
		}
	}
}

impl fmt::Display for Capability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The set of capabilities a session was constructed with.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
	enabled: HashSet<Capability>,
}

impl CapabilitySet {
	/// Just `core`.
	pub fn core_only() -> Self {
		Self {
			enabled: HashSet::from([Capability::Core]),
		}
	}

	pub fn all() -> Self {
		Self {
			enabled: Capability::ALL.iter().copied().collect(),
		}
	}

	/// Parses a list of capability names. `core` is implied and need not be
	/// listed; unknown names are rejected.
	pub fn from_names<S: AsRef<str>>(names: &[S]) -> std::result::Result<Self, String> {
		let mut enabled = HashSet::from([Capability::Core]);
		for name in names {
			let name = name.as_ref();
			let cap = Capability::parse(name).ok_or_else(|| format!("unknown capability: {name}"))?;
			enabled.insert(cap);
		}
		Ok(Self { enabled })
	}

	pub fn contains(&self, cap: Capability) -> bool {
		cap == Capability::Core || self.enabled.contains(&cap)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn core_is_always_enabled() {
		let caps = CapabilitySet::from_names::<&str>(&[]).unwrap();
		assert!(caps.contains(Capability::Core));
		assert!(!caps.contains(Capability::Network));
	}

	#[test]
	fn from_names_rejects_unknown() {
		let err = CapabilitySet::from_names(&["network", "telepathy"]).unwrap_err();
		assert!(err.contains("telepathy"));
	}

	#[test]
	fn from_names_enables_listed() {
		let caps = CapabilitySet::from_names(&["storage", "frames"]).unwrap();
		assert!(caps.contains(Capability::Storage));
		assert!(caps.contains(Capability::Frames));
		assert!(!caps.contains(Capability::Javascript));
	}
}
