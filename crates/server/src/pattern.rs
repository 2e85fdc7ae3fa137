//! URL glob matching for routes and network filters.
//!
//! `*` matches within a path segment, `**` matches across segments, so
//! `https://a.test/*/x` does not match `https://a.test/p/q/x` but
//! `**/x` does.

use glob::{MatchOptions, Pattern};

#[derive(Debug, Clone)]
pub struct UrlPattern {
	raw: String,
	pattern: Pattern,
}

impl UrlPattern {
	/// Compiles a glob pattern, falling back to literal matching on invalid
	/// patterns.
	pub fn new(raw: &str) -> Self {
		let pattern = Pattern::new(raw)
			.unwrap_or_else(|_| Pattern::new(&Pattern::escape(raw)).unwrap_or_default());
		Self {
			raw: raw.to_string(),
			pattern,
		}
	}

	pub fn is_match(&self, url: &str) -> bool {
		let options = MatchOptions {
			// Keeps `*` inside one path segment; `**` still crosses.
			require_literal_separator: true,
			..MatchOptions::default()
		};
		self.pattern.matches_with(url, options)
	}

	/// The original pattern string, used for exact-match removal and listing.
	pub fn as_str(&self) -> &str {
		&self.raw
	}
}

impl PartialEq for UrlPattern {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}

impl Eq for UrlPattern {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn star_stays_within_a_segment() {
		let p = UrlPattern::new("https://a.test/*/x");
		assert!(p.is_match("https://a.test/p/x"));
		assert!(!p.is_match("https://a.test/p/q/x"));
	}

	#[test]
	fn double_star_crosses_segments() {
		let p = UrlPattern::new("**/api/test");
		assert!(p.is_match("https://a.test/api/test"));
		assert!(p.is_match("https://a.test/v2/api/test"));
		assert!(!p.is_match("https://a.test/api/other"));
	}

	#[test]
	fn invalid_pattern_falls_back_to_literal() {
		let p = UrlPattern::new("https://a.test/[oops");
		assert!(p.is_match("https://a.test/[oops"));
		assert!(!p.is_match("https://a.test/x"));
	}

	#[test]
	fn exact_equality_is_on_the_raw_string() {
		assert_eq!(UrlPattern::new("**/x"), UrlPattern::new("**/x"));
		assert_ne!(UrlPattern::new("**/x"), UrlPattern::new("*/x"));
	}
}
