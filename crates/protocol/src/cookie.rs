//! Browser cookie types.

use serde::{Deserialize, Serialize};

/// SameSite cookie attribute.
///
/// Controls when cookies are sent with cross-site requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	/// Cookie is sent with same-site and cross-site requests
	#[serde(rename = "None")]
	None,
	/// Cookie is sent with same-site requests and cross-site top-level navigations
	#[default]
	#[serde(rename = "Lax")]
	Lax,
	/// Cookie is only sent with same-site requests
	#[serde(rename = "Strict")]
	Strict,
}

/// A browser cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	/// Cookie name
	pub name: String,

	/// Cookie value
	pub value: String,

	/// Domain for the cookie
	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,

	/// Path for the cookie
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,

	/// Unix timestamp in seconds (-1 means session cookie)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,

	/// Whether the cookie is HTTP-only
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,

	/// Whether the cookie requires HTTPS
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,

	/// SameSite attribute
	#[serde(skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

impl Cookie {
	/// Creates a new cookie with required fields.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: Some(domain.into()),
			path: None,
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
		}
	}

	/// Sets the path for the cookie.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Sets the expiration timestamp.
	pub fn expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Sets whether the cookie is HTTP-only.
	pub fn http_only(mut self, http_only: bool) -> Self {
		self.http_only = Some(http_only);
		self
	}

	/// Sets whether the cookie requires HTTPS.
	pub fn secure(mut self, secure: bool) -> Self {
		self.secure = Some(secure);
		self
	}

	/// Sets the SameSite attribute.
	pub fn same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = Some(same_site);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cookie_serializes_camel_case_without_empty_fields() {
		let cookie = Cookie::new("session", "token", ".example.com").http_only(true);
		let json = serde_json::to_value(&cookie).unwrap();
		assert_eq!(json["name"], "session");
		assert_eq!(json["domain"], ".example.com");
		assert_eq!(json["httpOnly"], true);
		assert!(json.get("sameSite").is_none());
		assert!(json.get("expires").is_none());
	}

	#[test]
	fn same_site_round_trips_capitalized() {
		let json = serde_json::to_string(&SameSite::Lax).unwrap();
		assert_eq!(json, "\"Lax\"");
		let parsed: SameSite = serde_json::from_str("\"Strict\"").unwrap();
		assert_eq!(parsed, SameSite::Strict);
	}
}
