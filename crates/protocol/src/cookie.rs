//! Cookies captured from the login page.
//!
//! Only `name=value` plus domain and path are kept; the rest of the
//! `Set-Cookie` attributes are irrelevant to replaying them on later requests.

use serde::{Deserialize, Serialize};

/// A cookie set by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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
}

impl Cookie {
	/// Creates a new cookie with required fields.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
		}
	}

	/// Sets the domain for the cookie.
	pub fn domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	/// Parses one `Set-Cookie` header value.
	///
	/// Returns `None` when the header has no `name=value` pair.
	pub fn parse_set_cookie(header: &str) -> Option<Self> {
		let mut parts = header.split(';');
		let (name, value) = parts.next()?.split_once('=')?;
		let name = name.trim();
		if name.is_empty() {
			return None;
		}

		let mut cookie = Cookie::new(name, value.trim());
		for attr in parts {
			let Some((key, val)) = attr.split_once('=') else {
				continue;
			};
			match key.trim().to_ascii_lowercase().as_str() {
				"domain" => cookie.domain = Some(val.trim().to_string()),
				"path" => cookie.path = Some(val.trim().to_string()),
				_ => {}
			}
		}
		Some(cookie)
	}
}

/// Renders cookies as a `Cookie:` request header value.
pub fn cookie_header(cookies: &[Cookie]) -> String {
	cookies
		.iter()
		.map(|c| format!("{}={}", c.name, c.value))
		.collect::<Vec<_>>()
		.join("; ")
}
