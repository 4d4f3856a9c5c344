//! Authentication material obtained from the login page.

use serde::{Deserialize, Serialize};
use wxweb_protocol::{BaseRequest, Cookie, LoginTicket, cookie_header};

use crate::config::SessionConfig;

/// Cookie carrying the upload ticket.
pub const DATA_TICKET_COOKIE: &str = "webwx_data_ticket";

/// Cookies plus the ticket fields attached to every authenticated request.
///
/// Valid until logout or until the backend stops recognizing the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
	pub cookies: Vec<Cookie>,
	pub ticket: LoginTicket,
}

impl Credentials {
	pub fn new(cookies: Vec<Cookie>, ticket: LoginTicket) -> Self {
		Self { cookies, ticket }
	}

	/// JSON identity block for `config`'s device.
	pub fn base_request(&self, config: &SessionConfig) -> BaseRequest {
		self.ticket.base_request(&config.device_id)
	}

	/// `Cookie:` header value.
	pub fn cookie_header(&self) -> String {
		cookie_header(&self.cookies)
	}

	/// Value of the named cookie, last one wins.
	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.iter().rev().find(|c| c.name == name).map(|c| c.value.as_str())
	}
}
