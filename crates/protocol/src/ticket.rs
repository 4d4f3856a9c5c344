//! Login page XML: the session ticket handed out after a confirmed scan.
//!
//! The body looks like
//! `<error><ret>0</ret><message></message><skey>@crypt_..</skey><wxsid>..</wxsid><wxuin>..</wxuin><pass_ticket>..</pass_ticket></error>`.

use serde::{Deserialize, Serialize};

use crate::base::BaseRequest;
use crate::error::{DecodeError, Result};

/// Ticket fields every authenticated request carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginTicket {
	pub skey: String,
	pub sid: String,
	pub uin: i64,
	pub pass_ticket: String,
}

impl LoginTicket {
	/// Builds the JSON identity block for `device_id`.
	pub fn base_request(&self, device_id: &str) -> BaseRequest {
		BaseRequest {
			uin: self.uin,
			sid: self.sid.clone(),
			skey: self.skey.clone(),
			device_id: device_id.to_string(),
		}
	}
}

/// Decoded login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
	pub ret: i64,
	pub message: String,
	/// Present only when `ret` is zero.
	pub ticket: Option<LoginTicket>,
}

impl LoginResponse {
	pub fn from_xml(body: &str) -> Result<Self> {
		let ret = required(body, "ret")?
			.trim()
			.parse::<i64>()
			.map_err(|_| DecodeError::WrongType { field: "ret", expected: "integer" })?;
		let message = xml_field(body, "message").unwrap_or_default().to_string();

		if ret != 0 {
			return Ok(Self { ret, message, ticket: None });
		}

		let uin = required(body, "wxuin")?
			.trim()
			.parse::<i64>()
			.map_err(|_| DecodeError::WrongType { field: "wxuin", expected: "integer" })?;
		let ticket = LoginTicket {
			skey: required(body, "skey")?.to_string(),
			sid: required(body, "wxsid")?.to_string(),
			uin,
			pass_ticket: required(body, "pass_ticket")?.to_string(),
		};

		Ok(Self {
			ret,
			message,
			ticket: Some(ticket),
		})
	}
}

fn required<'a>(body: &'a str, tag: &'static str) -> Result<&'a str> {
	xml_field(body, tag).ok_or(DecodeError::Missing { field: tag })
}

/// Text between `<tag>` and `</tag>`, first occurrence only.
fn xml_field<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
	let open = format!("<{tag}>");
	let close = format!("</{tag}>");
	let start = body.find(&open)? + open.len();
	let end = body[start..].find(&close)? + start;
	Some(&body[start..end])
}
