//! Session-init and contact-list bodies.

use serde::{Deserialize, Serialize};

use crate::base::BaseResponse;
use crate::error::Result;
use crate::message::GROUP_MARKER;
use crate::sync_key::SyncKeyList;

/// The bot's own account, fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelfIdentity {
	pub user_name: String,
	#[serde(default)]
	pub nick_name: String,
}

/// A contact as returned by the contact-list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
	pub user_name: String,
	#[serde(default)]
	pub nick_name: String,
	#[serde(default)]
	pub remark_name: String,
}

impl Contact {
	pub fn is_group(&self) -> bool {
		self.user_name.contains(GROUP_MARKER)
	}

	/// Remark name when set, otherwise the nickname.
	pub fn display_name(&self) -> &str {
		if self.remark_name.is_empty() { &self.nick_name } else { &self.remark_name }
	}
}

impl From<&SelfIdentity> for Contact {
	fn from(me: &SelfIdentity) -> Self {
		Self {
			user_name: me.user_name.clone(),
			nick_name: me.nick_name.clone(),
			remark_name: String::new(),
		}
	}
}

/// Session-init response: initial cursor plus our own identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitResponse {
	#[serde(default)]
	pub base_response: BaseResponse,
	pub user: SelfIdentity,
	pub sync_key: SyncKeyList,
}

impl InitResponse {
	pub fn decode(raw: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(raw)?)
	}
}

/// Contact-list response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactList {
	#[serde(default)]
	pub base_response: BaseResponse,
	#[serde(default)]
	pub member_count: usize,
	#[serde(default)]
	pub member_list: Vec<Contact>,
}

impl ContactList {
	pub fn decode(raw: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(raw)?)
	}
}
