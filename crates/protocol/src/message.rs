//! Inbound message elements and the batch that carries them.
//!
//! Decoding is schema-checked field by field: a missing or wrong-typed field
//! yields a [`DecodeError`] naming that field instead of a panic, so one bad
//! element never takes the rest of its batch down with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result};

/// Substring marking a multi-party conversation id.
pub const GROUP_MARKER: &str = "@@";

/// Integer message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgType(pub i32);

impl MsgType {
	pub const TEXT: Self = Self(1);
	pub const IMAGE: Self = Self(3);
	pub const VOICE: Self = Self(34);
	pub const VERIFY: Self = Self(37);
	pub const POSSIBLE_FRIEND: Self = Self(40);
	pub const SHARE_CARD: Self = Self(42);
	pub const VIDEO: Self = Self(43);
	pub const EMOTICON: Self = Self(47);
	pub const LOCATION: Self = Self(48);
	pub const LINK: Self = Self(49);
	pub const VOIP: Self = Self(50);
	pub const INIT: Self = Self(51);
	pub const VOIP_NOTIFY: Self = Self(52);
	pub const VOIP_INVITE: Self = Self(53);
	pub const SHORT_VIDEO: Self = Self(62);
	pub const SYS_NOTICE: Self = Self(9999);
	pub const SYS: Self = Self(10000);
	pub const REVOKE: Self = Self(10002);

	/// Every named tag.
	pub const KNOWN: [Self; 18] = [
		Self::TEXT,
		Self::IMAGE,
		Self::VOICE,
		Self::VERIFY,
		Self::POSSIBLE_FRIEND,
		Self::SHARE_CARD,
		Self::VIDEO,
		Self::EMOTICON,
		Self::LOCATION,
		Self::LINK,
		Self::VOIP,
		Self::INIT,
		Self::VOIP_NOTIFY,
		Self::VOIP_INVITE,
		Self::SHORT_VIDEO,
		Self::SYS_NOTICE,
		Self::SYS,
		Self::REVOKE,
	];

	/// Human-readable name for known tags.
	pub fn name(self) -> Option<&'static str> {
		Some(match self {
			Self::TEXT => "text",
			Self::IMAGE => "image",
			Self::VOICE => "voice",
			Self::VERIFY => "verify",
			Self::POSSIBLE_FRIEND => "possible_friend",
			Self::SHARE_CARD => "share_card",
			Self::VIDEO => "video",
			Self::EMOTICON => "emoticon",
			Self::LOCATION => "location",
			Self::LINK => "link",
			Self::VOIP => "voip",
			Self::INIT => "init",
			Self::VOIP_NOTIFY => "voip_notify",
			Self::VOIP_INVITE => "voip_invite",
			Self::SHORT_VIDEO => "short_video",
			Self::SYS_NOTICE => "sys_notice",
			Self::SYS => "sys",
			Self::REVOKE => "revoke",
			_ => return None,
		})
	}
}

impl fmt::Display for MsgType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "{}({})", name, self.0),
			None => write!(f, "{}", self.0),
		}
	}
}

impl From<i32> for MsgType {
	fn from(tag: i32) -> Self {
		Self(tag)
	}
}

/// One message element exactly as the backend delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
	pub msg_id: String,
	pub content: String,
	pub from_user: String,
	pub to_user: String,
	pub msg_type: MsgType,
}

impl RawMessage {
	/// Decodes one element of `AddMsgList`.
	pub fn decode(value: &Value) -> Result<Self> {
		let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;
		Ok(Self {
			msg_id: str_field(obj, "MsgId")?,
			content: str_field(obj, "Content")?,
			from_user: str_field(obj, "FromUserName")?,
			to_user: str_field(obj, "ToUserName")?,
			msg_type: type_field(obj, "MsgType")?,
		})
	}
}

/// A fetched batch with its elements still undecoded.
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
	pub count: i64,
	pub elements: Vec<Value>,
}

impl SyncBatch {
	/// Decodes `AddMsgCount` and, when positive, `AddMsgList`.
	///
	/// A count below one yields an empty batch even if the list is absent.
	pub fn decode(raw: &[u8]) -> Result<Self> {
		let value: Value = serde_json::from_slice(raw)?;
		let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

		let count = int_field(obj, "AddMsgCount")?;
		if count < 1 {
			return Ok(Self {
				count,
				elements: Vec::new(),
			});
		}

		let elements = match obj.get("AddMsgList") {
			Some(Value::Array(items)) => items.clone(),
			Some(_) => {
				return Err(DecodeError::WrongType {
					field: "AddMsgList",
					expected: "array",
				});
			}
			None => return Err(DecodeError::Missing { field: "AddMsgList" }),
		};

		Ok(Self { count, elements })
	}

	pub fn is_empty(&self) -> bool {
		self.count < 1
	}
}

fn str_field(obj: &Map<String, Value>, field: &'static str) -> Result<String> {
	match obj.get(field) {
		Some(Value::String(s)) => Ok(s.clone()),
		Some(_) => Err(DecodeError::WrongType { field, expected: "string" }),
		None => Err(DecodeError::Missing { field }),
	}
}

fn int_field(obj: &Map<String, Value>, field: &'static str) -> Result<i64> {
	match obj.get(field) {
		Some(v) => v.as_i64().ok_or(DecodeError::WrongType { field, expected: "integer" }),
		None => Err(DecodeError::Missing { field }),
	}
}

fn type_field(obj: &Map<String, Value>, field: &'static str) -> Result<MsgType> {
	let tag = int_field(obj, field)?;
	i32::try_from(tag)
		.map(MsgType)
		.map_err(|_| DecodeError::WrongType { field, expected: "32-bit integer" })
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn element() -> Value {
		json!({
			"MsgId": "6523",
			"Content": "hello",
			"FromUserName": "@abc",
			"ToUserName": "@bot",
			"MsgType": 1,
			"CreateTime": 1500000000
		})
	}

	#[test]
	fn test_decode_message() {
		let message = RawMessage::decode(&element()).unwrap();
		assert_eq!(message.msg_id, "6523");
		assert_eq!(message.content, "hello");
		assert_eq!(message.from_user, "@abc");
		assert_eq!(message.to_user, "@bot");
		assert_eq!(message.msg_type, MsgType::TEXT);
	}

	#[test]
	fn test_decode_missing_field() {
		let mut value = element();
		value.as_object_mut().unwrap().remove("ToUserName");
		let err = RawMessage::decode(&value).unwrap_err();
		assert!(matches!(err, DecodeError::Missing { field: "ToUserName" }));
	}

	#[test]
	fn test_decode_wrong_type() {
		let mut value = element();
		value["MsgType"] = json!("1");
		let err = RawMessage::decode(&value).unwrap_err();
		assert!(matches!(err, DecodeError::WrongType { field: "MsgType", .. }));

		let mut value = element();
		value["MsgId"] = json!(6523);
		assert_eq!(RawMessage::decode(&value).unwrap_err().field(), Some("MsgId"));
	}

	#[test]
	fn test_decode_non_object() {
		assert!(matches!(RawMessage::decode(&json!([1, 2])), Err(DecodeError::NotAnObject)));
	}

	#[test]
	fn test_batch_empty_count() {
		let batch = SyncBatch::decode(br#"{"AddMsgCount": 0}"#).unwrap();
		assert!(batch.is_empty());
		assert!(batch.elements.is_empty());
	}

	#[test]
	fn test_batch_elements() {
		let raw = serde_json::to_vec(&json!({"AddMsgCount": 2, "AddMsgList": [element(), element()]})).unwrap();
		let batch = SyncBatch::decode(&raw).unwrap();
		assert_eq!(batch.count, 2);
		assert_eq!(batch.elements.len(), 2);
	}

	#[test]
	fn test_batch_missing_list() {
		let err = SyncBatch::decode(br#"{"AddMsgCount": 1}"#).unwrap_err();
		assert_eq!(err.field(), Some("AddMsgList"));
		assert!(SyncBatch::decode(b"not json").is_err());
	}

	#[test]
	fn test_msg_type_display() {
		assert_eq!(MsgType::TEXT.to_string(), "text(1)");
		assert_eq!(MsgType(777).to_string(), "777");
		assert_eq!(MsgType::from(10002), MsgType::REVOKE);
	}

	#[test]
	fn test_known_tags_are_named() {
		assert!(MsgType::KNOWN.iter().all(|t| t.name().is_some()));
		let mut tags: Vec<_> = MsgType::KNOWN.iter().map(|t| t.0).collect();
		tags.dedup();
		assert_eq!(tags.len(), MsgType::KNOWN.len());
	}
}
