//! The long-poll cursor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base::BaseResponse;
use crate::error::Result;

/// One `(key, value)` pair of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncKey {
	pub key: i64,
	pub val: i64,
}

/// Ordered cursor telling the backend what has already been consumed.
///
/// Always replaced wholesale with the value the backend returns; never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncKeyList {
	#[serde(default)]
	pub count: usize,
	#[serde(default)]
	pub list: Vec<SyncKey>,
}

impl SyncKeyList {
	/// Builds a cursor from its pairs, keeping `count` consistent.
	pub fn new(list: Vec<SyncKey>) -> Self {
		Self { count: list.len(), list }
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	/// Query-string form used by the long-poll check: `1_100|2_200`.
	pub fn to_query(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for SyncKeyList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, pair) in self.list.iter().enumerate() {
			if i > 0 {
				f.write_str("|")?;
			}
			write!(f, "{}_{}", pair.key, pair.val)?;
		}
		Ok(())
	}
}

/// Head of a message-batch fetch response: status plus the replacement cursor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncResponse {
	#[serde(default)]
	pub base_response: BaseResponse,
	pub sync_key: SyncKeyList,
}

impl SyncResponse {
	/// Decodes the head of a raw batch; message elements are left to the dispatcher.
	pub fn decode(raw: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(raw)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_query_format() {
		let keys = SyncKeyList::new(vec![SyncKey { key: 1, val: 100 }, SyncKey { key: 2, val: 200 }]);
		assert_eq!(keys.count, 2);
		assert_eq!(keys.to_query(), "1_100|2_200");
		assert_eq!(SyncKeyList::default().to_query(), "");
	}

	#[test]
	fn test_sync_response_decode() {
		let raw = br#"{
			"BaseResponse": {"Ret": 0, "ErrMsg": ""},
			"SyncKey": {"Count": 2, "List": [{"Key": 1, "Val": 7}, {"Key": 3, "Val": 9}]},
			"AddMsgCount": 0,
			"AddMsgList": []
		}"#;
		let response = SyncResponse::decode(raw).unwrap();
		assert!(response.base_response.is_ok());
		assert_eq!(response.sync_key.list, vec![SyncKey { key: 1, val: 7 }, SyncKey { key: 3, val: 9 }]);
	}

	#[test]
	fn test_sync_response_without_key_is_rejected() {
		let raw = br#"{"BaseResponse": {"Ret": 0}, "AddMsgCount": 0}"#;
		assert!(SyncResponse::decode(raw).is_err());
	}
}
