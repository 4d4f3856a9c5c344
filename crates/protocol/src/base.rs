//! Request/response envelopes shared by every authenticated call.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Identity block attached to every authenticated JSON request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseRequest {
	pub uin: i64,
	pub sid: String,
	pub skey: String,
	#[serde(rename = "DeviceID")]
	pub device_id: String,
}

/// Nested status carried by every JSON response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseResponse {
	#[serde(default)]
	pub ret: i64,
	#[serde(default)]
	pub err_msg: String,
}

impl BaseResponse {
	pub fn is_ok(&self) -> bool {
		self.ret == 0
	}
}

#[derive(Deserialize)]
struct Envelope {
	#[serde(rename = "BaseResponse")]
	base_response: Option<BaseResponse>,
}

/// Extracts the nested [`BaseResponse`] from any JSON body.
pub fn base_response(body: &[u8]) -> Result<BaseResponse> {
	let envelope: Envelope = serde_json::from_slice(body)?;
	envelope.base_response.ok_or(DecodeError::Missing { field: "BaseResponse" })
}

/// Response to a send-text call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendResponse {
	#[serde(rename = "BaseResponse", default)]
	pub base_response: BaseResponse,
	#[serde(rename = "MsgID", default)]
	pub msg_id: String,
	#[serde(rename = "LocalID", default)]
	pub local_id: String,
}

/// Response to a media upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
	#[serde(rename = "BaseResponse", default)]
	pub base_response: BaseResponse,
	#[serde(rename = "MediaId", default)]
	pub media_id: String,
}
