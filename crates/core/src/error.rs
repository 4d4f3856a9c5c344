//! Error types for the session core.

use thiserror::Error;
use wxweb_protocol::{BaseResponse, DecodeError};

/// Result type alias for session operations and handlers.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`Session`](crate::Session) and handler invocations.
#[derive(Debug, Error)]
pub enum Error {
	/// Login, long-poll, or backend failure.
	#[error(transparent)]
	Runtime(#[from] wxweb_runtime::Error),

	/// Response body did not have the expected shape.
	#[error("Decode error: {0}")]
	Decode(#[from] DecodeError),

	/// I/O error (reading media from disk).
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// `serve` was called on a session that already consumed its cursor.
	#[error("session is already serving")]
	AlreadyServing,

	/// Failure reported by a message handler.
	#[error("handler failed: {0}")]
	Handler(String),
}

impl Error {
	pub fn handler(message: impl Into<String>) -> Self {
		Error::Handler(message.into())
	}

	/// Returns true for conditions that end a session.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Error::Runtime(e) if e.is_terminal())
	}

	/// Returns true if the QR code expired.
	pub fn is_qr_expired(&self) -> bool {
		matches!(self, Error::Runtime(e) if e.is_qr_expired())
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Error::Decode(DecodeError::Json(e))
	}
}

/// Turns a non-zero nested result code into [`wxweb_runtime::Error::Api`].
pub(crate) fn check_response(call: &'static str, response: &BaseResponse) -> Result<()> {
	if response.is_ok() {
		return Ok(());
	}
	Err(wxweb_runtime::Error::Api {
		call,
		ret: response.ret,
		message: response.err_msg.clone(),
	}
	.into())
}
