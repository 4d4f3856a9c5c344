//! Error types for the wxweb runtime.

use thiserror::Error;
use wxweb_protocol::DecodeError;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while logging in, polling, or calling the backend.
#[derive(Debug, Error)]
pub enum Error {
	/// The QR code expired before the scan was confirmed (code 408).
	#[error("QR code expired before the scan was confirmed")]
	QrExpired,

	/// Sync check succeeded but carried a selector we cannot act on.
	#[error("session down, selector {selector}")]
	SessionDown { selector: i64 },

	/// The backend is throttling or blocking this account (retcode 1205).
	#[error("API blocked, retcode {retcode}")]
	Blocked { retcode: i64 },

	/// Sync check returned a retcode outside the known set.
	#[error("unhandled sync check retcode {retcode}")]
	UnknownRetcode { retcode: i64 },

	/// Status notify returned a non-zero result during session start.
	#[error("status notify failed, ret {ret}")]
	StatusNotify { ret: i64 },

	/// An API call answered with a non-zero nested result code.
	#[error("{call} failed: Ret={ret}, ErrMsg={message}")]
	Api { call: &'static str, ret: i64, message: String },

	/// The login page refused to hand out a ticket.
	#[error("login rejected: ret {ret}, {message}")]
	LoginRejected { ret: i64, message: String },

	/// The confirmed-scan redirect URL could not be turned into a shard.
	#[error("invalid redirect URL '{url}': {reason}")]
	InvalidRedirect { url: String, reason: String },

	/// A call needing the shard or credentials was made before login completed.
	#[error("session is not logged in")]
	NotLoggedIn,

	/// Endpoint answered with a non-success HTTP status.
	#[error("{call} returned HTTP {status}")]
	HttpStatus { call: &'static str, status: u16 },

	/// Transport-level failure that is not an HTTP client error.
	#[error("Transport error: {0}")]
	Transport(String),

	/// HTTP client error.
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// Body did not have the expected shape.
	#[error("Decode error: {0}")]
	Decode(#[from] DecodeError),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

impl Error {
	/// Returns true for conditions that end a session.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Error::QrExpired | Error::SessionDown { .. } | Error::Blocked { .. } | Error::UnknownRetcode { .. }
		)
	}

	/// Returns true if the QR code expired.
	pub fn is_qr_expired(&self) -> bool {
		matches!(self, Error::QrExpired)
	}

	/// Returns the nested result code for API and status errors.
	pub fn ret_code(&self) -> Option<i64> {
		match self {
			Error::Api { ret, .. } | Error::StatusNotify { ret } | Error::LoginRejected { ret, .. } => Some(*ret),
			Error::Blocked { retcode } | Error::UnknownRetcode { retcode } => Some(*retcode),
			_ => None,
		}
	}
}
