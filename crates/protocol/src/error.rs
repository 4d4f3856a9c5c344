//! Decode errors.

use thiserror::Error;

/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// A body or message element did not have the expected shape.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// A required field was absent.
	#[error("missing field `{field}`")]
	Missing { field: &'static str },

	/// A field was present but had the wrong JSON type.
	#[error("field `{field}` has the wrong type, expected {expected}")]
	WrongType { field: &'static str, expected: &'static str },

	/// The value at the top level was not a JSON object.
	#[error("expected a JSON object")]
	NotAnObject,

	/// The body was not valid JSON.
	#[error("invalid JSON: {0}")]
	Json(#[from] serde_json::Error),

	/// A script-shaped body did not carry the expected assignment.
	#[error("malformed script body: {0}")]
	Script(String),
}

impl DecodeError {
	/// Returns the field name this error refers to, if any.
	pub fn field(&self) -> Option<&'static str> {
		match self {
			DecodeError::Missing { field } | DecodeError::WrongType { field, .. } => Some(field),
			_ => None,
		}
	}
}
