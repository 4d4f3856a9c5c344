//! Parsers for the script-shaped bodies returned by the login and long-poll endpoints.
//!
//! These endpoints answer with JavaScript assignments rather than JSON, e.g.
//! `window.code=200; window.redirect_uri="...";` or
//! `window.synccheck={retcode:"0",selector:"2"}`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DecodeError, Result};

/// Text the login poll carries when the QR code has expired.
pub const QR_EXPIRED_MARKER: &str = "window.code=408";

static QR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"window\.QRLogin\.code\s*=\s*(\d+);\s*window\.QRLogin\.uuid\s*=\s*"([^"]+)""#).expect("static pattern is valid")
});
static LOGIN_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"window\.code\s*=\s*(\d+)").expect("static pattern is valid"));
static REDIRECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"window\.redirect_uri\s*=\s*"([^"]+)""#).expect("static pattern is valid"));
static SYNC_CHECK: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"retcode\s*:\s*"?(\d+)"?\s*,\s*selector\s*:\s*"?(\d+)"?"#).expect("static pattern is valid")
});

/// Extracts the QR token from a `jslogin` body.
pub fn parse_qr_token(body: &str) -> Result<String> {
	let caps = QR_TOKEN
		.captures(body)
		.ok_or_else(|| DecodeError::Script(format!("no QR token in {body:?}")))?;
	if &caps[1] != "200" {
		return Err(DecodeError::Script(format!("QR token request returned code {}", &caps[1])));
	}
	Ok(caps[2].to_string())
}

/// Status embedded in one login poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
	/// No definitive outcome yet; `code` is whatever the body carried (e.g. 201 once scanned).
	Waiting { code: Option<u16> },
	/// The QR code expired (code 408).
	Expired,
	/// The scan was confirmed on the phone.
	Confirmed { redirect_url: String },
}

/// Classifies a login poll body.
pub fn parse_login_status(body: &str) -> LoginStatus {
	let code = LOGIN_CODE.captures(body).and_then(|caps| caps[1].parse::<u16>().ok());
	if code == Some(408) {
		return LoginStatus::Expired;
	}
	match REDIRECT.captures(body) {
		Some(caps) => LoginStatus::Confirmed {
			redirect_url: caps[1].to_string(),
		},
		None => LoginStatus::Waiting { code },
	}
}

/// Result of one long-poll check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCheck {
	pub retcode: i64,
	pub selector: i64,
}

/// Parses a `synccheck` body.
pub fn parse_sync_check(body: &str) -> Result<SyncCheck> {
	let caps = SYNC_CHECK
		.captures(body)
		.ok_or_else(|| DecodeError::Script(format!("no synccheck status in {body:?}")))?;
	let retcode = caps[1]
		.parse()
		.map_err(|_| DecodeError::Script(format!("retcode out of range: {}", &caps[1])))?;
	let selector = caps[2]
		.parse()
		.map_err(|_| DecodeError::Script(format!("selector out of range: {}", &caps[2])))?;
	Ok(SyncCheck { retcode, selector })
}
