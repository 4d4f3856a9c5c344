//! Session configuration and runtime tuning.
//!
//! [`SessionConfig`] is built once by the caller and threaded through every
//! call; there is no process-wide default instance. Its shard fields are
//! assigned exactly once, as a unit, from the login redirect (see [`Shard`]).

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Host substring identifying the newer backend pool.
pub const NEW_POOL_MARKER: &str = "wx2";
/// Sync host for accounts routed to the newer pool.
pub const NEW_SYNC_HOST: &str = "webpush.wx2.qq.com";
/// Sync host for everyone else.
pub const LEGACY_SYNC_HOST: &str = "webpush.wx.qq.com";

const CGI_PATH: &str = "/cgi-bin/mmwebwx-bin";

/// Endpoints and client identifiers for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
	pub app_id: String,
	pub login_url: String,
	pub lang: String,
	pub device_id: String,
	pub user_agent: String,
	pub upload_url: String,
	#[serde(skip)]
	shard: Option<Shard>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			app_id: "wx782c26e4c19acffb".to_string(),
			login_url: "https://login.weixin.qq.com".to_string(),
			lang: "zh_CN".to_string(),
			device_id: generate_device_id(),
			user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36".to_string(),
			upload_url: "https://file.wx2.qq.com/cgi-bin/mmwebwx-bin/webwxuploadmedia?f=json".to_string(),
			shard: None,
		}
	}
}

impl SessionConfig {
	/// URL the user scans to log in.
	pub fn qr_url(&self, qr_token: &str) -> String {
		format!("{}/l/{}", self.login_url.trim_end_matches('/'), qr_token)
	}

	/// Shard assigned at login; [`Error::NotLoggedIn`] before that.
	pub fn shard(&self) -> Result<&Shard> {
		self.shard.as_ref().ok_or(Error::NotLoggedIn)
	}

	pub fn has_shard(&self) -> bool {
		self.shard.is_some()
	}

	/// Assigns every shard-dependent field at once.
	pub fn assign_shard(&mut self, shard: Shard) {
		if let Some(previous) = &self.shard {
			tracing::debug!(from = %previous.cgi_domain, to = %shard.cgi_domain, "Replacing shard assignment");
		}
		self.shard = Some(shard);
	}
}

/// Backend pool an account was routed to, derived from one redirect URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shard {
	/// Redirect URL delivered by the confirmed scan.
	pub redirect_url: String,
	/// `scheme://host[:port]` of the redirect.
	pub cgi_domain: String,
	/// Base URL for authenticated calls.
	pub cgi_url: String,
	/// Hostname for long-poll checks.
	pub sync_host: String,
}

impl Shard {
	/// Derives the shard from a redirect URL.
	///
	/// Pure: the same URL always yields the same shard.
	pub fn from_redirect(redirect_url: &str) -> Result<Self> {
		let invalid = |reason: &str| Error::InvalidRedirect {
			url: redirect_url.to_string(),
			reason: reason.to_string(),
		};

		let url = Url::parse(redirect_url).map_err(|e| invalid(&e.to_string()))?;
		let host = url.host_str().ok_or_else(|| invalid("no host"))?;

		let cgi_domain = match url.port() {
			Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
			None => format!("{}://{}", url.scheme(), host),
		};
		let sync_host = if host.contains(NEW_POOL_MARKER) {
			NEW_SYNC_HOST
		} else {
			LEGACY_SYNC_HOST
		};

		Ok(Self {
			redirect_url: redirect_url.to_string(),
			cgi_url: format!("{cgi_domain}{CGI_PATH}"),
			cgi_domain,
			sync_host: sync_host.to_string(),
		})
	}
}

/// Tuning knobs for the login poll, sync loop, and handler fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeOptions {
	/// Capacity of the raw-batch channel between the sync loop and the dispatcher.
	pub batch_channel_capacity: usize,
	/// Maximum concurrently running handler invocations.
	pub max_concurrent_handlers: usize,
	/// How long shutdown waits for in-flight work before cancelling it.
	pub shutdown_grace_ms: u64,
	/// Delay between login polls.
	pub login_poll_interval_ms: u64,
	/// Pause after a transient sync check or fetch failure.
	pub retry_delay_ms: u64,
}

impl Default for RuntimeOptions {
	fn default() -> Self {
		Self {
			batch_channel_capacity: 1000,
			max_concurrent_handlers: 64,
			shutdown_grace_ms: 5000,
			login_poll_interval_ms: 3000,
			retry_delay_ms: 1000,
		}
	}
}

impl RuntimeOptions {
	pub fn shutdown_grace(&self) -> Duration {
		Duration::from_millis(self.shutdown_grace_ms)
	}

	pub fn login_poll_interval(&self) -> Duration {
		Duration::from_millis(self.login_poll_interval_ms)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}

/// `e` followed by fifteen random digits, as the web client does.
pub fn generate_device_id() -> String {
	let n: u64 = rand::thread_rng().gen_range(0..1_000_000_000_000_000);
	format!("e{n:015}")
}
