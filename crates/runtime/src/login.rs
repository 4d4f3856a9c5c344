//! QR scan handshake.
//!
//! The flow is linear: request a token, show its URL to the user, then poll
//! until the phone confirms the scan (yielding a redirect URL) or the code
//! expires. Anything else the poll returns, including transport errors, means
//! "keep waiting".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use wxweb_protocol::{LoginStatus, QR_EXPIRED_MARKER, parse_login_status};

use crate::backend::LoginApi;
use crate::config::{RuntimeOptions, SessionConfig, Shard};
use crate::error::{Error, Result};

/// Drives the QR handshake against a [`LoginApi`].
pub struct LoginFlow<B: LoginApi + ?Sized> {
	backend: Arc<B>,
	poll_interval: Duration,
}

impl<B: LoginApi + ?Sized> LoginFlow<B> {
	pub fn new(backend: Arc<B>, options: &RuntimeOptions) -> Self {
		Self {
			backend,
			poll_interval: options.login_poll_interval(),
		}
	}

	/// Requests a QR token. Show `config.qr_url(&token)` to the user.
	pub async fn begin(&self, config: &SessionConfig) -> Result<String> {
		let token = self.backend.request_qr_token(config).await?;
		info!(qr_token = %token, "QR code issued");
		Ok(token)
	}

	/// Polls until the scan is confirmed and returns the redirect URL.
	///
	/// Fails only with [`Error::QrExpired`]; other failures are logged and retried.
	pub async fn await_scan_confirmation(&self, config: &SessionConfig, qr_token: &str) -> Result<String> {
		loop {
			tokio::time::sleep(self.poll_interval).await;

			match self.backend.poll_login(config, qr_token, false).await {
				Ok(body) => match parse_login_status(&body) {
					LoginStatus::Confirmed { redirect_url } => {
						info!("Scan confirmed");
						return Ok(redirect_url);
					}
					LoginStatus::Expired => return Err(Error::QrExpired),
					LoginStatus::Waiting { code } => {
						debug!(?code, "Waiting for scan");
					}
				},
				Err(e) if e.to_string().contains(QR_EXPIRED_MARKER) => return Err(Error::QrExpired),
				Err(e) => {
					warn!(error = %e, "Login poll failed, retrying");
				}
			}
		}
	}

	/// Waits for the scan and assigns the shard derived from the redirect.
	pub async fn confirm(&self, config: &mut SessionConfig, qr_token: &str) -> Result<()> {
		let redirect_url = self.await_scan_confirmation(config, qr_token).await?;
		let shard = Shard::from_redirect(&redirect_url)?;
		info!(cgi_domain = %shard.cgi_domain, sync_host = %shard.sync_host, "Routed to shard");
		config.assign_shard(shard);
		Ok(())
	}
}
