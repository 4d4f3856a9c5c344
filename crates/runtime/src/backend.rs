//! The seam between the session core and the vendor endpoints.
//!
//! The core never touches a socket: it calls these traits and interprets the
//! results. [`WebBackend`](crate::WebBackend) implements them over HTTP; tests
//! substitute scripted in-memory implementations.
//!
//! The surface is split by the component that consumes it so each component
//! can be driven by a backend implementing only what it needs:
//!
//! - [`LoginApi`] - QR handshake and login page, used by [`LoginFlow`](crate::LoginFlow)
//! - [`SyncApi`] - long-poll check and batch fetch, used by [`SyncLoop`](crate::SyncLoop)
//! - [`SessionApi`] - session start and outbound operations

use async_trait::async_trait;
use wxweb_protocol::{SelfIdentity, SyncCheck, SyncKeyList};

use crate::config::SessionConfig;
use crate::credentials::Credentials;
use crate::error::Result;

/// Everything an authenticated call needs, borrowed for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
	pub config: &'a SessionConfig,
	pub credentials: &'a Credentials,
}

impl<'a> AuthContext<'a> {
	pub fn new(config: &'a SessionConfig, credentials: &'a Credentials) -> Self {
		Self { config, credentials }
	}
}

/// QR handshake endpoints.
#[async_trait]
pub trait LoginApi: Send + Sync {
	/// Requests a fresh QR token.
	async fn request_qr_token(&self, config: &SessionConfig) -> Result<String>;

	/// Polls the scan status once; returns the raw script-shaped body.
	async fn poll_login(&self, config: &SessionConfig, qr_token: &str, tip: bool) -> Result<String>;

	/// Opens the shard's login page and collects the session credentials.
	async fn open_login_page(&self, config: &SessionConfig) -> Result<Credentials>;
}

/// Long-poll endpoints.
#[async_trait]
pub trait SyncApi: Send + Sync {
	/// Asks the backend whether anything new is pending.
	async fn sync_check(&self, auth: AuthContext<'_>, sync_host: &str, sync_key: &SyncKeyList) -> Result<SyncCheck>;

	/// Fetches the pending batch; the body carries the replacement cursor.
	async fn fetch_batch(&self, auth: AuthContext<'_>, sync_key: &SyncKeyList) -> Result<Vec<u8>>;
}

/// Session start and outbound operations.
///
/// JSON-returning calls hand back the raw body; callers check its nested result code.
#[async_trait]
pub trait SessionApi: Send + Sync {
	async fn init(&self, auth: AuthContext<'_>) -> Result<Vec<u8>>;

	/// Returns the nested result code; non-zero is fatal at session start.
	async fn status_notify(&self, auth: AuthContext<'_>, me: &SelfIdentity) -> Result<i64>;

	async fn fetch_contacts(&self, auth: AuthContext<'_>) -> Result<Vec<u8>>;

	async fn send_text(&self, auth: AuthContext<'_>, from: &str, to: &str, content: &str) -> Result<Vec<u8>>;

	async fn upload_media(&self, auth: AuthContext<'_>, from: &str, to: &str, file_name: &str, data: Vec<u8>) -> Result<Vec<u8>>;

	async fn send_image(&self, auth: AuthContext<'_>, from: &str, to: &str, media_id: &str) -> Result<Vec<u8>>;

	async fn send_emoticon(&self, auth: AuthContext<'_>, from: &str, to: &str, media_id: &str) -> Result<Vec<u8>>;

	async fn revoke(&self, auth: AuthContext<'_>, client_msg_id: &str, svr_msg_id: &str, to: &str) -> Result<Vec<u8>>;

	/// Downloads the image attached to a received message.
	async fn fetch_image(&self, auth: AuthContext<'_>, msg_id: &str) -> Result<Vec<u8>>;

	async fn logout(&self, auth: AuthContext<'_>) -> Result<()>;
}

/// A complete backend.
pub trait Backend: LoginApi + SyncApi + SessionApi {}

impl<T: LoginApi + SyncApi + SessionApi> Backend for T {}
