//! Session lifecycle: login, start, serve, and outbound calls.
//!
//! ```text
//! Session::login ──▶ PendingLogin ──confirm──▶ Session::start ──▶ Arc<Session>
//!                     (show qr_url)             login page, init,      │
//!                                               status notify,        serve
//!                                               contacts               │
//!                                                                      ▼
//!            SyncLoop ──RawBatch (bounded)──▶ consumer tasks ──▶ handler tasks
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wxweb_protocol::{ContactList, DecodeError, InitResponse, MsgType, SelfIdentity, SendResponse, SyncKeyList, UploadResponse, base_response};
use wxweb_runtime::{
	AuthContext, Backend, Credentials, LoginApi, LoginFlow, LoopExit, RawBatch, RuntimeOptions, SessionApi, SessionConfig, SyncLoop,
};

use crate::contacts::Contacts;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result, check_response};
use crate::handlers::{Handler, HandlerId, HandlerRegistry};

/// Ids the backend assigned to a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
	pub msg_id: String,
	pub local_id: String,
}

/// A QR code waiting to be scanned.
pub struct PendingLogin {
	flow: LoginFlow<dyn Backend>,
	backend: Arc<dyn Backend>,
	config: SessionConfig,
	options: RuntimeOptions,
	qr_token: String,
}

impl PendingLogin {
	pub fn qr_token(&self) -> &str {
		&self.qr_token
	}

	/// URL to render as a QR code.
	pub fn qr_url(&self) -> String {
		self.config.qr_url(&self.qr_token)
	}

	/// Waits for the scan, then starts the session.
	///
	/// Blocks until the phone confirms or the code expires; wrap it in a
	/// timeout to bound the wait.
	pub async fn confirm(mut self) -> Result<Arc<Session>> {
		self.flow.confirm(&mut self.config, &self.qr_token).await?;
		Session::start(self.backend, self.config, self.options).await
	}
}

impl fmt::Debug for PendingLogin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingLogin").field("qr_token", &self.qr_token).finish()
	}
}

/// One logged-in account.
pub struct Session {
	backend: Arc<dyn Backend>,
	config: Arc<SessionConfig>,
	credentials: Arc<Credentials>,
	me: SelfIdentity,
	contacts: Contacts,
	options: RuntimeOptions,
	registry: Arc<HandlerRegistry>,
	/// Initial cursor, handed to the sync loop by the first `serve`.
	sync_key: Mutex<Option<SyncKeyList>>,
}

impl Session {
	/// Requests a QR code for a new login.
	pub async fn login(backend: Arc<dyn Backend>, config: SessionConfig, options: RuntimeOptions) -> Result<PendingLogin> {
		let flow = LoginFlow::new(backend.clone(), &options);
		let qr_token = flow.begin(&config).await?;
		Ok(PendingLogin {
			flow,
			backend,
			config,
			options,
			qr_token,
		})
	}

	/// Starts a session on a config whose shard is already assigned.
	pub async fn start(backend: Arc<dyn Backend>, config: SessionConfig, options: RuntimeOptions) -> Result<Arc<Self>> {
		let credentials = backend.open_login_page(&config).await?;
		let auth = AuthContext::new(&config, &credentials);

		let init = InitResponse::decode(&backend.init(auth).await?)?;
		check_response("webwxinit", &init.base_response)?;
		info!(user_name = %init.user.user_name, nick_name = %init.user.nick_name, "Session initialized");

		let ret = backend.status_notify(auth, &init.user).await?;
		if ret != 0 {
			return Err(wxweb_runtime::Error::StatusNotify { ret }.into());
		}

		let list = ContactList::decode(&backend.fetch_contacts(auth).await?)?;
		check_response("webwxgetcontact", &list.base_response)?;
		let contacts = Contacts::new(&init.user, list.member_list);
		info!(contacts = contacts.len(), "Contacts loaded");

		Ok(Self::from_parts(backend, config, credentials, init.user, contacts, init.sync_key, options))
	}

	/// Assembles a session from state obtained elsewhere.
	pub fn from_parts(
		backend: Arc<dyn Backend>,
		config: SessionConfig,
		credentials: Credentials,
		me: SelfIdentity,
		contacts: Contacts,
		sync_key: SyncKeyList,
		options: RuntimeOptions,
	) -> Arc<Self> {
		Arc::new(Self {
			backend,
			config: Arc::new(config),
			credentials: Arc::new(credentials),
			me,
			contacts,
			options,
			registry: Arc::new(HandlerRegistry::new()),
			sync_key: Mutex::new(Some(sync_key)),
		})
	}

	pub fn me(&self) -> &SelfIdentity {
		&self.me
	}

	pub fn contacts(&self) -> &Contacts {
		&self.contacts
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	pub fn options(&self) -> &RuntimeOptions {
		&self.options
	}

	pub fn registry(&self) -> &Arc<HandlerRegistry> {
		&self.registry
	}

	/// Registers a handler for `msg_type`. May be called while serving.
	pub fn register(&self, msg_type: MsgType, handler: impl Handler) -> HandlerId {
		self.registry.register(msg_type, handler)
	}

	pub fn unregister(&self, id: HandlerId) -> bool {
		self.registry.unregister(id)
	}

	/// Runs the long-poll loop and dispatches messages until the session ends.
	///
	/// Returns [`LoopExit::LoggedOut`] when logged out elsewhere and
	/// [`LoopExit::Stopped`] when `shutdown` is cancelled; terminal backend
	/// conditions come back as errors. Either way, in-flight handlers get
	/// [`RuntimeOptions::shutdown_grace`] to finish before their cancel token
	/// fires, and the same again before they are abandoned.
	pub async fn serve(self: Arc<Self>, shutdown: CancellationToken) -> Result<LoopExit> {
		let sync_key = self.sync_key.lock().take().ok_or(Error::AlreadyServing)?;

		let (batch_tx, mut batches) = mpsc::channel(clamp_permits(self.options.batch_channel_capacity));
		let (exit_tx, mut exit) = oneshot::channel();
		let stop = shutdown.child_token();
		let cancel = CancellationToken::new();
		let tracker = TaskTracker::new();
		let slots = Arc::new(Semaphore::new(clamp_permits(self.options.max_concurrent_handlers)));
		let dispatcher = Arc::new(Dispatcher::new(self.clone(), tracker.clone(), cancel.clone()));

		let producer = SyncLoop::new(
			self.backend.clone(),
			self.config.clone(),
			self.credentials.clone(),
			sync_key,
			batch_tx,
			&self.options,
			stop.clone(),
		);
		let producer = tokio::spawn(producer.run(exit_tx));
		info!(user_name = %self.me.user_name, "Serving");

		// A batch is only taken off the channel once a consumer slot is free,
		// so stalled handlers fill the channel and park the producer.
		let signal = loop {
			tokio::select! {
				biased;
				signal = &mut exit => break Some(signal),
				_ = stop.cancelled() => break None,
				next = next_batch(&slots, &mut batches) => match next {
					Some((slot, batch)) => spawn_consumer(&tracker, &dispatcher, batch, Some(slot)),
					None => break None,
				},
			}
		};

		// Everything still queued or being handed off has already advanced
		// the cursor. The channel closes when the producer returns.
		stop.cancel();
		while let Some(batch) = batches.recv().await {
			spawn_consumer(&tracker, &dispatcher, batch, None);
		}
		if let Err(e) = producer.await {
			error!(error = %e, "Sync loop task failed");
		}
		let signal = match signal {
			Some(signal) => signal,
			None => exit.await,
		};
		self.drain(&tracker, &cancel).await;

		Ok(signal.unwrap_or(Err(wxweb_runtime::Error::ChannelClosed))?)
	}

	async fn drain(&self, tracker: &TaskTracker, cancel: &CancellationToken) {
		tracker.close();
		let grace = self.options.shutdown_grace();
		if tokio::time::timeout(grace, tracker.wait()).await.is_ok() {
			debug!("All handlers finished");
			return;
		}

		warn!(pending = tracker.len(), ?grace, "Handlers still running after grace period, cancelling");
		cancel.cancel();
		if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
			error!(pending = tracker.len(), "Handlers ignored cancellation, abandoning them");
		}
	}

	fn auth(&self) -> AuthContext<'_> {
		AuthContext::new(&self.config, &self.credentials)
	}

	pub async fn send_text(&self, content: &str, to: &str) -> Result<SentMessage> {
		let raw = self.backend.send_text(self.auth(), &self.me.user_name, to, content).await?;
		sent("webwxsendmsg", &raw)
	}

	/// Uploads `data` and sends it as an image.
	pub async fn send_image(&self, data: Vec<u8>, file_name: &str, to: &str) -> Result<SentMessage> {
		let media_id = self.upload(data, file_name, to).await?;
		let raw = self.backend.send_image(self.auth(), &self.me.user_name, to, &media_id).await?;
		sent("webwxsendmsgimg", &raw)
	}

	pub async fn send_image_file(&self, path: impl AsRef<Path>, to: &str) -> Result<SentMessage> {
		let path = path.as_ref();
		let data = tokio::fs::read(path).await?;
		let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("image.jpg");
		self.send_image(data, file_name, to).await
	}

	/// Uploads `data` (usually a GIF) and sends it as an emoticon.
	pub async fn send_emoticon(&self, data: Vec<u8>, to: &str) -> Result<SentMessage> {
		let file_name = format!("{}.gif", self.me.user_name);
		let media_id = self.upload(data, &file_name, to).await?;
		let raw = self.backend.send_emoticon(self.auth(), &self.me.user_name, to, &media_id).await?;
		sent("webwxsendemoticon", &raw)
	}

	pub async fn send_emoticon_file(&self, path: impl AsRef<Path>, to: &str) -> Result<SentMessage> {
		let data = tokio::fs::read(path).await?;
		self.send_emoticon(data, to).await
	}

	/// Recalls a message sent earlier from this session.
	pub async fn revoke(&self, client_msg_id: &str, svr_msg_id: &str, to: &str) -> Result<()> {
		let raw = self.backend.revoke(self.auth(), client_msg_id, svr_msg_id, to).await?;
		check_response("webwxrevokemsg", &base_response(&raw)?)
	}

	/// Downloads the image attached to a received message.
	pub async fn fetch_image(&self, msg_id: &str) -> Result<Vec<u8>> {
		Ok(self.backend.fetch_image(self.auth(), msg_id).await?)
	}

	pub async fn logout(&self) -> Result<()> {
		self.backend.logout(self.auth()).await?;
		info!(user_name = %self.me.user_name, "Logged out");
		Ok(())
	}

	async fn upload(&self, data: Vec<u8>, file_name: &str, to: &str) -> Result<String> {
		let raw = self.backend.upload_media(self.auth(), &self.me.user_name, to, file_name, data).await?;
		let response: UploadResponse = serde_json::from_slice(&raw)?;
		check_response("webwxuploadmedia", &response.base_response)?;
		if response.media_id.is_empty() {
			return Err(DecodeError::Missing { field: "MediaId" }.into());
		}
		Ok(response.media_id)
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("me", &self.me)
			.field("contacts", &self.contacts.len())
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

/// Waits for a free consumer slot, then for the next batch.
async fn next_batch(slots: &Arc<Semaphore>, batches: &mut mpsc::Receiver<RawBatch>) -> Option<(OwnedSemaphorePermit, RawBatch)> {
	let slot = slots.clone().acquire_owned().await.ok()?;
	let batch = batches.recv().await?;
	Some((slot, batch))
}

fn spawn_consumer(tracker: &TaskTracker, dispatcher: &Arc<Dispatcher>, batch: RawBatch, slot: Option<OwnedSemaphorePermit>) {
	let dispatcher = dispatcher.clone();
	tracker.spawn(async move {
		dispatcher.consume(batch).await;
		drop(slot);
	});
}

/// Semaphore and channel sizes: at least one, at most what tokio accepts.
pub(crate) fn clamp_permits(n: usize) -> usize {
	n.clamp(1, Semaphore::MAX_PERMITS)
}

fn sent(call: &'static str, raw: &[u8]) -> Result<SentMessage> {
	let response: SendResponse = serde_json::from_slice(raw)?;
	check_response(call, &response.base_response)?;
	Ok(SentMessage {
		msg_id: response.msg_id,
		local_id: response.local_id,
	})
}
