//! The long-poll producer.
//!
//! [`SyncLoop`] owns the sync cursor. Each iteration issues one check, acts on
//! the `(retcode, selector)` pair per [`classify`], and on new data fetches the
//! batch, replaces the cursor with the one the fetch returned, and pushes the
//! raw body into a bounded channel. A full channel blocks the loop, which in
//! turn delays the next check.
//!
//! The loop reports how it ended exactly once, over a oneshot channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wxweb_protocol::{SyncCheck, SyncKeyList, SyncResponse};

use crate::backend::{AuthContext, SyncApi};
use crate::config::{RuntimeOptions, SessionConfig};
use crate::credentials::Credentials;
use crate::error::{Error, Result};

pub const RET_OK: i64 = 0;
/// Logged out from another device.
pub const RET_LOGGED_OUT: i64 = 1101;
pub const RET_BLOCKED: i64 = 1205;

pub const SELECTOR_NONE: i64 = 0;
pub const SELECTOR_NEW_MESSAGE: i64 = 2;
pub const SELECTOR_IDLE: i64 = 7;

/// A fetched batch body, passed to the dispatcher undecoded.
#[derive(Debug, Clone)]
pub struct RawBatch(pub Vec<u8>);

/// Clean ways for the loop to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
	/// The account was logged out elsewhere.
	LoggedOut,
	/// The stop token was cancelled.
	Stopped,
}

/// What the loop reports on its exit channel.
pub type ExitSignal = Result<LoopExit>;

/// Terminal outcomes of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	LoggedOut,
	SessionDown { selector: i64 },
	Blocked { retcode: i64 },
	UnknownRetcode { retcode: i64 },
}

impl Termination {
	pub fn into_signal(self) -> ExitSignal {
		match self {
			Termination::LoggedOut => Ok(LoopExit::LoggedOut),
			Termination::SessionDown { selector } => Err(Error::SessionDown { selector }),
			Termination::Blocked { retcode } => Err(Error::Blocked { retcode }),
			Termination::UnknownRetcode { retcode } => Err(Error::UnknownRetcode { retcode }),
		}
	}
}

/// Next step after a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAction {
	Fetch,
	Idle,
	Terminate(Termination),
}

/// Maps a check result to the loop's next step.
pub fn classify(check: SyncCheck) -> CheckAction {
	match (check.retcode, check.selector) {
		(RET_OK, SELECTOR_NEW_MESSAGE) => CheckAction::Fetch,
		(RET_OK, SELECTOR_NONE | SELECTOR_IDLE) => CheckAction::Idle,
		(RET_OK, selector) => CheckAction::Terminate(Termination::SessionDown { selector }),
		(RET_LOGGED_OUT, _) => CheckAction::Terminate(Termination::LoggedOut),
		(RET_BLOCKED, _) => CheckAction::Terminate(Termination::Blocked { retcode: RET_BLOCKED }),
		(retcode, _) => CheckAction::Terminate(Termination::UnknownRetcode { retcode }),
	}
}

/// Long-poll producer for one logged-in session.
pub struct SyncLoop<B: SyncApi + ?Sized> {
	backend: Arc<B>,
	config: Arc<SessionConfig>,
	credentials: Arc<Credentials>,
	sync_key: SyncKeyList,
	batches: mpsc::Sender<RawBatch>,
	retry_delay: Duration,
	/// How long a fetched batch may wait for channel space once stopped.
	handoff_grace: Duration,
	stop: CancellationToken,
}

impl<B: SyncApi + ?Sized> SyncLoop<B> {
	pub fn new(
		backend: Arc<B>,
		config: Arc<SessionConfig>,
		credentials: Arc<Credentials>,
		sync_key: SyncKeyList,
		batches: mpsc::Sender<RawBatch>,
		options: &RuntimeOptions,
		stop: CancellationToken,
	) -> Self {
		Self {
			backend,
			config,
			credentials,
			sync_key,
			batches,
			retry_delay: options.retry_delay(),
			handoff_grace: options.shutdown_grace(),
			stop,
		}
	}

	/// Current cursor.
	pub fn sync_key(&self) -> &SyncKeyList {
		&self.sync_key
	}

	/// Runs until a terminal condition, then reports it on `exit`.
	pub async fn run(mut self, exit: oneshot::Sender<ExitSignal>) {
		let signal = self.run_until_exit().await;
		match &signal {
			Ok(outcome) => info!(?outcome, "Sync loop finished"),
			Err(e) => error!(error = %e, "Sync loop terminated"),
		}
		if exit.send(signal).is_err() {
			debug!("Exit receiver dropped");
		}
	}

	async fn run_until_exit(&mut self) -> ExitSignal {
		let sync_host = self.config.shard()?.sync_host.clone();
		let stop = self.stop.clone();

		loop {
			let checked = tokio::select! {
				biased;
				_ = stop.cancelled() => return Ok(LoopExit::Stopped),
				checked = self.check(&sync_host) => checked,
			};

			let check = match checked {
				Ok(check) => check,
				Err(e) => {
					warn!(error = %e, "Sync check failed, retrying");
					if self.pause(&stop).await {
						return Ok(LoopExit::Stopped);
					}
					continue;
				}
			};

			match classify(check) {
				CheckAction::Idle => {
					debug!(retcode = check.retcode, selector = check.selector, "Nothing new");
				}
				CheckAction::Terminate(termination) => {
					warn!(retcode = check.retcode, selector = check.selector, ?termination, "Sync check ended the session");
					return termination.into_signal();
				}
				CheckAction::Fetch => {
					let fetched = tokio::select! {
						biased;
						_ = stop.cancelled() => return Ok(LoopExit::Stopped),
						fetched = self.fetch() => fetched,
					};
					match fetched {
						Ok(batch) => {
							if let Some(exit) = self.deliver(batch, &stop).await {
								return exit;
							}
						}
						Err(e) => {
							warn!(error = %e, "Batch fetch failed, continuing");
							if self.pause(&stop).await {
								return Ok(LoopExit::Stopped);
							}
						}
					}
				}
			}
		}
	}

	async fn check(&self, sync_host: &str) -> Result<SyncCheck> {
		let auth = AuthContext::new(&self.config, &self.credentials);
		self.backend.sync_check(auth, sync_host, &self.sync_key).await
	}

	/// Fetches one batch and adopts the cursor it carries.
	async fn fetch(&mut self) -> Result<RawBatch> {
		let auth = AuthContext::new(&self.config, &self.credentials);
		let raw = self.backend.fetch_batch(auth, &self.sync_key).await?;

		let head = SyncResponse::decode(&raw)?;
		if !head.base_response.is_ok() {
			return Err(Error::Api {
				call: "webwxsync",
				ret: head.base_response.ret,
				message: head.base_response.err_msg,
			});
		}
		if head.sync_key.is_empty() {
			warn!("Batch carried an empty cursor");
		}
		self.sync_key = head.sync_key;
		Ok(RawBatch(raw))
	}

	/// Pushes a fetched batch downstream.
	///
	/// The cursor already points past `batch`, so a stop does not abandon it:
	/// the hand-off gets `handoff_grace` to find channel space, and the loop
	/// reports [`LoopExit::Stopped`] only after that. Returns the exit signal
	/// when the loop must end.
	async fn deliver(&self, batch: RawBatch, stop: &CancellationToken) -> Option<ExitSignal> {
		let permit = tokio::select! {
			biased;
			_ = stop.cancelled() => {
				match tokio::time::timeout(self.handoff_grace, self.batches.reserve()).await {
					Ok(Ok(permit)) => permit.send(batch),
					Ok(Err(_)) => return Some(Err(Error::ChannelClosed)),
					Err(_) => error!(grace = ?self.handoff_grace, "Channel stayed full after stop, fetched batch lost"),
				}
				return Some(Ok(LoopExit::Stopped));
			}
			permit = self.batches.reserve() => permit,
		};
		match permit {
			Ok(permit) => {
				permit.send(batch);
				None
			}
			Err(_) => Some(Err(Error::ChannelClosed)),
		}
	}

	/// Waits out the retry delay. Returns true if stopped meanwhile.
	async fn pause(&self, stop: &CancellationToken) -> bool {
		tokio::select! {
			_ = stop.cancelled() => true,
			_ = tokio::time::sleep(self.retry_delay) => false,
		}
	}
}
