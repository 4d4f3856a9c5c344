//! The consumer side of the long-poll: raw batch in, handler tasks out.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use wxweb_protocol::{RawMessage, SyncBatch};
use wxweb_runtime::RawBatch;

use crate::analyze::{ParsedMessage, analyze};
use crate::handlers::{HandlerContext, HandlerRegistry};
use crate::session::{Session, clamp_permits};

/// Parses batches and fans each message out to its handlers.
///
/// Every handler invocation runs as its own task on `tracker`, gated by a
/// shared semaphore. Failures are confined to the message or handler that
/// caused them.
pub struct Dispatcher {
	registry: Arc<HandlerRegistry>,
	me: String,
	permits: Arc<Semaphore>,
	tracker: TaskTracker,
	ctx: HandlerContext,
}

impl Dispatcher {
	pub fn new(session: Arc<Session>, tracker: TaskTracker, cancel: CancellationToken) -> Self {
		let permits = Arc::new(Semaphore::new(clamp_permits(session.options().max_concurrent_handlers)));
		Self {
			registry: session.registry().clone(),
			me: session.me().user_name.clone(),
			permits,
			tracker,
			ctx: HandlerContext { session, cancel },
		}
	}

	/// Dispatches every message in one batch, in delivery order.
	///
	/// Returns once each handler has been spawned, not when they finish.
	pub async fn consume(&self, batch: RawBatch) {
		let batch = match SyncBatch::decode(&batch.0) {
			Ok(batch) => batch,
			Err(e) => {
				warn!(error = %e, "Dropping undecodable batch");
				return;
			}
		};
		if batch.is_empty() {
			return;
		}
		debug!(count = batch.count, elements = batch.elements.len(), "Dispatching batch");

		for element in &batch.elements {
			let raw = match RawMessage::decode(element) {
				Ok(raw) => raw,
				Err(e) => {
					warn!(error = %e, field = ?e.field(), "Skipping malformed message");
					continue;
				}
			};
			let message = analyze(raw, &self.me);
			if !self.dispatch(message).await {
				return;
			}
		}
	}

	/// Spawns one task per handler. Returns false once cancelled.
	async fn dispatch(&self, message: ParsedMessage) -> bool {
		let Some(handlers) = self.registry.lookup(message.msg_type) else {
			debug!(msg_id = %message.msg_id, msg_type = %message.msg_type, "No handler registered");
			return true;
		};

		let message = Arc::new(message);
		for handler in handlers {
			let permit = tokio::select! {
				_ = self.ctx.cancel.cancelled() => return false,
				permit = self.permits.clone().acquire_owned() => match permit {
					Ok(permit) => permit,
					Err(_) => return false,
				},
			};

			let cancel = self.ctx.cancel.clone();
			let msg_id = message.msg_id.clone();
			let invocation = handler.handle(self.ctx.clone(), message.clone());
			self.tracker.spawn(async move {
				let _permit = permit;
				tokio::select! {
					_ = cancel.cancelled() => debug!(%msg_id, "Handler cancelled"),
					result = invocation => {
						if let Err(e) = result {
							warn!(%msg_id, error = %e, "Handler failed");
						}
					}
				}
			});
		}
		true
	}
}
