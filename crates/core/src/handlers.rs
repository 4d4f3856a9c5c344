//! Message handler infrastructure.
//!
//! Handlers are stored per message type in [`IndexMap`]s keyed by
//! [`HandlerId`], giving registration-order iteration and O(1) removal.
//! Lookups take a read lock and clone the `Arc`s out, so dispatch never holds
//! the lock while a handler runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use wxweb_protocol::MsgType;

use crate::analyze::ParsedMessage;
use crate::error::Result;
use crate::session::Session;

/// Unique identifier for a registered handler.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Boxed async handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// What a handler gets besides the message.
#[derive(Clone)]
pub struct HandlerContext {
	/// The session the message arrived on; use it to reply.
	pub session: Arc<Session>,
	/// Cancelled when the session's shutdown grace period runs out.
	pub cancel: CancellationToken,
}

impl std::fmt::Debug for HandlerContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandlerContext")
			.field("me", &self.session.me().user_name)
			.field("cancelled", &self.cancel.is_cancelled())
			.finish()
	}
}

/// Reacts to one message type.
///
/// Implemented for any `Fn(HandlerContext, Arc<ParsedMessage>) -> impl Future<Output = Result<()>>`.
pub trait Handler: Send + Sync + 'static {
	fn handle(&self, ctx: HandlerContext, message: Arc<ParsedMessage>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
	F: Fn(HandlerContext, Arc<ParsedMessage>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<()>> + Send + 'static,
{
	fn handle(&self, ctx: HandlerContext, message: Arc<ParsedMessage>) -> HandlerFuture {
		Box::pin(self(ctx, message))
	}
}

type HandlerList = IndexMap<HandlerId, Arc<dyn Handler>>;

/// Message type → ordered handlers.
///
/// Safe to register and unregister while dispatch is running; a lookup sees
/// either the state before or after a concurrent change.
#[derive(Default)]
pub struct HandlerRegistry {
	handlers: RwLock<HashMap<MsgType, HandlerList>>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `handler` to the list for `msg_type`.
	pub fn register(&self, msg_type: MsgType, handler: impl Handler) -> HandlerId {
		self.register_arc(msg_type, Arc::new(handler))
	}

	/// Appends an already shared handler, e.g. one registered for several types.
	pub fn register_arc(&self, msg_type: MsgType, handler: Arc<dyn Handler>) -> HandlerId {
		let id = next_handler_id();
		self.handlers.write().entry(msg_type).or_default().insert(id, handler);
		tracing::debug!(handler_id = id, %msg_type, "Handler registered");
		id
	}

	/// Removes exactly one handler, keeping the order of the rest.
	///
	/// Returns `false` if `id` was not registered.
	pub fn unregister(&self, id: HandlerId) -> bool {
		let mut handlers = self.handlers.write();
		let Some(msg_type) = handlers.iter().find_map(|(ty, list)| list.contains_key(&id).then_some(*ty)) else {
			return false;
		};
		if let Some(list) = handlers.get_mut(&msg_type) {
			list.shift_remove(&id);
			if list.is_empty() {
				handlers.remove(&msg_type);
			}
		}
		true
	}

	/// Handlers for `msg_type` in registration order; `None` when there are none.
	pub fn lookup(&self, msg_type: MsgType) -> Option<Vec<Arc<dyn Handler>>> {
		let handlers = self.handlers.read();
		let list = handlers.get(&msg_type)?;
		(!list.is_empty()).then(|| list.values().cloned().collect())
	}

	/// Total number of registered handlers.
	pub fn len(&self) -> usize {
		self.handlers.read().values().map(IndexMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl std::fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let handlers = self.handlers.read();
		let mut types: Vec<_> = handlers.iter().map(|(ty, list)| (ty.0, list.len())).collect();
		types.sort_unstable();
		f.debug_struct("HandlerRegistry").field("types", &types).finish()
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;
	use crate::test_support;

	/// Appends its tag to a shared log when invoked.
	struct Tagged {
		tag: &'static str,
		log: Arc<Mutex<Vec<&'static str>>>,
	}

	impl Handler for Tagged {
		fn handle(&self, _ctx: HandlerContext, _message: Arc<ParsedMessage>) -> HandlerFuture {
			let tag = self.tag;
			let log = self.log.clone();
			Box::pin(async move {
				log.lock().push(tag);
				Ok(())
			})
		}
	}

	fn tagged(tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Tagged {
		Tagged { tag, log: log.clone() }
	}

	#[test]
	fn test_handler_id_increments() {
		let id1 = next_handler_id();
		let id2 = next_handler_id();
		let id3 = next_handler_id();
		assert!(id2 > id1);
		assert!(id3 > id2);
	}

	#[test]
	fn test_lookup_miss() {
		let registry = HandlerRegistry::new();
		assert!(registry.lookup(MsgType::TEXT).is_none());
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn test_registration_order_is_preserved() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let registry = HandlerRegistry::new();
		registry.register(MsgType::TEXT, tagged("first", &log));
		registry.register(MsgType::TEXT, tagged("second", &log));
		registry.register(MsgType::IMAGE, tagged("image", &log));
		registry.register(MsgType::TEXT, tagged("third", &log));

		let ctx = test_support::context();
		let message = Arc::new(test_support::parsed(MsgType::TEXT, "hi"));
		for handler in registry.lookup(MsgType::TEXT).unwrap() {
			handler.handle(ctx.clone(), message.clone()).await.unwrap();
		}
		assert_eq!(*log.lock(), vec!["first", "second", "third"]);
		assert_eq!(registry.len(), 4);
	}

	#[tokio::test]
	async fn test_unregister_removes_only_that_handler() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let registry = HandlerRegistry::new();
		registry.register(MsgType::TEXT, tagged("a", &log));
		let b = registry.register(MsgType::TEXT, tagged("b", &log));
		registry.register(MsgType::TEXT, tagged("c", &log));
		let image = registry.register(MsgType::IMAGE, tagged("image", &log));

		assert!(registry.unregister(b));
		assert!(!registry.unregister(b));
		assert!(registry.unregister(image));
		assert!(registry.lookup(MsgType::IMAGE).is_none());

		let ctx = test_support::context();
		let message = Arc::new(test_support::parsed(MsgType::TEXT, "hi"));
		for handler in registry.lookup(MsgType::TEXT).unwrap() {
			handler.handle(ctx.clone(), message.clone()).await.unwrap();
		}
		assert_eq!(*log.lock(), vec!["a", "c"]);
	}

	#[tokio::test]
	async fn test_closure_handler() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let registry = HandlerRegistry::new();
		let sink = seen.clone();
		registry.register(MsgType::TEXT, move |_ctx: HandlerContext, message: Arc<ParsedMessage>| {
			let sink = sink.clone();
			async move {
				sink.lock().push(message.content.clone());
				Ok::<_, crate::Error>(())
			}
		});

		let handlers = registry.lookup(MsgType::TEXT).unwrap();
		handlers[0]
			.handle(test_support::context(), Arc::new(test_support::parsed(MsgType::TEXT, "ping")))
			.await
			.unwrap();
		assert_eq!(*seen.lock(), vec!["ping".to_string()]);
	}
}
