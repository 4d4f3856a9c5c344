//! wxweb: session core for the browser-emulating web messaging protocol
//!
//! Logs in with a QR code, keeps the session alive through the long-poll loop,
//! and dispatches every inbound message to the handlers registered for its
//! type.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use wxweb::{CancellationToken, HandlerContext, MsgType, ParsedMessage, RuntimeOptions, Session, SessionConfig, WebBackend};
//!
//! async fn echo(ctx: HandlerContext, message: Arc<ParsedMessage>) -> wxweb::Result<()> {
//!     ctx.session.send_text(&message.content, &message.from_user).await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> wxweb::Result<()> {
//!     let backend = Arc::new(WebBackend::new()?);
//!     let pending = Session::login(backend, SessionConfig::default(), RuntimeOptions::default()).await?;
//!     println!("Scan: {}", pending.qr_url());
//!
//!     let session = pending.confirm().await?;
//!     session.register(MsgType::TEXT, echo);
//!     session.serve(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod analyze;
pub mod contacts;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod session;

#[cfg(test)]
mod test_support;

pub use analyze::{MENTION_SEPARATOR, ParsedMessage, SPEAKER_DELIMITER, analyze};
pub use contacts::Contacts;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use handlers::{Handler, HandlerContext, HandlerFuture, HandlerId, HandlerRegistry};
pub use session::{PendingLogin, SentMessage, Session};
// Re-exports so callers need only this crate.
pub use tokio_util::sync::CancellationToken;
pub use wxweb_protocol::{Contact, MsgType, SelfIdentity};
pub use wxweb_runtime::{LoopExit, RuntimeOptions, SessionConfig, WebBackend};
