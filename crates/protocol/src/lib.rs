//! Wire types for the web messaging protocol.
//!
//! Everything in this crate is pure data plus decoding. No I/O happens here:
//! the runtime crate fetches bodies and hands them to these decoders.
//!
//! # Main Types
//!
//! - [`SyncKeyList`] - the long-poll cursor
//! - [`RawMessage`] / [`SyncBatch`] - schema-checked message decode
//! - [`LoginStatus`] / [`SyncCheck`] - script-shaped status bodies
//! - [`LoginResponse`] - login page XML carrying the session ticket
//! - [`Cookie`] - cookies captured from the login page

pub mod base;
pub mod contact;
pub mod cookie;
pub mod error;
pub mod message;
pub mod script;
pub mod sync_key;
pub mod ticket;

pub use base::{BaseRequest, BaseResponse, SendResponse, UploadResponse, base_response};
pub use contact::{Contact, ContactList, InitResponse, SelfIdentity};
pub use cookie::{Cookie, cookie_header};
pub use error::{DecodeError, Result};
pub use message::{GROUP_MARKER, MsgType, RawMessage, SyncBatch};
pub use script::{LoginStatus, QR_EXPIRED_MARKER, SyncCheck, parse_login_status, parse_qr_token, parse_sync_check};
pub use sync_key::{SyncKey, SyncKeyList, SyncResponse};
pub use ticket::{LoginResponse, LoginTicket};
