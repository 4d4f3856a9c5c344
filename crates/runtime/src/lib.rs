//! wxweb runtime - login handshake, long-poll loop, and backend transport
//!
//! This crate owns everything that talks to the vendor backend or reacts to
//! its status codes:
//!
//! - **Configuration**: [`SessionConfig`] with its atomically derived [`Shard`], and [`RuntimeOptions`]
//! - **Backend seam**: the [`LoginApi`], [`SyncApi`] and [`SessionApi`] traits, implemented over HTTP by [`WebBackend`]
//! - **Login**: [`LoginFlow`], the QR scan state machine
//! - **Sync**: [`SyncLoop`], the long-poll producer feeding raw batches into a bounded channel
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  redirect   ┌────────────┐ RawBatch ┌──────────────┐
//! │ LoginFlow  │ ──────────▶ │  SyncLoop  │ ───────▶ │ (dispatcher) │
//! └─────┬──────┘   Shard     └─────┬──────┘  mpsc    └──────────────┘
//!       │                          │ ExitSignal (oneshot)
//!       ▼                          ▼
//! ┌────────────────────────────────────────┐
//! │  Backend traits  (WebBackend: reqwest) │
//! └────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod login;
pub mod sync_loop;
pub mod web;

pub use backend::{AuthContext, Backend, LoginApi, SessionApi, SyncApi};
pub use config::{RuntimeOptions, SessionConfig, Shard};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use login::LoginFlow;
pub use sync_loop::{CheckAction, ExitSignal, LoopExit, RawBatch, SyncLoop, Termination, classify};
pub use web::WebBackend;
