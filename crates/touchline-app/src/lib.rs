//! Application layer for Touchline
//!
//! Explicit context object binding the shared connection, room membership,
//! reducers and local identity, plus a generic runtime loop. The same code
//! runs in the production client and in deterministic simulation.
//!
//! # Components
//!
//! - [`App`]: context state machine (views, connection, membership, typing)
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: orchestration loop executing [`AppAction`]s through a
//!   [`Driver`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod runtime;
mod view;

pub use action::AppAction;
pub use app::{App, AppConfig, DEFAULT_OUTBOX_LIMIT};
pub use driver::Driver;
pub use event::AppEvent;
pub use runtime::Runtime;
pub use view::{View, ViewId};
