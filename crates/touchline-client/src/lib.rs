//! Production client for Touchline
//!
//! Binds the application runtime to real I/O: a Socket.IO session over
//! tokio-tungstenite, the REST collaborator over reqwest, an on-disk session
//! file and a line-oriented terminal watcher.
//!
//! # Components
//!
//! - [`transport`]: Engine.IO session task behind mpsc channels
//! - [`api::ApiClient`]: match listing and detail fetches
//! - [`session_store::SessionStore`]: persisted pseudo-identity
//! - [`WsDriver`]: [`touchline_app::Driver`] over the above
//! - [`config::Args`]: CLI and environment configuration

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
pub mod command;
pub mod config;
pub mod driver;
pub mod render;
pub mod session_store;
pub mod system_env;
pub mod transport;

pub use config::{Args, ClientConfig};
pub use driver::{ClientError, WsDriver};
pub use system_env::SystemEnv;
use touchline_app::{App, Runtime};

use crate::{api::ApiClient, session_store::SessionStore};

/// Load the identity, build the runtime and run it until the user quits.
///
/// # Errors
///
/// Returns an error if the session file or API client cannot be set up, or
/// the terminal fails.
pub async fn run(config: ClientConfig) -> Result<(), ClientError> {
    let env = SystemEnv::new();

    let store = match &config.session_file {
        Some(path) => SessionStore::new(path),
        None => SessionStore::default_location()?,
    };
    let mut session = store.load_or_create(&env)?;
    if let Some(username) = &config.username {
        session = store.set_username(&session, username)?;
    }
    tracing::info!(user_id = %session.user_id, username = %session.username, "session loaded");

    let api = ApiClient::new(&config.api_url)?;
    let driver = WsDriver::new(env.clone(), api, store, config.tick_interval, config.startup);
    let app = App::new(env, config.app, session);

    Runtime::new(driver, app).run().await
}
