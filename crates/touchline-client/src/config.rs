//! Command-line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use touchline_app::AppConfig;
use touchline_core::{
    ConnectionConfig,
    connection::{
        DEFAULT_RANDOMIZATION_FACTOR, DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_SERVER_URL,
    },
};

use crate::{api::DEFAULT_API_URL, command::UserCommand};

/// Live match scores and chat in the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "touchline")]
#[command(about = "Watch live match scores and chat from the terminal")]
#[command(version)]
pub struct Args {
    /// Socket.IO server base URL
    #[arg(long, env = "TOUCHLINE_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// REST API base URL
    #[arg(long, env = "TOUCHLINE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Session file (defaults to the platform config directory)
    #[arg(long, env = "TOUCHLINE_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Display name to use from now on
    #[arg(long, env = "TOUCHLINE_USERNAME")]
    pub username: Option<String>,

    /// Automatic redials before giving up
    #[arg(long, env = "TOUCHLINE_RECONNECT_ATTEMPTS", default_value_t = DEFAULT_RECONNECT_ATTEMPTS)]
    pub reconnect_attempts: u32,

    /// First redial delay in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub reconnect_delay_ms: u64,

    /// Redial delay cap in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub reconnect_delay_max_ms: u64,

    /// Typing indicator quiet period in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub typing_quiet_ms: u64,

    /// Timer resolution in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Open the match board on start
    #[arg(long)]
    pub board: bool,

    /// Open a match on start (repeatable)
    #[arg(long = "match", value_name = "MATCH_ID")]
    pub matches: Vec<String>,

    /// Open a chat room on start (repeatable)
    #[arg(long = "chat", value_name = "ROOM_ID")]
    pub chats: Vec<String>,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[arg(long, env = "TOUCHLINE_LOG", default_value = "warn")]
    pub log_level: String,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// REST API base URL
    pub api_url: String,
    /// Session file override
    pub session_file: Option<PathBuf>,
    /// Display name override
    pub username: Option<String>,
    /// Application settings, including the server URL
    pub app: AppConfig,
    /// Timer resolution
    pub tick_interval: Duration,
    /// Commands run before reading input
    pub startup: Vec<UserCommand>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: None,
            username: None,
            app: AppConfig::default(),
            tick_interval: Duration::from_millis(100),
            startup: Vec::new(),
        }
    }
}

impl Args {
    /// Resolve into a [`ClientConfig`].
    pub fn into_config(self) -> ClientConfig {
        let connection = ConnectionConfig {
            url: self.server_url,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            reconnect_delay_max: Duration::from_millis(self.reconnect_delay_max_ms),
            reconnect_attempts: self.reconnect_attempts,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
        };

        let mut startup = Vec::new();
        if self.board {
            startup.push(UserCommand::Board);
        }
        startup.extend(self.matches.into_iter().map(UserCommand::Match));
        startup.extend(self.chats.into_iter().map(UserCommand::Chat));

        ClientConfig {
            api_url: self.api_url,
            session_file: self.session_file,
            username: self.username,
            app: AppConfig {
                connection,
                typing_quiet: Duration::from_millis(self.typing_quiet_ms),
                ..AppConfig::default()
            },
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
            startup,
        }
    }
}
