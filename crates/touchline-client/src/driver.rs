//! Production driver: WebSocket transport, stdin commands, stdout frames.
//!
//! One `tokio::select!` multiplexes the transport session, input lines and
//! the tick timer. All application state stays on the runtime's task.

use std::{
    collections::VecDeque,
    io::{self, Write as _},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    time::{Interval, MissedTickBehavior},
};
use touchline_app::{App, AppAction, AppEvent, Driver, ViewId};
use touchline_core::Environment;
use touchline_proto::ClientIntent;

use crate::{
    SystemEnv,
    api::{ApiClient, ApiError},
    command::{HELP, UserCommand},
    render::render_frame,
    session_store::{SessionStore, SessionStoreError},
    transport::{self, Connection, TransportError, TransportEvent},
};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// REST collaborator error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Session store error.
    #[error("session store error: {0}")]
    Session(#[from] SessionStoreError),

    /// Intent issued with no transport session.
    #[error("not connected")]
    NotConnected,
}

/// Driver for the `touchline` binary.
pub struct WsDriver {
    env: SystemEnv,
    api: ApiClient,
    store: SessionStore,
    connection: Option<Connection>,
    input: Lines<BufReader<Stdin>>,
    /// Stdin reached end of file; keep watching until interrupted
    input_closed: bool,
    ticker: Interval,
    /// Commands run before any input is read
    pending: VecDeque<UserCommand>,
    /// Chat view receiving plain text
    focus: Option<ViewId>,
    /// Last frame written, to skip identical redraws
    last_frame: String,
}

impl WsDriver {
    /// Create a driver reading commands from stdin.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        env: SystemEnv,
        api: ApiClient,
        store: SessionStore,
        tick_interval: Duration,
        startup: Vec<UserCommand>,
    ) -> Self {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            env,
            api,
            store,
            connection: None,
            input: BufReader::new(tokio::io::stdin()).lines(),
            input_closed: false,
            ticker,
            pending: startup.into(),
            focus: None,
            last_frame: String::new(),
        }
    }

    /// Chat view receiving plain text, if any.
    pub fn focus(&self) -> Option<ViewId> {
        self.focus
    }

    /// Run one user command against `app`.
    pub async fn execute(&mut self, app: &mut App<SystemEnv>, command: UserCommand) -> Vec<AppAction> {
        match command {
            UserCommand::Board => match self.api.matches().await {
                Ok(matches) => app.open_board_view(matches).1,
                Err(err) => notice(format!("cannot load matches: {err}")),
            },
            UserCommand::Match(match_id) => match self.api.match_detail(&match_id).await {
                Ok(detail) => app.open_match_view(detail).1,
                Err(err) => notice(format!("cannot load match {match_id}: {err}")),
            },
            UserCommand::Chat(room_id) => {
                let (id, actions) = app.open_chat_view(&room_id);
                self.focus = Some(id);
                actions
            },
            UserCommand::Focus(number) => match find_view(app, number) {
                Some((id, "chat")) => {
                    self.focus = Some(id);
                    vec![AppAction::Render]
                },
                Some(_) => notice(format!("#{number} is not a chat view")),
                None => notice(format!("no view #{number}")),
            },
            UserCommand::Filter { view, filter } => match find_view(app, view) {
                Some((id, "board")) => app.set_board_filter(id, filter),
                Some(_) => notice(format!("#{view} is not a board")),
                None => notice(format!("no view #{view}")),
            },
            UserCommand::Close(number) => match find_view(app, number) {
                Some((id, _)) => {
                    if self.focus == Some(id) {
                        self.focus = None;
                    }
                    app.close_view(id)
                },
                None => notice(format!("no view #{number}")),
            },
            UserCommand::Name(username) => match self.store.set_username(app.session(), &username) {
                Ok(_) => app.set_username(username),
                Err(err) => notice(format!("cannot save name: {err}")),
            },
            UserCommand::Views => {
                self.last_frame.clear();
                vec![AppAction::Render]
            },
            UserCommand::Connect => app.connect(),
            UserCommand::Disconnect => app.disconnect(),
            UserCommand::Help => notice(HELP.to_string()),
            UserCommand::Quit => app.quit(),
            UserCommand::Say(text) => match self.focus {
                Some(id) => app.send_message(id, &text),
                None => notice("no chat view focused, try /chat <room>".to_string()),
            },
        }
    }

    fn on_transport(&mut self, app: &mut App<SystemEnv>, event: Option<TransportEvent>) -> Vec<AppAction> {
        let now = self.env.now();
        let event = match event {
            Some(event) => {
                if event.is_terminal() {
                    self.connection = None;
                }
                match event {
                    TransportEvent::Open => AppEvent::Connected,
                    TransportEvent::ConnectError(reason) => AppEvent::ConnectFailed { reason },
                    TransportEvent::Closed(reason) => AppEvent::Closed { reason },
                    TransportEvent::ServerDisconnect => AppEvent::ServerDisconnect,
                    TransportEvent::Event(event) => AppEvent::Received(event),
                }
            },
            None => {
                self.connection = None;
                AppEvent::Closed { reason: "transport task ended".to_string() }
            },
        };
        app.handle(event, now)
    }

    async fn on_line(&mut self, app: &mut App<SystemEnv>, line: &str) -> Vec<AppAction> {
        if line.trim().is_empty() {
            return Vec::new();
        }
        match line.parse::<UserCommand>() {
            Ok(command) => self.execute(app, command).await,
            Err(err) => notice(err.to_string()),
        }
    }
}

impl Driver for WsDriver {
    type Error = ClientError;
    type Env = SystemEnv;

    async fn poll_event(&mut self, app: &mut App<SystemEnv>) -> Result<Vec<AppAction>, ClientError> {
        if let Some(command) = self.pending.pop_front() {
            return Ok(self.execute(app, command).await);
        }

        tokio::select! {
            event = next_transport_event(&mut self.connection) => Ok(self.on_transport(app, event)),

            line = self.input.next_line(), if !self.input_closed => match line? {
                Some(line) => Ok(self.on_line(app, &line).await),
                None => {
                    tracing::debug!("input closed");
                    self.input_closed = true;
                    Ok(Vec::new())
                },
            },

            interrupt = tokio::signal::ctrl_c() => {
                interrupt?;
                Ok(app.quit())
            },

            _ = self.ticker.tick() => Ok(app.handle(AppEvent::Tick, self.env.now())),
        }
    }

    async fn dial(&mut self, url: &str) -> Result<(), ClientError> {
        if let Some(stale) = self.connection.take() {
            stale.stop();
        }
        self.connection = Some(transport::connect(url)?);
        Ok(())
    }

    async fn send(&mut self, intent: &ClientIntent) -> Result<(), ClientError> {
        let connection = self.connection.as_ref().ok_or(ClientError::NotConnected)?;
        tracing::debug!(intent = intent.name(), room = intent.room(), "sending");
        connection.send(intent.to_packet()).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }

    fn now(&self) -> std::time::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App<SystemEnv>) -> Result<(), ClientError> {
        let frame = render_frame(app, self.env.now(), self.focus);
        if frame == self.last_frame {
            return Ok(());
        }

        let mut out = io::stdout().lock();
        out.write_all(frame.as_bytes())?;
        out.flush()?;
        self.last_frame = frame;
        Ok(())
    }

    fn notify(&mut self, message: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = writeln!(out, "! {message}").and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "cannot write notice");
        }
    }

    fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.stop();
        }
    }
}

async fn next_transport_event(connection: &mut Option<Connection>) -> Option<TransportEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

/// Id and kind of the view numbered `number`.
fn find_view(app: &App<SystemEnv>, number: u64) -> Option<(ViewId, &'static str)> {
    app.views().find(|(id, _)| id.get() == number).map(|(id, view)| (id, view.kind()))
}

fn notice(message: String) -> Vec<AppAction> {
    vec![AppAction::Notice { message }]
}
