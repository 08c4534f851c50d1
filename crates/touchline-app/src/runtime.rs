//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: context state machine
//! - [`Driver`]: platform-specific I/O

use std::collections::VecDeque;

use crate::{App, AppAction, AppEvent, Driver};

/// Generic runtime that orchestrates an [`App`] through a [`Driver`].
pub struct Runtime<D: Driver> {
    driver: D,
    app: App<D::Env>,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime over `driver` and `app`.
    pub fn new(driver: D, app: App<D::Env>) -> Self {
        Self { driver, app }
    }

    /// Run the main event loop until the app quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        loop {
            if self.step().await? {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Poll one input and execute the resulting actions.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        let actions = self.driver.poll_event(&mut self.app).await?;
        self.process_actions(actions).await
    }

    /// Execute actions, feeding failures back into the app.
    ///
    /// Returns `true` if a [`AppAction::Quit`] was seen. Remaining actions
    /// still run so teardown completes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending = VecDeque::from(actions);
        let mut quit = false;

        while let Some(action) = pending.pop_front() {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => quit = true,
                AppAction::Dial { url } => {
                    if let Err(err) = self.driver.dial(&url).await {
                        tracing::warn!(%url, error = %err, "dial failed");
                        let now = self.driver.now();
                        let reason = err.to_string();
                        pending.extend(self.app.handle(AppEvent::ConnectFailed { reason }, now));
                    }
                },
                AppAction::Close => self.driver.close().await,
                AppAction::Emit(intent) => {
                    if let Err(err) = self.driver.send(&intent).await {
                        tracing::warn!(intent = intent.name(), room = intent.room(), error = %err, "send failed");
                    }
                },
                AppAction::Notice { message } => self.driver.notify(&message),
            }
        }

        Ok(quit)
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App<D::Env> {
        &self.app
    }

    /// Get a mutable reference to the App.
    pub fn app_mut(&mut self) -> &mut App<D::Env> {
        &mut self.app
    }

    /// Get a reference to the Driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
