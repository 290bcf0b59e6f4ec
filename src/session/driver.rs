//! Async event loop around a [`SessionController`].
//!
//! The driver owns the controller and feeds it one event at a time: control
//! commands, motion samples, fix completions and poll ticks. Fix futures run
//! on spawned tasks and report back through a channel, so a slow receiver
//! never blocks motion processing. Consumers watch a crossbeam channel of
//! [`SessionUpdate`]s.

use crate::recording::ScoreRecord;
use crate::sensors::{LocationError, PositionFix, TelemetrySample};
use crate::session::controller::{FixTicket, SessionController, SessionError, SessionSources};
use crate::session::state::TelemetrySnapshot;
use crate::storage::config::EngineConfig;
use crossbeam::channel::{Receiver, Sender};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

/// Finest granularity at which fix polling is checked.
const POLL_RESOLUTION: Duration = Duration::from_millis(100);

/// Control commands accepted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
    Reset,
    Toggle,
    Shutdown,
}

/// Events published to display and persistence consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A run started
    Started,
    /// State changed
    Snapshot(TelemetrySnapshot),
    /// Non-fatal location failure
    Warning(LocationError),
    /// A command could not be carried out
    Error(SessionError),
    /// A run ended with this result
    Stopped(ScoreRecord),
}

/// Cloneable handle for sending commands to a running driver.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Send a command. Returns `false` once the driver has exited.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(SessionCommand::Start)
    }

    pub fn stop(&self) -> bool {
        self.send(SessionCommand::Stop)
    }

    pub fn reset(&self) -> bool {
        self.send(SessionCommand::Reset)
    }

    pub fn toggle(&self) -> bool {
        self.send(SessionCommand::Toggle)
    }

    /// Stop any run and end the event loop.
    pub fn shutdown(&self) -> bool {
        self.send(SessionCommand::Shutdown)
    }
}

type FixCompletion = (FixTicket, Result<PositionFix, LocationError>);

/// Event loop owning a session controller.
pub struct SessionDriver {
    controller: SessionController,
    commands: UnboundedReceiver<SessionCommand>,
    motion_rx: UnboundedReceiver<TelemetrySample>,
    fix_tx: UnboundedSender<FixCompletion>,
    fix_rx: UnboundedReceiver<FixCompletion>,
    updates: Sender<SessionUpdate>,
    poll_resolution: Duration,
}

impl SessionDriver {
    /// Build a driver, its command handle and the update receiver.
    pub fn new(
        config: &EngineConfig,
        sources: SessionSources,
    ) -> (Self, SessionHandle, Receiver<SessionUpdate>) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (motion_tx, motion_rx) = mpsc::unbounded_channel();
        let (fix_tx, fix_rx) = mpsc::unbounded_channel();
        let (updates, update_rx) = crossbeam::channel::unbounded();

        let poll_resolution =
            Duration::from_millis(config.speed.poll_interval_ms.max(1)).min(POLL_RESOLUTION);

        let driver = Self {
            controller: SessionController::new(config, sources, motion_tx),
            commands,
            motion_rx,
            fix_tx,
            fix_rx,
            updates,
            poll_resolution,
        };

        (driver, SessionHandle { tx: command_tx }, update_rx)
    }

    /// Run until shut down or every handle is dropped. Returns the controller
    /// with the final session state.
    pub async fn run(mut self) -> SessionController {
        if let Err(e) = self.controller.authorize().await {
            self.emit(SessionUpdate::Error(e));
        }

        let mut poll = tokio::time::interval(self.poll_resolution);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(sample) = self.motion_rx.recv() => {
                    if let Some(snapshot) = self.controller.on_motion_sample(&sample) {
                        self.emit(SessionUpdate::Snapshot(snapshot));
                    }
                }
                Some((ticket, result)) = self.fix_rx.recv() => {
                    match self.controller.on_position_fix(ticket, result) {
                        Ok(Some(snapshot)) => self.emit(SessionUpdate::Snapshot(snapshot)),
                        Ok(None) => {}
                        Err(e) => self.emit(SessionUpdate::Warning(e)),
                    }
                }
                _ = poll.tick() => self.request_due_fix(),
            }
        }

        self.stop_session();
        tracing::debug!("Session driver exited");
        self.controller
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start => self.start_session(),
            SessionCommand::Stop => self.stop_session(),
            SessionCommand::Toggle => {
                if self.controller.is_running() {
                    self.stop_session();
                } else {
                    self.start_session();
                }
            }
            SessionCommand::Reset => {
                self.controller.reset(Instant::now());
                self.emit(SessionUpdate::Snapshot(self.controller.snapshot()));
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn start_session(&mut self) {
        // A restart publishes the ending run's record first.
        self.stop_session();
        match self.controller.start(Instant::now()) {
            Ok(()) => self.emit(SessionUpdate::Started),
            Err(e) => {
                tracing::warn!("Failed to start session: {}", e);
                self.emit(SessionUpdate::Error(e));
            }
        }
    }

    fn stop_session(&mut self) {
        if self.controller.is_running() {
            self.controller.stop();
            self.emit(SessionUpdate::Stopped(self.controller.record()));
        }
    }

    fn request_due_fix(&mut self) {
        let Some(request) = self.controller.due_fix_request(Instant::now()) else {
            return;
        };

        let tx = self.fix_tx.clone();
        tokio::spawn(async move {
            let result = request.fix.await;
            let _ = tx.send((request.ticket, result));
        });
    }

    fn emit(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }
}
