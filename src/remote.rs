//! Numeric channel entry for the remote-control surface.
//!
//! Digits accumulate in a two-digit [`EntryBuffer`]. The number is sent as a
//! `direct` tune command once no digit has been typed for the commit delay, or
//! straight away on Enter.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::errors::ApiError;
use crate::input::{remote_action, Key, RemoteAction};
use crate::model::{CommandResponse, RemoteCommand};
use crate::presentation::RemoteConfig;
use crate::status_poller::StatusHandle;
use crate::surface::TextSurface;
use crate::timer::CycleTimer;

/// Longest channel number that can be typed.
pub const MAX_DIGITS: usize = 2;

/// Shown on the entry display while nothing is typed.
pub const EMPTY_ENTRY: &str = "_";

/// Digits typed so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryBuffer {
    digits: String,
}

impl EntryBuffer {
    /// Appends `digit`, starting over once the buffer is full. Returns `false`
    /// (and leaves the buffer alone) for anything but an ASCII digit.
    pub fn push(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() {
            warn!("Ignoring non-digit channel input {:?}", digit);
            return false;
        }
        if self.digits.len() >= MAX_DIGITS {
            self.digits.clear();
        }
        self.digits.push(digit);
        true
    }

    /// Empties the buffer, returning what it held.
    pub fn take(&mut self) -> Option<String> {
        if self.digits.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.digits))
        }
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// What the entry display shows.
    pub fn display(&self) -> &str {
        if self.digits.is_empty() {
            EMPTY_ENTRY
        } else {
            &self.digits
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub entry: String,
    pub commit_pending: bool,
}

enum EntryCommand {
    Action(RemoteAction),
    Snapshot(oneshot::Sender<RemoteSnapshot>),
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct RemoteHandle {
    commands: mpsc::UnboundedSender<EntryCommand>,
}

impl RemoteHandle {
    fn send(&self, command: EntryCommand) {
        if self.commands.send(command).is_err() {
            debug!("Remote entry controller already stopped; command dropped");
        }
    }

    pub fn key(&self, key: Key) {
        match remote_action(key) {
            Some(action) => self.send(EntryCommand::Action(action)),
            None => trace!("Key {:?} has no remote binding", key),
        }
    }

    pub fn digit(&self, digit: char) {
        self.send(EntryCommand::Action(RemoteAction::Digit(digit)));
    }

    /// Sends the typed number now instead of waiting for the commit delay.
    pub fn commit(&self) {
        self.send(EntryCommand::Action(RemoteAction::Commit));
    }

    pub fn clear(&self) {
        self.send(EntryCommand::Action(RemoteAction::Clear));
    }

    pub fn channel_up(&self) {
        self.send(EntryCommand::Action(RemoteAction::ChannelUp));
    }

    pub fn channel_down(&self) {
        self.send(EntryCommand::Action(RemoteAction::ChannelDown));
    }

    pub async fn snapshot(&self) -> Option<RemoteSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(EntryCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(EntryCommand::Shutdown);
    }
}

pub struct RemoteEntryController {
    buffer: EntryBuffer,
    display: Box<dyn TextSurface>,
    backend: Arc<dyn Backend>,
    status: Option<StatusHandle>,
    commit_timer: CycleTimer,
    commands: mpsc::UnboundedReceiver<EntryCommand>,
    sent_tx: mpsc::UnboundedSender<Result<CommandResponse, ApiError>>,
    sent_rx: mpsc::UnboundedReceiver<Result<CommandResponse, ApiError>>,
}

impl RemoteEntryController {
    /// Spawns the controller. Command responses are forwarded to `status` when given.
    pub fn spawn(
        config: &RemoteConfig,
        display: Box<dyn TextSurface>,
        backend: Arc<dyn Backend>,
        status: Option<StatusHandle>,
    ) -> (RemoteHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let controller = Self {
            buffer: EntryBuffer::default(),
            display,
            backend,
            status,
            commit_timer: CycleTimer::once("entry-commit", config.commit_delay),
            commands: rx,
            sent_tx,
            sent_rx,
        };
        let task = tokio::spawn(controller.run());
        (RemoteHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        self.render();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EntryCommand::Action(action)) => self.on_action(action),
                    Some(EntryCommand::Snapshot(reply)) => {
                        let _ = reply.send(RemoteSnapshot {
                            entry: self.buffer.as_str().to_string(),
                            commit_pending: self.commit_timer.is_running(),
                        });
                    }
                    Some(EntryCommand::Shutdown) | None => break,
                },
                Some(result) = self.sent_rx.recv() => self.on_command_sent(result),
                _ = self.commit_timer.fired() => {
                    trace!("Channel entry idle; committing");
                    self.commit();
                }
            }
        }
        debug!("Remote entry controller stopped");
    }

    fn on_action(&mut self, action: RemoteAction) {
        match action {
            RemoteAction::Digit(digit) => {
                if self.buffer.push(digit) {
                    self.render();
                    self.commit_timer.start();
                }
            }
            RemoteAction::Commit => self.commit(),
            RemoteAction::Clear => {
                self.commit_timer.stop();
                self.buffer.clear();
                self.render();
            }
            RemoteAction::ChannelUp => self.send_command(RemoteCommand::up()),
            RemoteAction::ChannelDown => self.send_command(RemoteCommand::down()),
        }
    }

    fn commit(&mut self) {
        self.commit_timer.stop();
        let Some(digits) = self.buffer.take() else {
            return;
        };
        self.render();
        match digits.parse::<i32>() {
            Ok(channel) => {
                info!("Tuning to channel {}", channel);
                self.send_command(RemoteCommand::direct(channel));
            }
            Err(e) => warn!("Could not parse channel entry '{}': {}", digits, e),
        }
    }

    fn send_command(&self, command: RemoteCommand) {
        let backend = self.backend.clone();
        let tx = self.sent_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(backend.send_command(&command).await);
        });
    }

    fn on_command_sent(&mut self, result: Result<CommandResponse, ApiError>) {
        match result {
            Ok(CommandResponse { current: Some(current) }) => match &self.status {
                Some(status) => status.publish(current),
                None => debug!("Player now on channel {} ({})", current.channel, current.name),
            },
            Ok(CommandResponse { current: None }) => trace!("Command accepted without a status"),
            Err(e) => warn!("Error sending remote command: {}", e),
        }
    }

    fn render(&mut self) {
        self.display.set_text(self.buffer.display());
    }
}
