//! Keeps the remote's "now tuned" display in sync with the backend.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::errors::ApiError;
use crate::model::RemoteStatus;
use crate::surface::TextSurface;
use crate::timer::CycleTimer;

/// Shown instead of a channel number below 1.
pub const NO_CHANNEL: &str = "--";

pub struct StatusSurfaces {
    pub channel: Box<dyn TextSurface>,
    pub name: Box<dyn TextSurface>,
}

/// Channel number as displayed on the remote, zero-padded to two digits.
pub fn channel_label(channel: i32) -> String {
    if channel < 1 {
        NO_CHANNEL.to_string()
    } else {
        format!("{:02}", channel)
    }
}

enum StatusCommand {
    Publish(RemoteStatus),
    Snapshot(oneshot::Sender<Option<RemoteStatus>>),
    Shutdown,
}

struct Polled {
    token: u64,
    result: Result<RemoteStatus, ApiError>,
}

#[derive(Clone, Debug)]
pub struct StatusHandle {
    commands: mpsc::UnboundedSender<StatusCommand>,
}

impl StatusHandle {
    fn send(&self, command: StatusCommand) {
        if self.commands.send(command).is_err() {
            debug!("Status poller already stopped; command dropped");
        }
    }

    /// Applies a status learned elsewhere (e.g. a command response). Polls
    /// already in flight are superseded by it.
    pub fn publish(&self, status: RemoteStatus) {
        self.send(StatusCommand::Publish(status));
    }

    /// Last known status, `None` until the first successful poll.
    pub async fn snapshot(&self) -> Option<RemoteStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(StatusCommand::Snapshot(tx));
        rx.await.ok().flatten()
    }

    pub fn shutdown(&self) {
        self.send(StatusCommand::Shutdown);
    }
}

pub struct StatusPoller {
    surfaces: StatusSurfaces,
    backend: Arc<dyn Backend>,
    current: Option<RemoteStatus>,
    poll_timer: CycleTimer,
    last_issued: u64,
    last_applied: u64,
    commands: mpsc::UnboundedReceiver<StatusCommand>,
    polled_tx: mpsc::UnboundedSender<Polled>,
    polled_rx: mpsc::UnboundedReceiver<Polled>,
}

impl StatusPoller {
    /// Spawns a poller that asks immediately and then every `interval`.
    pub fn spawn(interval: Duration, surfaces: StatusSurfaces, backend: Arc<dyn Backend>) -> (StatusHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (polled_tx, polled_rx) = mpsc::unbounded_channel();
        let poller = Self {
            surfaces,
            backend,
            current: None,
            poll_timer: CycleTimer::repeating("status-poll", interval),
            last_issued: 0,
            last_applied: 0,
            commands: rx,
            polled_tx,
            polled_rx,
        };
        let task = tokio::spawn(poller.run());
        (StatusHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        self.poll();
        self.poll_timer.start();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(StatusCommand::Publish(status)) => {
                        // Anything still in flight was asked before this was known.
                        self.last_applied = self.last_issued;
                        self.apply(status);
                    }
                    Some(StatusCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.current.clone());
                    }
                    Some(StatusCommand::Shutdown) | None => break,
                },
                Some(polled) = self.polled_rx.recv() => self.on_polled(polled),
                _ = self.poll_timer.fired() => self.poll(),
            }
        }
        debug!("Status poller stopped");
    }

    fn poll(&mut self) {
        self.last_issued += 1;
        let token = self.last_issued;
        let backend = self.backend.clone();
        let tx = self.polled_tx.clone();
        trace!("Polling status (request #{})", token);
        tokio::spawn(async move {
            let result = backend.status().await;
            let _ = tx.send(Polled { token, result });
        });
    }

    fn on_polled(&mut self, polled: Polled) {
        if polled.token <= self.last_applied {
            debug!("Discarding stale status response #{}", polled.token);
            return;
        }
        match polled.result {
            Ok(status) => {
                self.last_applied = polled.token;
                self.apply(status);
            }
            Err(e) => debug!("Status poll failed: {}", e),
        }
    }

    fn apply(&mut self, status: RemoteStatus) {
        if self.current.as_ref() != Some(&status) {
            info!("Now tuned to channel {} ({})", channel_label(status.channel), status.name);
        }
        self.surfaces.channel.set_text(&channel_label(status.channel));
        self.surfaces.name.set_text(&status.name);
        self.current = Some(status);
    }
}
