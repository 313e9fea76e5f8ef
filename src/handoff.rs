//! Hand-off of the selected pay-per-view item to the backend player.

use log::{debug, info, warn};

use crate::errors::ApiError;
use crate::model::PlayFileResponse;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum HandoffState {
    #[default]
    Idle,
    /// A play request is outstanding.
    Pending { token: u64, media_path: String },
    /// The player accepted the request; the slideshow stays stopped.
    HandedOff { media_path: String },
}

/// What the viewer must do once a play request has been answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandoffOutcome {
    HandedOff,
    /// Show `alert` and resume the slideshow.
    Failed { alert: String },
}

/// Text shown when the player refuses or cannot be reached.
pub fn failure_alert(detail: &str) -> String {
    format!("Failed to play: {}\n\nPress OK to resume slideshow.", detail)
}

#[derive(Debug, Default)]
pub struct PlaybackHandoff {
    state: HandoffState,
    last_token: u64,
}

impl PlaybackHandoff {
    pub fn state(&self) -> &HandoffState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, HandoffState::Pending { .. })
    }

    /// Marks `media_path` as requested. Returns the token of the new request, or
    /// `None` when one is already outstanding.
    pub fn begin(&mut self, media_path: &str) -> Option<u64> {
        if let HandoffState::Pending { media_path: pending, .. } = &self.state {
            warn!("Play request for '{}' still pending; ignoring confirm for '{}'", pending, media_path);
            return None;
        }
        self.last_token += 1;
        self.state = HandoffState::Pending { token: self.last_token, media_path: media_path.to_string() };
        info!("Handing '{}' off to the player (request #{})", media_path, self.last_token);
        Some(self.last_token)
    }

    /// Applies the answer to request `token`. Answers to anything but the pending
    /// request return `None`.
    pub fn complete(&mut self, token: u64, result: Result<PlayFileResponse, ApiError>) -> Option<HandoffOutcome> {
        let media_path = match &self.state {
            HandoffState::Pending { token: pending, media_path } if *pending == token => media_path.clone(),
            _ => {
                debug!("Discarding answer to stale play request #{}", token);
                return None;
            }
        };
        match result {
            Ok(response) if response.success => {
                info!("Player accepted '{}': {}", media_path, response.message);
                self.state = HandoffState::HandedOff { media_path };
                Some(HandoffOutcome::HandedOff)
            }
            Ok(response) => {
                warn!("Player refused '{}': {}", media_path, response.message);
                self.state = HandoffState::Idle;
                Some(HandoffOutcome::Failed { alert: failure_alert(&response.message) })
            }
            Err(e) => {
                warn!("Error sending play command for '{}': {}", media_path, e);
                self.state = HandoffState::Idle;
                Some(HandoffOutcome::Failed { alert: failure_alert(&e.user_detail()) })
            }
        }
    }
}
