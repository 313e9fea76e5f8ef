//! Defines the core data structures used by the interstitial displays.
//!
//! This includes the slides shown on screen, the payloads deserialized from the
//! backend API, and the small enums describing presentation state.

use serde::{Deserialize, Deserializer, Serialize};

/// A single displayable slide. Slides are built once from a content fetch and
/// never modified afterwards; only the active index moves.
#[derive(Clone, Debug, PartialEq)]
pub enum Slide {
    /// Station bump: a title and up to three detail lines.
    Bump { title: String, detail_lines: Vec<String> },
    /// Pay-per-view preview of one media entry.
    Ppv(PpvSlide),
    /// One page of hardware diagnostics.
    Diagnostics { title: String, rows: Vec<DataRow> },
}

impl Slide {
    /// Title shown at the top of the slide, used mostly for logging.
    pub fn title(&self) -> &str {
        match self {
            Slide::Bump { title, .. } => title,
            Slide::Ppv(slide) => &slide.title,
            Slide::Diagnostics { title, .. } => title,
        }
    }
}

/// A pay-per-view entry as displayed by the viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct PpvSlide {
    pub title: String,
    /// The NFO info line (year, rating, runtime...).
    pub subtitle_info: String,
    pub description: String,
    /// Present only when the backend reported a usable image.
    pub image_url: Option<String>,
    /// Path handed to the backend player on confirm.
    pub media_path: String,
}

/// Colour band for a diagnostics value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    Normal,
    High,
}

/// A `label: value` row on a diagnostics slide.
#[derive(Clone, Debug, PartialEq)]
pub struct DataRow {
    pub label: String,
    pub value: String,
    pub level: Option<Level>,
}

impl DataRow {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self { label: label.to_string(), value: value.into(), level: None }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
}

/// Direction of the last navigation, used to pick slide-in animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Represents the presentation state of a slideshow-driven display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationState {
    /// Waiting for the content fetch (initial load or refresh).
    Loading,
    /// Slides are shown and auto-advance is running.
    Presenting,
    /// Slides are shown but auto-advance is stopped.
    Paused,
}

// --- Backend payloads ---

/// One block of a channel schedule.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ScheduleBlock {
    /// Naive local timestamp, `YYYY-MM-DDTHH:MM:SS`.
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Response of `GET schedules/{id}`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub schedule_blocks: Vec<ScheduleBlock>,
}

/// Text read from an entry's NFO sidecar file.
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
pub struct NfoData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One pay-per-view media entry.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct PpvContent {
    pub filename: String,
    pub video_path: String,
    #[serde(default)]
    pub nfo: Option<NfoData>,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Response of `GET ppv/{channel}`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PpvContentList {
    #[serde(default)]
    pub contents: Vec<PpvContent>,
}

/// Body of `POST ppv/{channel}/play_file`.
#[derive(Serialize, Clone, Debug)]
pub struct PlayFileRequest<'a> {
    pub file_path: &'a str,
}

/// Acknowledgment of a play request.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PlayFileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SystemInfo {
    pub platform: Option<String>,
    pub architecture: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MemoryInfo {
    pub total_gb: Option<f64>,
    pub used_percent: Option<f64>,
    pub available_gb: Option<f64>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
pub struct CpuInfo {
    pub cores: Option<u32>,
    pub load_percent: Option<f64>,
    pub load_1min: Option<f64>,
}

/// Response of `GET player/info`. Every section is optional and rendered only
/// when present.
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PlayerInfo {
    #[serde(default)]
    pub system: Option<SystemInfo>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub temperature_f: Option<f64>,
    #[serde(default)]
    pub memory: Option<MemoryInfo>,
    #[serde(default)]
    pub cpu: Option<CpuInfo>,
}

/// Response of `GET player/status/queue_connected`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct QueueStatus {
    #[serde(default)]
    pub queue_connected: bool,
}

/// The channel currently tuned, as reported by the backend.
///
/// The backend sends `null` for both fields when nothing is tuned; that reads as
/// channel `-1` with an empty name.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoteStatus {
    #[serde(default = "untuned_channel", deserialize_with = "channel_or_untuned")]
    pub channel: i32,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
}

fn untuned_channel() -> i32 {
    -1
}

fn channel_or_untuned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or_else(untuned_channel))
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Command sent to `POST /api/command`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoteCommand {
    pub command: &'static str,
    pub channel: i32,
}

impl RemoteCommand {
    pub fn direct(channel: i32) -> Self {
        Self { command: "direct", channel }
    }

    pub fn up() -> Self {
        Self { command: "up", channel: -1 }
    }

    pub fn down() -> Self {
        Self { command: "down", channel: -1 }
    }
}

/// Response of `POST /api/command`.
#[derive(Deserialize, Clone, Debug)]
pub struct CommandResponse {
    #[serde(default)]
    pub current: Option<RemoteStatus>,
}

/// The background-music manifest served next to the viewer page.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MusicManifest {
    #[serde(default)]
    pub music_files: Vec<String>,
}
