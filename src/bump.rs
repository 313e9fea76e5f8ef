//! The station bump: a single full-screen card between programs.
//!
//! A `BumpController` applies a [`BumpConfig`] to its surfaces, optionally replaces
//! the static detail lines with the next shows of a schedule source, plays an
//! optional music bed and hides itself after the configured duration. External
//! callers re-configure a running bump through [`BumpHandle::update`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::audio::{AudioEvent, AudioHandle, AudioTrackController};
use crate::content::{ContentSource, MAX_DETAIL_LINES};
use crate::errors::ApiError;
use crate::model::Slide;
use crate::presentation::{BumpConfig, BumpOverrides};
use crate::surface::{AudioSurface, StageSurface, SurfaceEvent, TextSurface};
use crate::timer::CycleTimer;

/// Auto-hide never takes less than this.
pub const MIN_VISIBLE: Duration = Duration::from_millis(2_000);
/// Length of the closing fade.
pub const FADE_DURATION: Duration = Duration::from_millis(1_000);

pub const NO_UPCOMING_SHOWS: &str = "No upcoming shows";
pub const SCHEDULE_UNAVAILABLE: &str = "Schedule unavailable";

/// Everything a bump draws on.
pub struct BumpSurfaces {
    pub stage: Box<dyn StageSurface>,
    pub title: Box<dyn TextSurface>,
    pub subtitle: Box<dyn TextSurface>,
    pub details: [Box<dyn TextSurface>; MAX_DETAIL_LINES],
    pub audio: Box<dyn AudioSurface>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BumpPhase {
    Showing,
    Fading,
    Hidden,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BumpSnapshot {
    pub config: BumpConfig,
    pub phase: BumpPhase,
    /// Lines currently shown in the detail slots.
    pub detail_lines: Vec<String>,
    pub next_up_pending: bool,
}

/// When the fade starts and how long the bump stays up, or `None` to stay forever.
pub fn auto_hide_schedule(duration_ms: u64) -> Option<(Duration, Duration)> {
    if duration_ms == 0 {
        return None;
    }
    let total = Duration::from_millis(duration_ms).max(MIN_VISIBLE);
    Some((total.saturating_sub(FADE_DURATION), total))
}

enum BumpCommand {
    Update(BumpOverrides),
    Surface(SurfaceEvent),
    Audio(AudioEvent),
    Snapshot(oneshot::Sender<BumpSnapshot>),
    Shutdown,
}

struct NextUpLoaded {
    token: u64,
    result: Result<Vec<Slide>, ApiError>,
}

#[derive(Clone, Debug)]
pub struct BumpHandle {
    commands: mpsc::UnboundedSender<BumpCommand>,
}

impl BumpHandle {
    fn send(&self, command: BumpCommand) {
        if self.commands.send(command).is_err() {
            debug!("Bump controller already stopped; command dropped");
        }
    }

    /// Merges `overrides` into the running configuration and re-applies it.
    pub fn update(&self, overrides: BumpOverrides) {
        self.send(BumpCommand::Update(overrides));
    }

    pub fn notify(&self, event: SurfaceEvent) {
        self.send(BumpCommand::Surface(event));
    }

    pub fn notify_audio(&self, event: AudioEvent) {
        self.send(BumpCommand::Audio(event));
    }

    pub async fn snapshot(&self) -> Option<BumpSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(BumpCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(BumpCommand::Shutdown);
    }
}

pub struct BumpController {
    config: BumpConfig,
    stage: Box<dyn StageSurface>,
    title: Box<dyn TextSurface>,
    subtitle: Box<dyn TextSurface>,
    details: [Box<dyn TextSurface>; MAX_DETAIL_LINES],
    audio: AudioHandle,
    backend: Arc<dyn Backend>,
    phase: BumpPhase,
    detail_lines: Vec<String>,
    next_up_token: u64,
    next_up_pending: bool,
    fade_timer: CycleTimer,
    hide_timer: CycleTimer,
    commands: mpsc::UnboundedReceiver<BumpCommand>,
    loaded_tx: mpsc::UnboundedSender<NextUpLoaded>,
    loaded_rx: mpsc::UnboundedReceiver<NextUpLoaded>,
}

impl BumpController {
    /// Spawns a bump showing `config`. Auto-hide is armed immediately.
    pub fn spawn(config: BumpConfig, surfaces: BumpSurfaces, backend: Arc<dyn Backend>) -> (BumpHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (loaded_tx, loaded_rx) = mpsc::unbounded_channel();
        let BumpSurfaces { stage, title, subtitle, details, audio } = surfaces;
        let (audio, _audio_task) = AudioTrackController::spawn(audio);
        let controller = Self {
            config,
            stage,
            title,
            subtitle,
            details,
            audio,
            backend,
            phase: BumpPhase::Showing,
            detail_lines: Vec::new(),
            next_up_token: 0,
            next_up_pending: false,
            fade_timer: CycleTimer::once("bump-fade", Duration::ZERO),
            hide_timer: CycleTimer::once("bump-hide", FADE_DURATION),
            commands: rx,
            loaded_tx,
            loaded_rx,
        };
        let task = tokio::spawn(controller.run());
        (BumpHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        info!("Showing bump '{}'", self.config.title);
        self.apply_configuration();
        self.arm_auto_hide();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(BumpCommand::Update(overrides)) => {
                        debug!("Updating bump with {:?}", overrides);
                        self.config.merge(overrides);
                        self.apply_configuration();
                    }
                    Some(BumpCommand::Surface(event)) => self.on_surface_event(event),
                    Some(BumpCommand::Audio(event)) => self.audio.notify(event),
                    Some(BumpCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(BumpCommand::Shutdown) | None => break,
                },
                Some(loaded) = self.loaded_rx.recv() => self.on_next_up(loaded),
                _ = self.fade_timer.fired() => self.begin_fade(),
                _ = self.hide_timer.fired() => self.hide(),
            }
        }
        self.audio.shutdown();
        debug!("Bump '{}' stopped", self.config.title);
    }

    fn snapshot(&self) -> BumpSnapshot {
        BumpSnapshot {
            config: self.config.clone(),
            phase: self.phase,
            detail_lines: self.detail_lines.clone(),
            next_up_pending: self.next_up_pending,
        }
    }

    /// Pushes the whole configuration to the surfaces. Running it twice with the
    /// same configuration leaves the same visible state.
    fn apply_configuration(&mut self) {
        self.title.set_text(&self.config.title);
        self.subtitle.set_text(&self.config.subtitle);

        match self.config.next_up.clone() {
            Some(source_id) => self.request_next_up(source_id),
            None => {
                // A pending lookup must not overwrite the static lines.
                self.next_up_token += 1;
                self.next_up_pending = false;
                let lines = self.config.details.clone();
                self.show_details(lines);
            }
        }

        self.stage.set_background(&self.config.background());
        self.stage.set_variation(self.config.variation);

        if let Some(href) = &self.config.css_override {
            debug!("Loading CSS override: {}", href);
            self.stage.replace_stylesheet(href);
        }

        let color = self.config.fg_color.as_deref();
        self.title.set_color(color);
        self.subtitle.set_color(color);
        for detail in self.details.iter_mut() {
            detail.set_color(color);
        }

        if let Some(track) = &self.config.bg_music {
            self.audio.play(vec![track.clone()]);
        }
    }

    fn show_details(&mut self, lines: Vec<String>) {
        for (index, slot) in self.details.iter_mut().enumerate() {
            match lines.get(index).filter(|line| !line.is_empty()) {
                Some(line) => {
                    slot.set_text(line);
                    slot.set_visible(true);
                }
                None => slot.set_visible(false),
            }
        }
        self.detail_lines = lines.into_iter().take(MAX_DETAIL_LINES).collect();
    }

    fn request_next_up(&mut self, source_id: String) {
        self.next_up_token += 1;
        self.next_up_pending = true;
        let token = self.next_up_token;
        let backend = self.backend.clone();
        let tx = self.loaded_tx.clone();
        debug!("Fetching next-up shows for '{}' (request #{})", source_id, token);
        tokio::spawn(async move {
            let source = ContentSource::Schedule { source_id };
            let result = source.load(backend.as_ref(), Local::now().naive_local()).await;
            let _ = tx.send(NextUpLoaded { token, result });
        });
    }

    fn on_next_up(&mut self, loaded: NextUpLoaded) {
        if loaded.token != self.next_up_token {
            debug!("Discarding stale next-up response #{}", loaded.token);
            return;
        }
        self.next_up_pending = false;
        let lines = match loaded.result {
            Ok(slides) => {
                let lines = match slides.into_iter().next() {
                    Some(Slide::Bump { detail_lines, .. }) => detail_lines,
                    _ => Vec::new(),
                };
                if lines.is_empty() {
                    vec![NO_UPCOMING_SHOWS.to_string()]
                } else {
                    lines
                }
            }
            Err(e) => {
                warn!("Error loading next up shows: {}", e);
                vec![SCHEDULE_UNAVAILABLE.to_string()]
            }
        };
        self.show_details(lines);
    }

    fn arm_auto_hide(&mut self) {
        match auto_hide_schedule(self.config.duration_ms) {
            Some((fade_at, total)) => {
                debug!("Bump will fade after {:?} and hide after {:?}", fade_at, total);
                self.fade_timer.set_period(fade_at);
                self.fade_timer.start();
            }
            None => trace!("Bump stays up indefinitely"),
        }
    }

    fn begin_fade(&mut self) {
        info!("Fading out bump '{}'", self.config.title);
        self.phase = BumpPhase::Fading;
        if self.config.bg_music.is_some() {
            self.audio.fade_out();
        }
        self.stage.begin_fade(FADE_DURATION);
        self.hide_timer.start();
    }

    fn hide(&mut self) {
        self.phase = BumpPhase::Hidden;
        self.stage.hide();
        info!("Bump '{}' hidden", self.config.title);
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::StylesheetLoaded { href } => info!("CSS override loaded successfully: {}", href),
            SurfaceEvent::StylesheetFailed { href } => warn!("Failed to load CSS override: {}", href),
            SurfaceEvent::ImageFailed { url } => warn!("Failed to load bump background image: {}", url),
        }
    }
}
