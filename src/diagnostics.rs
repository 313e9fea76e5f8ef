//! Hardware diagnostics slideshow for the player host.
//!
//! Shows `player/info` as a handful of titled pages, refetches everything every
//! `refresh_interval`, and keeps a clock ticking in the footer of the visible page.

use std::sync::Arc;

use chrono::Local;
use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::content::ContentSource;
use crate::errors::ApiError;
use crate::input::{diagnostics_action, DiagnosticsAction, Key};
use crate::model::Slide;
use crate::presentation::DiagnosticsConfig;
use crate::slideshow::{Slideshow, SlideshowSnapshot};
use crate::surface::SlideSurface;
use crate::timer::CycleTimer;

/// Footer clock format.
pub const CLOCK_FORMAT: &str = "%H:%M:%S";

enum DiagnosticsCommand {
    Action(DiagnosticsAction),
    Snapshot(oneshot::Sender<SlideshowSnapshot>),
    Shutdown,
}

struct Loaded {
    token: u64,
    result: Result<Vec<Slide>, ApiError>,
}

#[derive(Clone, Debug)]
pub struct DiagnosticsHandle {
    commands: mpsc::UnboundedSender<DiagnosticsCommand>,
}

impl DiagnosticsHandle {
    fn send(&self, command: DiagnosticsCommand) {
        if self.commands.send(command).is_err() {
            debug!("Diagnostics slideshow already stopped; command dropped");
        }
    }

    pub fn key(&self, key: Key) {
        match diagnostics_action(key) {
            Some(action) => self.send(DiagnosticsCommand::Action(action)),
            None => trace!("Key {:?} has no diagnostics binding", key),
        }
    }

    pub fn next(&self) {
        self.send(DiagnosticsCommand::Action(DiagnosticsAction::Next));
    }

    pub fn previous(&self) {
        self.send(DiagnosticsCommand::Action(DiagnosticsAction::Previous));
    }

    /// Refetches the diagnostics and starts over at the first page.
    pub fn refresh(&self) {
        self.send(DiagnosticsCommand::Action(DiagnosticsAction::Refresh));
    }

    pub fn toggle_pause(&self) {
        self.send(DiagnosticsCommand::Action(DiagnosticsAction::TogglePause));
    }

    pub async fn snapshot(&self) -> Option<SlideshowSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(DiagnosticsCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(DiagnosticsCommand::Shutdown);
    }
}

pub struct DiagnosticsSlideshow {
    config: DiagnosticsConfig,
    surface: Box<dyn SlideSurface>,
    backend: Arc<dyn Backend>,
    slideshow: Slideshow,
    clock: CycleTimer,
    refresh: CycleTimer,
    commands: mpsc::UnboundedReceiver<DiagnosticsCommand>,
    loaded_tx: mpsc::UnboundedSender<Loaded>,
    loaded_rx: mpsc::UnboundedReceiver<Loaded>,
}

impl DiagnosticsSlideshow {
    pub fn spawn(
        config: DiagnosticsConfig,
        surface: Box<dyn SlideSurface>,
        backend: Arc<dyn Backend>,
    ) -> (DiagnosticsHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (loaded_tx, loaded_rx) = mpsc::unbounded_channel();
        let show = Self {
            // A single page has nothing to cycle to.
            slideshow: Slideshow::new(config.slide_duration, 2),
            clock: CycleTimer::repeating("diagnostics-clock", config.clock_interval),
            refresh: CycleTimer::repeating("diagnostics-refresh", config.refresh_interval),
            config,
            surface,
            backend,
            commands: rx,
            loaded_tx,
            loaded_rx,
        };
        let task = tokio::spawn(show.run());
        (DiagnosticsHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        info!("Starting diagnostics slideshow");
        self.clock.start();
        self.refresh.start();
        self.reload();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(DiagnosticsCommand::Action(action)) => self.on_action(action),
                    Some(DiagnosticsCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.slideshow.snapshot());
                    }
                    Some(DiagnosticsCommand::Shutdown) | None => break,
                },
                Some(loaded) = self.loaded_rx.recv() => self.on_loaded(loaded),
                _ = self.slideshow.tick() => {
                    if self.slideshow.advance().is_some() {
                        self.render_current();
                    }
                }
                _ = self.clock.fired() => self.update_clock(),
                _ = self.refresh.fired() => {
                    debug!("Periodic diagnostics refresh");
                    self.reload();
                }
            }
        }
        debug!("Diagnostics slideshow stopped");
    }

    fn reload(&mut self) {
        let token = self.slideshow.begin_load();
        self.surface.show_loading();
        let source = ContentSource::Diagnostics { rows_per_slide: self.config.rows_per_slide };
        let backend = self.backend.clone();
        let tx = self.loaded_tx.clone();
        tokio::spawn(async move {
            let result = source.load(backend.as_ref(), Local::now().naive_local()).await;
            let _ = tx.send(Loaded { token, result });
        });
    }

    fn on_loaded(&mut self, loaded: Loaded) {
        if !self.slideshow.is_current(loaded.token) {
            debug!("Discarding stale diagnostics response #{}", loaded.token);
            return;
        }
        match loaded.result {
            Ok(slides) => {
                self.slideshow.finish_load(slides);
                if self.slideshow.deck().is_empty() {
                    warn!("Player reported no diagnostics sections");
                    self.surface.clear();
                } else {
                    self.render_current();
                }
            }
            Err(e) => {
                warn!("Failed to load diagnostics: {}", e);
                self.surface.show_error(&format!("Failed to load diagnostics: {}", e.user_detail()));
                self.slideshow.finish_load(Vec::new());
            }
        }
    }

    fn on_action(&mut self, action: DiagnosticsAction) {
        match action {
            DiagnosticsAction::Next => {
                if self.slideshow.navigate_next().is_some() {
                    self.render_current();
                }
            }
            DiagnosticsAction::Previous => {
                if self.slideshow.navigate_previous().is_some() {
                    self.render_current();
                }
            }
            DiagnosticsAction::Refresh => {
                info!("Manual diagnostics refresh");
                self.reload();
            }
            DiagnosticsAction::TogglePause => self.slideshow.toggle_pause(),
        }
    }

    fn render_current(&mut self) {
        let deck = self.slideshow.deck();
        if let Some(slide) = deck.current() {
            self.surface.show_slide(slide, deck.index(), deck.len());
            self.update_clock();
        }
    }

    fn update_clock(&mut self) {
        if self.slideshow.deck().current().is_some() {
            self.surface.set_timestamp(&Local::now().format(CLOCK_FORMAT).to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::model::{CpuInfo, MemoryInfo, PlayerInfo, PresentationState, SystemInfo};
    use crate::test_support::{settle, FakeBackend, RecordingSlides};

    fn full_info() -> PlayerInfo {
        PlayerInfo {
            system: Some(SystemInfo {
                platform: Some("Linux".into()),
                architecture: Some("aarch64".into()),
                hostname: Some("tv-01".into()),
            }),
            temperature_c: Some(52.0),
            temperature_f: Some(125.6),
            memory: Some(MemoryInfo { total_gb: Some(4.0), used_percent: Some(41.0), available_gb: Some(2.3) }),
            cpu: Some(CpuInfo { cores: Some(4), load_percent: Some(12.5), load_1min: Some(0.5) }),
        }
    }

    async fn start(info: Result<PlayerInfo, String>) -> (DiagnosticsHandle, RecordingSlides, Arc<FakeBackend>) {
        let backend = FakeBackend::new();
        backend.set(|c| c.player_info = info);
        let slides = RecordingSlides::default();
        let (handle, _task) =
            DiagnosticsSlideshow::spawn(DiagnosticsConfig::default(), Box::new(slides.clone()), backend.shared());
        settle().await;
        (handle, slides, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn renders_the_first_page_after_loading() {
        let (handle, slides, _backend) = start(Ok(full_info())).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slide_count, 4);
        assert_eq!(snapshot.state, PresentationState::Presenting);
        let state = slides.state();
        assert_eq!(state.loading_screens, 1);
        assert_eq!(state.shown, vec![("SYSTEM INFORMATION".to_string(), 0, 4)]);
        assert_eq!(state.timestamps.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_every_seven_seconds_and_ticks_the_clock() {
        let (handle, slides, _backend) = start(Ok(full_info())).await;
        tokio::time::sleep(Duration::from_millis(7_001)).await;
        assert_eq!(handle.snapshot().await.unwrap().index, 1);
        let state = slides.state();
        assert_eq!(state.shown.last().map(|s| s.0.as_str()), Some("TEMPERATURE"));
        // One stamp per render plus one per second.
        assert_eq!(state.timestamps.len(), 2 + 7);
    }

    #[tokio::test(start_paused = true)]
    async fn single_page_does_not_cycle() {
        let info = PlayerInfo { temperature_c: Some(80.0), ..Default::default() };
        let (handle, slides, _backend) = start(Ok(info)).await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slide_count, 1);
        assert_eq!(snapshot.index, 0);
        assert_eq!(slides.state().shown.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_navigate_and_escape_pauses() {
        let (handle, _slides, _backend) = start(Ok(full_info())).await;
        handle.key(Key::ArrowLeft);
        assert_eq!(handle.snapshot().await.unwrap().index, 3);
        handle.key(Key::Char(' '));
        assert_eq!(handle.snapshot().await.unwrap().index, 0);

        handle.key(Key::Escape);
        tokio::time::sleep(Duration::from_secs(20)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PresentationState::Paused);
        assert_eq!(snapshot.index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_refetches_and_restarts_at_the_first_page() {
        let (handle, slides, backend) = start(Ok(full_info())).await;
        handle.next();
        handle.next();
        handle.key(Key::F5);
        settle().await;
        assert_eq!(backend.calls().player_info, 2);
        assert_eq!(handle.snapshot().await.unwrap().index, 0);
        assert_eq!(slides.state().loading_screens, 2);

        tokio::time::sleep(Duration::from_millis(30_001)).await;
        assert_eq!(backend.calls().player_info, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_shows_the_error_screen() {
        let (handle, slides, _backend) = start(Err("player offline".into())).await;
        assert_eq!(slides.state().error.as_deref(), Some("Failed to load diagnostics: player offline"));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slide_count, 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(slides.state().timestamps.is_empty());
    }
}
