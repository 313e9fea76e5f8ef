//! The pay-per-view viewer.
//!
//! Cycles the catalog of a pay-per-view channel, one title per slide, while a
//! background-music playlist runs independently. Confirming a slide hands the
//! title to the backend player; see [`crate::handoff`].

use std::sync::Arc;

use chrono::Local;
use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::audio::{load_manifest, AudioEvent, AudioHandle, AudioTrackController};
use crate::content::ContentSource;
use crate::errors::ApiError;
use crate::handoff::{HandoffOutcome, HandoffState, PlaybackHandoff};
use crate::input::{ppv_action, Key, PpvAction};
use crate::model::{PlayFileResponse, Slide};
use crate::presentation::PpvConfig;
use crate::slideshow::{Slideshow, SlideshowSnapshot};
use crate::surface::{AudioSurface, ImageSurface, NoticeSurface, StageSurface, SurfaceEvent, TextSurface};

pub const LOADING_MESSAGE: &str = "Loading...";
pub const NO_CONTENT_MESSAGE: &str = "No content available";

pub struct PpvSurfaces {
    pub stage: Box<dyn StageSurface>,
    pub image: Box<dyn ImageSurface>,
    pub title: Box<dyn TextSurface>,
    pub details: Box<dyn TextSurface>,
    pub description: Box<dyn TextSurface>,
    pub counter: Box<dyn TextSurface>,
    pub notice: Box<dyn NoticeSurface>,
    pub audio: Box<dyn AudioSurface>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PpvSnapshot {
    pub slideshow: SlideshowSnapshot,
    pub handoff: HandoffState,
}

enum PpvCommand {
    Action(PpvAction),
    Surface(SurfaceEvent),
    Audio(AudioEvent),
    Snapshot(oneshot::Sender<PpvSnapshot>),
    Shutdown,
}

enum Completion {
    Content { token: u64, result: Result<Vec<Slide>, ApiError> },
    Play { token: u64, result: Result<PlayFileResponse, ApiError> },
}

#[derive(Clone, Debug)]
pub struct PpvHandle {
    commands: mpsc::UnboundedSender<PpvCommand>,
}

impl PpvHandle {
    fn send(&self, command: PpvCommand) {
        if self.commands.send(command).is_err() {
            debug!("PPV viewer already stopped; command dropped");
        }
    }

    /// Dispatches a key press; keys without a binding are ignored.
    pub fn key(&self, key: Key) {
        match ppv_action(key) {
            Some(action) => self.send(PpvCommand::Action(action)),
            None => trace!("Key {:?} has no PPV binding", key),
        }
    }

    pub fn next(&self) {
        self.send(PpvCommand::Action(PpvAction::Next));
    }

    pub fn previous(&self) {
        self.send(PpvCommand::Action(PpvAction::Previous));
    }

    /// Orders the visible title.
    pub fn confirm(&self) {
        self.send(PpvCommand::Action(PpvAction::Confirm));
    }

    pub fn toggle_pause(&self) {
        self.send(PpvCommand::Action(PpvAction::TogglePause));
    }

    pub fn notify(&self, event: SurfaceEvent) {
        self.send(PpvCommand::Surface(event));
    }

    pub fn notify_audio(&self, event: AudioEvent) {
        self.send(PpvCommand::Audio(event));
    }

    pub async fn snapshot(&self) -> Option<PpvSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(PpvCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(PpvCommand::Shutdown);
    }
}

/// The surfaces the viewer keeps once the audio surface is handed to its controller.
struct Screen {
    stage: Box<dyn StageSurface>,
    image: Box<dyn ImageSurface>,
    title: Box<dyn TextSurface>,
    details: Box<dyn TextSurface>,
    description: Box<dyn TextSurface>,
    counter: Box<dyn TextSurface>,
    notice: Box<dyn NoticeSurface>,
}

pub struct PpvViewer {
    config: PpvConfig,
    surfaces: Screen,
    audio: AudioHandle,
    backend: Arc<dyn Backend>,
    slideshow: Slideshow,
    handoff: PlaybackHandoff,
    commands: mpsc::UnboundedReceiver<PpvCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl PpvViewer {
    pub fn spawn(config: PpvConfig, surfaces: PpvSurfaces, backend: Arc<dyn Backend>) -> (PpvHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let PpvSurfaces { stage, image, title, details, description, counter, notice, audio } = surfaces;
        let (audio, _audio_task) = AudioTrackController::spawn(audio);
        let surfaces = Screen { stage, image, title, details, description, counter, notice };
        let viewer = Self {
            slideshow: Slideshow::new(config.slide_duration, 1),
            config,
            surfaces,
            audio,
            backend,
            handoff: PlaybackHandoff::default(),
            commands: rx,
            completions_tx,
            completions_rx,
        };
        let task = tokio::spawn(viewer.run());
        (PpvHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        info!("Starting PPV viewer for channel {}", self.config.channel);
        self.surfaces.stage.show_overlay(LOADING_MESSAGE);
        self.load_content();
        self.load_music();
        self.apply_configuration();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PpvCommand::Action(action)) => self.on_action(action),
                    Some(PpvCommand::Surface(event)) => self.on_surface_event(event),
                    Some(PpvCommand::Audio(event)) => self.audio.notify(event),
                    Some(PpvCommand::Snapshot(reply)) => {
                        let _ = reply.send(PpvSnapshot {
                            slideshow: self.slideshow.snapshot(),
                            handoff: self.handoff.state().clone(),
                        });
                    }
                    Some(PpvCommand::Shutdown) | None => break,
                },
                Some(completion) = self.completions_rx.recv() => self.on_completion(completion),
                _ = self.slideshow.tick() => {
                    if self.slideshow.advance().is_some() {
                        self.render_current();
                    }
                }
            }
        }
        self.audio.shutdown();
        debug!("PPV viewer for channel {} stopped", self.config.channel);
    }

    fn load_content(&mut self) {
        let token = self.slideshow.begin_load();
        let source = ContentSource::PayPerView { channel: self.config.channel, variation: self.config.variation };
        let backend = self.backend.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.load(backend.as_ref(), Local::now().naive_local()).await;
            let _ = tx.send(Completion::Content { token, result });
        });
    }

    fn load_music(&self) {
        let backend = self.backend.clone();
        let audio = self.audio.clone();
        let manifest = self.config.music_manifest.clone();
        tokio::spawn(async move {
            let tracks = load_manifest(backend, &manifest).await;
            audio.play(tracks);
        });
    }

    fn apply_configuration(&mut self) {
        let stage = &mut self.surfaces.stage;
        stage.set_variation(self.config.variation);
        if let Some(background) = self.config.background() {
            stage.set_background(&background);
        }
        if let Some(href) = &self.config.css_override {
            debug!("Loading CSS override: {}", href);
            stage.replace_stylesheet(href);
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Content { token, result } => {
                if !self.slideshow.is_current(token) {
                    debug!("Discarding stale PPV content response #{}", token);
                    return;
                }
                match result {
                    Ok(slides) => {
                        if slides.is_empty() {
                            warn!("Channel {} has no PPV content", self.config.channel);
                            self.surfaces.stage.show_overlay(NO_CONTENT_MESSAGE);
                        } else {
                            self.surfaces.stage.hide_overlay();
                        }
                        self.slideshow.finish_load(slides);
                        self.render_current();
                    }
                    Err(e) => {
                        warn!("Error loading PPV content for channel {}: {}", self.config.channel, e);
                        self.surfaces
                            .stage
                            .show_overlay(&format!("Failed to load content: {}", e.user_detail()));
                        self.slideshow.finish_load(Vec::new());
                    }
                }
            }
            Completion::Play { token, result } => match self.handoff.complete(token, result) {
                Some(HandoffOutcome::HandedOff) => {
                    debug!("Slideshow stays stopped while the player runs");
                }
                Some(HandoffOutcome::Failed { alert }) => {
                    self.surfaces.notice.alert(&alert);
                    self.slideshow.start();
                }
                None => {}
            },
        }
    }

    fn on_action(&mut self, action: PpvAction) {
        match action {
            PpvAction::Next => {
                if self.slideshow.navigate_next().is_some() {
                    self.render_current();
                }
            }
            PpvAction::Previous => {
                if self.slideshow.navigate_previous().is_some() {
                    self.render_current();
                }
            }
            PpvAction::Confirm => self.confirm_selection(),
            PpvAction::TogglePause => {
                if matches!(self.handoff.state(), HandoffState::Idle) {
                    self.slideshow.toggle_pause();
                } else {
                    debug!("Pause toggle ignored while {:?}", self.handoff.state());
                }
            }
        }
    }

    fn confirm_selection(&mut self) {
        let Some(Slide::Ppv(selected)) = self.slideshow.deck().current() else {
            trace!("Nothing to confirm");
            return;
        };
        let media_path = selected.media_path.clone();
        let Some(token) = self.handoff.begin(&media_path) else {
            return;
        };
        self.slideshow.pause();
        let channel = self.config.channel;
        let backend = self.backend.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = backend.play_file(channel, &media_path).await;
            let _ = tx.send(Completion::Play { token, result });
        });
    }

    fn render_current(&mut self) {
        let deck = self.slideshow.deck();
        let (index, total, direction) = (deck.index(), deck.len(), deck.direction());
        let Some(Slide::Ppv(slide)) = deck.current() else {
            return;
        };
        let surfaces = &mut self.surfaces;
        surfaces.counter.set_text(&format!("{}/{}", index + 1, total));
        surfaces.title.set_text(&slide.title);
        surfaces.details.set_text(&slide.subtitle_info);
        surfaces.description.set_text(&slide.description);
        match &slide.image_url {
            Some(url) => surfaces.image.show(url, direction),
            None => surfaces.image.show_placeholder(),
        }
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::ImageFailed { url } => {
                warn!("Failed to load image: {}", url);
                let showing = matches!(
                    self.slideshow.deck().current(),
                    Some(Slide::Ppv(slide)) if slide.image_url.as_deref() == Some(url.as_str())
                );
                if showing {
                    self.surfaces.image.show_placeholder();
                }
            }
            SurfaceEvent::StylesheetLoaded { href } => info!("CSS override loaded successfully: {}", href),
            SurfaceEvent::StylesheetFailed { href } => warn!("Failed to load CSS override: {}", href),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::model::{Direction, NfoData, PpvContent, PresentationState};
    use crate::presentation::{Variation, DEFAULT_MUSIC_MANIFEST};
    use crate::test_support::{
        settle, FakeBackend, RecordingAudio, RecordingImage, RecordingNotice, RecordingStage, RecordingText,
    };

    struct Rig {
        stage: RecordingStage,
        image: RecordingImage,
        title: RecordingText,
        counter: RecordingText,
        notice: RecordingNotice,
        audio: RecordingAudio,
        backend: Arc<FakeBackend>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                stage: RecordingStage::default(),
                image: RecordingImage::default(),
                title: RecordingText::default(),
                counter: RecordingText::default(),
                notice: RecordingNotice::default(),
                audio: RecordingAudio::default(),
                backend: FakeBackend::new(),
            }
        }

        fn with_catalog(count: usize) -> Self {
            let rig = Self::new();
            rig.backend.set(|c| c.ppv = Ok((0..count).map(entry).collect()));
            rig
        }

        async fn spawn(&self, config: PpvConfig) -> PpvHandle {
            let surfaces = PpvSurfaces {
                stage: Box::new(self.stage.clone()),
                image: Box::new(self.image.clone()),
                title: Box::new(self.title.clone()),
                details: Box::new(RecordingText::default()),
                description: Box::new(RecordingText::default()),
                counter: Box::new(self.counter.clone()),
                notice: Box::new(self.notice.clone()),
                audio: Box::new(self.audio.clone()),
            };
            let (handle, _task) = PpvViewer::spawn(config, surfaces, self.backend.shared());
            settle().await;
            handle
        }

        async fn index(&self, handle: &PpvHandle) -> usize {
            handle.snapshot().await.unwrap().slideshow.index
        }
    }

    fn entry(i: usize) -> PpvContent {
        PpvContent {
            filename: format!("movie{}.mp4", i),
            video_path: format!("/media/movie{}.mp4", i),
            nfo: Some(NfoData { title: Some(format!("Movie {}", i)), info: None, description: None }),
            has_image: true,
            image_url: Some(format!("/img/movie{}.jpg", i)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shows_the_first_title_once_content_arrives() {
        let rig = Rig::with_catalog(3);
        let mut config = PpvConfig::new(7);
        config.variation = Variation::Retro;
        let handle = rig.spawn(config).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slideshow.state, PresentationState::Presenting);
        assert_eq!(snapshot.slideshow.slide_count, 3);
        assert_eq!(rig.counter.text(), "1/3");
        assert_eq!(rig.title.text(), "Movie 0");
        assert_eq!(rig.stage.state().overlay, None);
        assert_eq!(rig.stage.state().variation, Some(Variation::Retro));
        assert_eq!(rig.backend.calls().ppv, vec![(7, Variation::Retro)]);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_navigation_restarts_the_slide_timer() {
        let rig = Rig::with_catalog(3);
        let handle = rig.spawn(PpvConfig::new(7)).await;

        tokio::time::sleep(Duration::from_secs(8)).await;
        handle.key(Key::PageUp);
        assert_eq!(rig.index(&handle).await, 1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(rig.index(&handle).await, 1);
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(rig.index(&handle).await, 2);
        assert_eq!(rig.counter.text(), "3/3");
    }

    #[tokio::test(start_paused = true)]
    async fn previous_wraps_and_slides_in_backwards() {
        let rig = Rig::with_catalog(3);
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.key(Key::PageDown);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slideshow.index, 2);
        assert_eq!(snapshot.slideshow.direction, Direction::Backward);
        let image = rig.image.state();
        assert_eq!(image.shown.last(), Some(&("/img/movie2.jpg".to_string(), Direction::Backward)));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_key_stops_and_resumes_cycling() {
        let rig = Rig::with_catalog(3);
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.key(Key::Char('p'));
        tokio::time::sleep(Duration::from_secs(25)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.slideshow.state, PresentationState::Paused);
        assert_eq!(snapshot.slideshow.index, 0);

        handle.key(Key::Char('P'));
        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(rig.index(&handle).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_hand_off_keeps_the_slideshow_stopped() {
        let rig = Rig::with_catalog(3);
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.next();
        handle.confirm();
        settle().await;

        assert_eq!(rig.backend.calls().play, vec![(7, "/media/movie1.mp4".to_string())]);
        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.handoff, HandoffState::HandedOff { media_path: "/media/movie1.mp4".into() });
        assert_eq!(snapshot.slideshow.index, 1);
        assert!(rig.notice.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_key_cannot_restart_cycling_during_a_hand_off() {
        let rig = Rig::with_catalog(3);
        rig.backend.set(|c| c.play_delay = Duration::from_secs(5));
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.confirm();
        settle().await;
        handle.key(Key::Char('p'));
        let pending = handle.snapshot().await.unwrap();
        assert!(matches!(pending.handoff, HandoffState::Pending { .. }));
        assert_eq!(pending.slideshow.state, PresentationState::Paused);

        tokio::time::sleep(Duration::from_secs(6)).await;
        handle.toggle_pause();
        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(matches!(snapshot.handoff, HandoffState::HandedOff { .. }));
        assert_eq!(snapshot.slideshow.state, PresentationState::Paused);
        assert_eq!(snapshot.slideshow.index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_hand_off_alerts_and_resumes() {
        let rig = Rig::with_catalog(3);
        rig.backend.set(|c| c.play = Err("File not found".into()));
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.confirm();
        settle().await;

        assert_eq!(rig.notice.alerts(), vec!["Failed to play: File not found\n\nPress OK to resume slideshow."]);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.handoff, HandoffState::Idle);
        assert_eq!(snapshot.slideshow.state, PresentationState::Presenting);
        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(rig.index(&handle).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_confirm_while_pending_is_ignored() {
        let rig = Rig::with_catalog(2);
        rig.backend.set(|c| c.play_delay = Duration::from_secs(5));
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.confirm();
        handle.key(Key::Enter);
        settle().await;

        assert_eq!(rig.backend.calls().play.len(), 1);
        assert!(matches!(handle.snapshot().await.unwrap().handoff, HandoffState::Pending { .. }));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(matches!(handle.snapshot().await.unwrap().handoff, HandoffState::HandedOff { .. }));
        assert_eq!(rig.backend.calls().play.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_or_failed_catalog_shows_an_overlay_message() {
        let rig = Rig::new();
        let handle = rig.spawn(PpvConfig::new(7)).await;
        assert_eq!(rig.stage.state().overlay.as_deref(), Some(NO_CONTENT_MESSAGE));
        handle.confirm();
        settle().await;
        assert!(rig.backend.calls().play.is_empty());

        let rig = Rig::new();
        rig.backend.set(|c| c.ppv = Err("Channel 7 is not a PPV channel".into()));
        let handle = rig.spawn(PpvConfig::new(7)).await;
        assert_eq!(
            rig.stage.state().overlay.as_deref(),
            Some("Failed to load content: Channel 7 is not a PPV channel")
        );
        assert_eq!(handle.snapshot().await.unwrap().slideshow.slide_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_image_falls_back_to_the_placeholder() {
        let rig = Rig::with_catalog(2);
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.notify(SurfaceEvent::ImageFailed { url: "/img/movie1.jpg".into() });
        handle.snapshot().await.unwrap();
        assert_eq!(rig.image.state().placeholders, 0);

        handle.notify(SurfaceEvent::ImageFailed { url: "/img/movie0.jpg".into() });
        handle.snapshot().await.unwrap();
        assert_eq!(rig.image.state().placeholders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn background_music_comes_from_the_manifest() {
        let rig = Rig::with_catalog(1);
        rig.backend.set(|c| c.playlist = Ok(vec!["music/a.mp3".into(), "music/b.mp3".into()]));
        let handle = rig.spawn(PpvConfig::new(7)).await;
        handle.notify_audio(AudioEvent::Ended);
        handle.snapshot().await.unwrap();
        settle().await;

        assert_eq!(rig.backend.calls().playlists, vec![DEFAULT_MUSIC_MANIFEST.to_string()]);
        assert_eq!(rig.audio.loads(), vec!["music/a.mp3", "music/b.mp3"]);
    }
}
