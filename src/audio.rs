//! Background music for the interstitial displays.
//!
//! The `AudioTrackController` runs as its own task and knows nothing about slide
//! timing. It cycles a playlist forever, skipping to the next track when one ends
//! or fails to load, and can fade the music out in fixed volume steps when the
//! bump fades away.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api_client::Backend;
use crate::surface::AudioSurface;
use crate::timer::CycleTimer;

pub const DEFAULT_VOLUME: f32 = 0.3;
pub const FADE_STEP: f32 = 0.05;
pub const FADE_INTERVAL: Duration = Duration::from_millis(50);

/// Ordered track list with a wrapping cursor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Playlist {
    tracks: Vec<String>,
    index: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<String>) -> Self {
        Self { tracks, index: 0 }
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.tracks.get(self.index).map(String::as_str)
    }

    /// Moves to the next track, wrapping to the first after the last.
    pub fn advance(&mut self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.tracks.len();
        self.current()
    }
}

/// Signals raised by the audio element itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEvent {
    /// The current track played to its end.
    Ended,
    /// The current track could not be loaded.
    LoadError,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioSnapshot {
    pub track_index: Option<usize>,
    pub track: Option<String>,
    pub playing: bool,
    pub fading: bool,
    pub volume: f32,
}

enum AudioCommand {
    Play(Vec<String>),
    Event(AudioEvent),
    FadeOut,
    Snapshot(oneshot::Sender<AudioSnapshot>),
    Shutdown,
}

/// Handle to a running [`AudioTrackController`].
#[derive(Clone, Debug)]
pub struct AudioHandle {
    commands: mpsc::UnboundedSender<AudioCommand>,
}

impl AudioHandle {
    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            debug!("Audio controller already stopped; command dropped");
        }
    }

    /// Replaces the playlist and starts at its first track. Re-sending the
    /// playlist that is already playing changes nothing.
    pub fn play(&self, tracks: Vec<String>) {
        self.send(AudioCommand::Play(tracks));
    }

    /// Forwards an event raised by the audio surface.
    pub fn notify(&self, event: AudioEvent) {
        self.send(AudioCommand::Event(event));
    }

    pub fn fade_out(&self) {
        self.send(AudioCommand::FadeOut);
    }

    pub async fn snapshot(&self) -> Option<AudioSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(AudioCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(AudioCommand::Shutdown);
    }
}

/// Fetches the manifest at `path`. Any failure disables music instead of erroring.
pub async fn load_manifest(backend: Arc<dyn Backend>, path: &str) -> Vec<String> {
    match backend.music_playlist(path).await {
        Ok(tracks) => {
            info!("Loaded music playlist '{}' with {} track(s)", path, tracks.len());
            tracks
        }
        Err(e) => {
            warn!("Failed to load music playlist '{}': {}", path, e);
            Vec::new()
        }
    }
}

pub struct AudioTrackController {
    surface: Box<dyn AudioSurface>,
    playlist: Playlist,
    playing: bool,
    fade: CycleTimer,
    commands: mpsc::UnboundedReceiver<AudioCommand>,
}

impl AudioTrackController {
    /// Spawns the controller on the current runtime.
    pub fn spawn(surface: Box<dyn AudioSurface>) -> (AudioHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            surface,
            playlist: Playlist::default(),
            playing: false,
            fade: CycleTimer::repeating("music-fade", FADE_INTERVAL),
            commands: rx,
        };
        let task = tokio::spawn(controller.run());
        (AudioHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        debug!("Audio controller started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(AudioCommand::Play(tracks)) => self.start(tracks),
                    Some(AudioCommand::Event(event)) => self.on_event(event),
                    Some(AudioCommand::FadeOut) => self.begin_fade(),
                    Some(AudioCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(AudioCommand::Shutdown) | None => break,
                },
                _ = self.fade.fired() => self.fade_step(),
            }
        }
        self.stop();
        debug!("Audio controller stopped");
    }

    fn snapshot(&self) -> AudioSnapshot {
        AudioSnapshot {
            track_index: (!self.playlist.is_empty()).then(|| self.playlist.index()),
            track: self.playlist.current().map(str::to_string),
            playing: self.playing,
            fading: self.fade.is_running(),
            volume: self.surface.volume(),
        }
    }

    fn start(&mut self, tracks: Vec<String>) {
        if self.playing && self.playlist.tracks() == tracks.as_slice() {
            trace!("Playlist unchanged and playing; nothing to do");
            return;
        }
        self.fade.stop();
        self.playlist = Playlist::new(tracks);
        if self.playlist.is_empty() {
            info!("No background music available");
            self.surface.pause();
            self.playing = false;
            return;
        }
        self.surface.set_volume(DEFAULT_VOLUME);
        self.play_current();
    }

    fn play_current(&mut self) {
        let Some(track) = self.playlist.current().map(str::to_string) else {
            return;
        };
        self.surface.load(&track);
        match self.surface.play() {
            Ok(()) => {
                info!("Playing background music: {}", track);
                self.playing = true;
            }
            Err(e) => {
                // Typically blocked autoplay; wait for the next natural trigger.
                warn!("Background music playback failed for '{}': {}", track, e);
                self.playing = false;
            }
        }
    }

    fn on_event(&mut self, event: AudioEvent) {
        if self.playlist.is_empty() {
            trace!("Ignoring {:?} with an empty playlist", event);
            return;
        }
        match event {
            AudioEvent::Ended => debug!("Track '{}' ended", self.playlist.current().unwrap_or_default()),
            AudioEvent::LoadError => {
                warn!("Error loading music track: {}", self.playlist.current().unwrap_or_default())
            }
        }
        self.playlist.advance();
        self.play_current();
    }

    fn begin_fade(&mut self) {
        if self.surface.is_paused() {
            trace!("Music not playing; no fade needed");
            return;
        }
        debug!("Fading out background music");
        self.fade.start();
    }

    fn fade_step(&mut self) {
        let volume = self.surface.volume();
        if volume > FADE_STEP {
            self.surface.set_volume((volume - FADE_STEP).max(0.0));
        } else {
            self.surface.pause();
            self.surface.set_volume(DEFAULT_VOLUME);
            self.playing = false;
            self.fade.stop();
            debug!("Background music faded out");
        }
    }

    fn stop(&mut self) {
        self.fade.stop();
        if self.playing {
            self.surface.pause();
            self.playing = false;
        }
    }
}
