//! Recording surfaces and an in-memory backend for controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::time::Instant;

use crate::api_client::Backend;
use crate::errors::{ApiError, ResourceError};
use crate::model::{
    CommandResponse, Direction, PlayFileResponse, PlayerInfo, PpvContent, RemoteCommand, RemoteStatus,
    ScheduleBlock, Slide,
};
use crate::presentation::{Background, Variation};
use crate::surface::{AudioSurface, ImageSurface, NoticeSurface, SlideSurface, StageSurface, TextSurface};

fn lock<T>(shared: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    shared.lock().unwrap()
}

/// Lets spawned tasks and controller loops catch up without moving the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug)]
pub struct TextState {
    pub text: String,
    pub visible: bool,
    pub color: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RecordingText(Arc<Mutex<TextState>>);

impl Default for RecordingText {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(TextState { text: String::new(), visible: true, color: None })))
    }
}

impl RecordingText {
    pub fn text(&self) -> String {
        lock(&self.0).text.clone()
    }

    pub fn visible(&self) -> bool {
        lock(&self.0).visible
    }

    pub fn color(&self) -> Option<String> {
        lock(&self.0).color.clone()
    }
}

impl TextSurface for RecordingText {
    fn set_text(&mut self, text: &str) {
        lock(&self.0).text = text.to_string();
    }

    fn set_visible(&mut self, visible: bool) {
        lock(&self.0).visible = visible;
    }

    fn set_color(&mut self, color: Option<&str>) {
        lock(&self.0).color = color.map(str::to_string);
    }
}

#[derive(Debug, Default)]
pub struct StageState {
    pub background: Option<Background>,
    pub variation: Option<Variation>,
    pub stylesheet: Option<String>,
    pub stylesheet_loads: Vec<String>,
    pub fade_started: Option<(Instant, Duration)>,
    pub hidden_at: Option<Instant>,
    pub overlay: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingStage(Arc<Mutex<StageState>>);

impl RecordingStage {
    pub fn state(&self) -> MutexGuard<'_, StageState> {
        lock(&self.0)
    }
}

impl StageSurface for RecordingStage {
    fn set_background(&mut self, background: &Background) {
        lock(&self.0).background = Some(background.clone());
    }

    fn set_variation(&mut self, variation: Variation) {
        lock(&self.0).variation = Some(variation);
    }

    fn replace_stylesheet(&mut self, href: &str) {
        let mut state = lock(&self.0);
        state.stylesheet = Some(href.to_string());
        state.stylesheet_loads.push(href.to_string());
    }

    fn begin_fade(&mut self, duration: Duration) {
        lock(&self.0).fade_started = Some((Instant::now(), duration));
    }

    fn hide(&mut self) {
        lock(&self.0).hidden_at = Some(Instant::now());
    }

    fn show_overlay(&mut self, message: &str) {
        lock(&self.0).overlay = Some(message.to_string());
    }

    fn hide_overlay(&mut self) {
        lock(&self.0).overlay = None;
    }
}

#[derive(Debug)]
pub struct AudioState {
    pub loads: Vec<String>,
    pub paused: bool,
    pub volume: f32,
    pub block_autoplay: bool,
}

#[derive(Clone, Debug)]
pub struct RecordingAudio(Arc<Mutex<AudioState>>);

impl Default for RecordingAudio {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(AudioState { loads: Vec::new(), paused: true, volume: 1.0, block_autoplay: false })))
    }
}

impl RecordingAudio {
    pub fn loads(&self) -> Vec<String> {
        lock(&self.0).loads.clone()
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.0).paused
    }

    pub fn block_autoplay(&self, blocked: bool) {
        lock(&self.0).block_autoplay = blocked;
    }
}

impl AudioSurface for RecordingAudio {
    fn load(&mut self, path: &str) {
        let mut state = lock(&self.0);
        state.loads.push(path.to_string());
        state.paused = true;
    }

    fn play(&mut self) -> Result<(), ResourceError> {
        let mut state = lock(&self.0);
        if state.block_autoplay {
            return Err(ResourceError::Autoplay("play() request was interrupted".into()));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        lock(&self.0).paused = true;
    }

    fn is_paused(&self) -> bool {
        lock(&self.0).paused
    }

    fn volume(&self) -> f32 {
        lock(&self.0).volume
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.0).volume = volume;
    }
}

#[derive(Debug, Default)]
pub struct ImageState {
    pub shown: Vec<(String, Direction)>,
    pub placeholders: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingImage(Arc<Mutex<ImageState>>);

impl RecordingImage {
    pub fn state(&self) -> MutexGuard<'_, ImageState> {
        lock(&self.0)
    }
}

impl ImageSurface for RecordingImage {
    fn show(&mut self, url: &str, direction: Direction) {
        lock(&self.0).shown.push((url.to_string(), direction));
    }

    fn show_placeholder(&mut self) {
        lock(&self.0).placeholders += 1;
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingNotice(Arc<Mutex<Vec<String>>>);

impl RecordingNotice {
    pub fn alerts(&self) -> Vec<String> {
        lock(&self.0).clone()
    }
}

impl NoticeSurface for RecordingNotice {
    fn alert(&mut self, message: &str) {
        lock(&self.0).push(message.to_string());
    }
}

#[derive(Debug, Default)]
pub struct SlidesState {
    pub loading_screens: usize,
    pub error: Option<String>,
    /// `(title, index, total)` of every rendered slide.
    pub shown: Vec<(String, usize, usize)>,
    pub timestamps: Vec<String>,
    pub cleared: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingSlides(Arc<Mutex<SlidesState>>);

impl RecordingSlides {
    pub fn state(&self) -> MutexGuard<'_, SlidesState> {
        lock(&self.0)
    }
}

impl SlideSurface for RecordingSlides {
    fn show_loading(&mut self) {
        let mut state = lock(&self.0);
        state.loading_screens += 1;
        state.error = None;
    }

    fn show_error(&mut self, message: &str) {
        lock(&self.0).error = Some(message.to_string());
    }

    fn show_slide(&mut self, slide: &Slide, index: usize, total: usize) {
        let mut state = lock(&self.0);
        state.error = None;
        state.shown.push((slide.title().to_string(), index, total));
    }

    fn clear(&mut self) {
        lock(&self.0).cleared += 1;
    }

    fn set_timestamp(&mut self, text: &str) {
        lock(&self.0).timestamps.push(text.to_string());
    }
}

/// Canned backend answers. `Err` strings become HTTP 500 errors carrying the text.
#[derive(Debug)]
pub struct Canned {
    pub schedule: Result<Vec<ScheduleBlock>, String>,
    pub ppv: Result<Vec<PpvContent>, String>,
    pub play: Result<PlayFileResponse, String>,
    pub play_delay: Duration,
    pub player_info: Result<PlayerInfo, String>,
    pub status: Result<RemoteStatus, String>,
    /// Answers consumed by successive status polls before falling back to `status`.
    pub status_script: VecDeque<(Duration, Result<RemoteStatus, String>)>,
    pub command: Result<CommandResponse, String>,
    pub playlist: Result<Vec<String>, String>,
}

impl Default for Canned {
    fn default() -> Self {
        Self {
            schedule: Ok(Vec::new()),
            ppv: Ok(Vec::new()),
            play: Ok(PlayFileResponse { success: true, message: "Playing".into() }),
            play_delay: Duration::ZERO,
            player_info: Ok(PlayerInfo::default()),
            status: Ok(RemoteStatus { channel: 3, name: "NBC".into() }),
            status_script: VecDeque::new(),
            command: Ok(CommandResponse { current: None }),
            playlist: Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Calls {
    pub schedule: Vec<(String, NaiveDateTime, NaiveDateTime)>,
    pub ppv: Vec<(u32, Variation)>,
    pub play: Vec<(u32, String)>,
    pub player_info: usize,
    pub status: usize,
    pub commands: Vec<RemoteCommand>,
    pub playlists: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    canned: Mutex<Canned>,
    calls: Mutex<Calls>,
}

fn server_error(message: &str) -> ApiError {
    ApiError::Http { status: reqwest::StatusCode::INTERNAL_SERVER_ERROR, message: message.to_string() }
}

fn answer<T: Clone>(canned: &Result<T, String>) -> Result<T, ApiError> {
    canned.clone().map_err(|e| server_error(&e))
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shared(self: &Arc<Self>) -> Arc<dyn Backend> {
        self.clone()
    }

    pub fn set(&self, configure: impl FnOnce(&mut Canned)) {
        configure(&mut self.canned.lock().unwrap());
    }

    pub fn calls(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn schedule(
        &self,
        source_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ScheduleBlock>, ApiError> {
        self.calls().schedule.push((source_id.to_string(), start, end));
        answer(&self.canned.lock().unwrap().schedule)
    }

    async fn ppv_contents(&self, channel: u32, variation: Variation) -> Result<Vec<PpvContent>, ApiError> {
        self.calls().ppv.push((channel, variation));
        answer(&self.canned.lock().unwrap().ppv)
    }

    async fn play_file(&self, channel: u32, file_path: &str) -> Result<PlayFileResponse, ApiError> {
        self.calls().play.push((channel, file_path.to_string()));
        let (delay, result) = {
            let canned = self.canned.lock().unwrap();
            (canned.play_delay, answer(&canned.play))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn player_info(&self) -> Result<PlayerInfo, ApiError> {
        self.calls().player_info += 1;
        answer(&self.canned.lock().unwrap().player_info)
    }

    async fn queue_connected(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn send_command(&self, command: &RemoteCommand) -> Result<CommandResponse, ApiError> {
        self.calls().commands.push(command.clone());
        answer(&self.canned.lock().unwrap().command)
    }

    async fn status(&self) -> Result<RemoteStatus, ApiError> {
        self.calls().status += 1;
        let (delay, result) = {
            let mut canned = self.canned.lock().unwrap();
            match canned.status_script.pop_front() {
                Some((delay, result)) => (delay, result.map_err(|e| server_error(&e))),
                None => (Duration::ZERO, answer(&canned.status)),
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn music_playlist(&self, manifest_path: &str) -> Result<Vec<String>, ApiError> {
        self.calls().playlists.push(manifest_path.to_string());
        answer(&self.canned.lock().unwrap().playlist)
    }
}
