//! Rendering seams for the interstitial displays.
//!
//! Controllers never touch a rendering toolkit directly. Every visual element they
//! drive is a named surface trait object injected at construction, which keeps the
//! controller logic testable without a screen. `LogSurface` implements all of them
//! by logging, which is what the binary uses when running headless.

use std::time::Duration;

use log::{debug, info};

use crate::errors::ResourceError;
use crate::model::{Direction, Slide};
use crate::presentation::{Background, Variation};

/// A single line or block of text.
pub trait TextSurface: Send {
    fn set_text(&mut self, text: &str);
    fn set_visible(&mut self, visible: bool);
    /// `None` restores the colour given by the active variation.
    fn set_color(&mut self, color: Option<&str>);
}

/// The main image slot of the pay-per-view viewer.
pub trait ImageSurface: Send {
    /// Slides `url` in from the side matching `direction`.
    fn show(&mut self, url: &str, direction: Direction);
    /// Shows the "no image" placeholder.
    fn show_placeholder(&mut self);
}

/// The full-screen container of a display.
pub trait StageSurface: Send {
    fn set_background(&mut self, background: &Background);
    /// Activates `variation`, deactivating any other.
    fn set_variation(&mut self, variation: Variation);
    /// Loads `href` after the base styling, replacing any earlier override.
    /// Completion is reported back as a [`SurfaceEvent`].
    fn replace_stylesheet(&mut self, href: &str);
    /// Starts a fade to transparent lasting `duration`.
    fn begin_fade(&mut self, duration: Duration);
    fn hide(&mut self);
    /// Loading / error overlay covering the display.
    fn show_overlay(&mut self, message: &str);
    fn hide_overlay(&mut self);
}

/// A background-music player.
pub trait AudioSurface: Send {
    fn load(&mut self, path: &str);
    /// Starts playback of the loaded track. Fails when the platform refuses it.
    fn play(&mut self) -> Result<(), ResourceError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
}

/// Blocking-style user notifications.
pub trait NoticeSurface: Send {
    fn alert(&mut self, message: &str);
}

/// A container rendering whole slides (diagnostics pages).
pub trait SlideSurface: Send {
    fn show_loading(&mut self);
    fn show_error(&mut self, message: &str);
    /// Renders `slide` as number `index` of `total`.
    fn show_slide(&mut self, slide: &Slide, index: usize, total: usize);
    fn clear(&mut self);
    /// Updates the footer clock of the visible slide.
    fn set_timestamp(&mut self, text: &str);
}

/// Load results reported back by surfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    StylesheetLoaded { href: String },
    StylesheetFailed { href: String },
    ImageFailed { url: String },
}

/// Logs every visual change, prefixed with the surface name.
#[derive(Debug, Clone)]
pub struct LogSurface {
    name: String,
    paused: bool,
    volume: f32,
}

impl LogSurface {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), paused: true, volume: 1.0 }
    }

    pub fn boxed(name: &str) -> Box<Self> {
        Box::new(Self::new(name))
    }
}

impl TextSurface for LogSurface {
    fn set_text(&mut self, text: &str) {
        info!("[{}] text: {}", self.name, text);
    }

    fn set_visible(&mut self, visible: bool) {
        info!("[{}] visible: {}", self.name, visible);
    }

    fn set_color(&mut self, color: Option<&str>) {
        info!("[{}] color: {}", self.name, color.unwrap_or("<variation>"));
    }
}

impl ImageSurface for LogSurface {
    fn show(&mut self, url: &str, direction: Direction) {
        info!("[{}] image {} (slide {:?})", self.name, url, direction);
    }

    fn show_placeholder(&mut self) {
        info!("[{}] no image", self.name);
    }
}

impl StageSurface for LogSurface {
    fn set_background(&mut self, background: &Background) {
        info!("[{}] background: {:?}", self.name, background);
    }

    fn set_variation(&mut self, variation: Variation) {
        info!("[{}] variation: {}", self.name, variation.class_name());
    }

    fn replace_stylesheet(&mut self, href: &str) {
        info!("[{}] stylesheet override: {}", self.name, href);
    }

    fn begin_fade(&mut self, duration: Duration) {
        info!("[{}] fading out over {:?}", self.name, duration);
    }

    fn hide(&mut self) {
        info!("[{}] hidden", self.name);
    }

    fn show_overlay(&mut self, message: &str) {
        info!("[{}] overlay: {}", self.name, message);
    }

    fn hide_overlay(&mut self) {
        info!("[{}] overlay hidden", self.name);
    }
}

impl AudioSurface for LogSurface {
    fn load(&mut self, path: &str) {
        info!("[{}] loading track {}", self.name, path);
        self.paused = true;
    }

    fn play(&mut self) -> Result<(), ResourceError> {
        info!("[{}] play (volume {:.2})", self.name, self.volume);
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        info!("[{}] pause", self.name);
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

impl NoticeSurface for LogSurface {
    fn alert(&mut self, message: &str) {
        info!("[{}] ALERT: {}", self.name, message);
    }
}

impl SlideSurface for LogSurface {
    fn show_loading(&mut self) {
        info!("[{}] LOADING DIAGNOSTICS", self.name);
    }

    fn show_error(&mut self, message: &str) {
        info!("[{}] SYSTEM ERROR: {}", self.name, message);
    }

    fn show_slide(&mut self, slide: &Slide, index: usize, total: usize) {
        info!("[{}] slide {}/{}: {}", self.name, index + 1, total, slide.title());
        if let Slide::Diagnostics { rows, .. } = slide {
            for row in rows {
                info!("[{}]   {:<16} {}", self.name, row.label, row.value);
            }
        }
    }

    fn clear(&mut self) {
        info!("[{}] cleared", self.name);
    }

    fn set_timestamp(&mut self, text: &str) {
        debug!("[{}] clock {}", self.name, text);
    }
}
