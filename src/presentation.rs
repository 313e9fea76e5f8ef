//! Resolves the presentation configuration of each display.
//!
//! A display is configured either from an override object (JSON, merged shallowly
//! over built-in defaults) or, when no override object exists, from page query
//! parameters. The two paths carry different defaults for the bump.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::errors::ConfigError;

/// Named visual theme of an interstitial display. Exactly one is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Variation {
    #[default]
    Modern,
    Retro,
    Corporate,
    Terminal,
}

impl Variation {
    /// Parses a variation name. Unknown names fall back to `Modern`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "modern" | "" => Variation::Modern,
            "retro" => Variation::Retro,
            "corporate" => Variation::Corporate,
            "terminal" => Variation::Terminal,
            other => {
                warn!("Unknown variation '{}', falling back to 'modern'", other);
                Variation::Modern
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variation::Modern => "modern",
            Variation::Retro => "retro",
            Variation::Corporate => "corporate",
            Variation::Terminal => "terminal",
        }
    }

    /// Style class applied to the display container.
    pub fn class_name(&self) -> String {
        format!("variation-{}", self.as_str())
    }

    /// Background used by the bump when neither an image nor a colour override is set.
    pub fn default_background(&self) -> &'static str {
        match self {
            Variation::Modern => "linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f3460 100%)",
            Variation::Retro => "linear-gradient(45deg, #2d1b69 0%, #11052c 50%, #0a0a0a 100%)",
            Variation::Corporate => "linear-gradient(180deg, #f8f9fa 0%, #e9ecef 50%, #dee2e6 100%)",
            Variation::Terminal => "#000000",
        }
    }
}

impl<'de> Deserialize<'de> for Variation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Variation::parse(&name))
    }
}

/// Resolved background of a display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Background {
    /// Image URL drawn on the background layer.
    Image(String),
    /// Any CSS background value (plain colour or gradient).
    Color(String),
}

/// Background explicitly requested by configuration: an image wins over a colour.
pub fn explicit_background(image: Option<&str>, color: Option<&str>) -> Option<Background> {
    if let Some(image) = image.filter(|s| !s.is_empty()) {
        return Some(Background::Image(image.to_string()));
    }
    color.filter(|s| !s.is_empty()).map(|c| Background::Color(c.to_string()))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn param_or(params: &HashMap<String, String>, key: &str, default: &str) -> String {
    non_empty(params.get(key)).unwrap_or_else(|| default.to_string())
}

fn param_millis(params: &HashMap<String, String>, key: &str) -> Option<u64> {
    let raw = params.get(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(ms),
        _ => {
            debug!("Ignoring non-positive or unparsable '{}' value: '{}'", key, raw);
            None
        }
    }
}

/// Splits a page query string (with or without the leading `?`) into key/value pairs.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

// --- Bump ---

/// Immutable configuration of a station bump.
#[derive(Clone, Debug, PartialEq)]
pub struct BumpConfig {
    pub title: String,
    pub subtitle: String,
    /// Static detail lines; only the first three are displayed.
    pub details: Vec<String>,
    pub background_image: Option<String>,
    /// Explicit background colour override.
    pub bg_color: Option<String>,
    /// Explicit text colour override for every text element.
    pub fg_color: Option<String>,
    pub variation: Variation,
    pub css_override: Option<String>,
    pub bg_music: Option<String>,
    /// Total on-screen time; 0 keeps the bump up indefinitely.
    pub duration_ms: u64,
    /// Schedule source whose upcoming shows replace the static details.
    pub next_up: Option<String>,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            title: "FieldStation42".to_string(),
            subtitle: "Big Time Watching Is Here!".to_string(),
            details: vec![
                "Transmitting 24/7".to_string(),
                "On FieldStation42".to_string(),
                "It's up to you!".to_string(),
            ],
            background_image: None,
            bg_color: None,
            fg_color: None,
            variation: Variation::Modern,
            css_override: None,
            bg_music: None,
            duration_ms: 0,
            next_up: None,
        }
    }
}

/// Partial bump configuration supplied by an external caller.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct BumpOverrides {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub details: Option<Vec<String>>,
    #[serde(alias = "backgroundImage")]
    pub background_image: Option<String>,
    #[serde(alias = "bgColor")]
    pub bg_color: Option<String>,
    #[serde(alias = "fgColor")]
    pub fg_color: Option<String>,
    pub variation: Option<Variation>,
    #[serde(alias = "cssOverride")]
    pub css_override: Option<String>,
    #[serde(alias = "bgMusic")]
    pub bg_music: Option<String>,
    #[serde(alias = "duration")]
    pub duration_ms: Option<u64>,
    #[serde(alias = "nextUp")]
    pub next_up: Option<String>,
}

impl BumpConfig {
    /// Built-in defaults overwritten field by field by `overrides`.
    pub fn resolve(overrides: Option<BumpOverrides>) -> Self {
        let mut config = Self::default();
        if let Some(overrides) = overrides {
            config.merge(overrides);
        }
        config
    }

    /// Shallow merge: every field present in `overrides` replaces ours.
    pub fn merge(&mut self, overrides: BumpOverrides) {
        let BumpOverrides {
            title,
            subtitle,
            details,
            background_image,
            bg_color,
            fg_color,
            variation,
            css_override,
            bg_music,
            duration_ms,
            next_up,
        } = overrides;
        if let Some(v) = title {
            self.title = v;
        }
        if let Some(v) = subtitle {
            self.subtitle = v;
        }
        if let Some(v) = details {
            self.details = v;
        }
        if let Some(v) = background_image {
            self.background_image = Some(v);
        }
        if let Some(v) = bg_color {
            self.bg_color = Some(v);
        }
        if let Some(v) = fg_color {
            self.fg_color = Some(v);
        }
        if let Some(v) = variation {
            self.variation = v;
        }
        if let Some(v) = css_override {
            self.css_override = Some(v);
        }
        if let Some(v) = bg_music {
            self.bg_music = Some(v);
        }
        if let Some(v) = duration_ms {
            self.duration_ms = v;
        }
        if let Some(v) = next_up {
            self.next_up = Some(v);
        }
    }

    /// Query-parameter resolution path, with its own defaults.
    pub fn from_query(query: &str) -> Self {
        Self::from_params(&parse_query(query))
    }

    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let details = vec![
            param_or(params, "detail1", "Big time watching is here!"),
            param_or(params, "detail2", "Broadcasting 24/7"),
            param_or(params, "detail3", "Sweet."),
        ];
        let config = Self {
            title: param_or(params, "title", "FieldStation42"),
            subtitle: param_or(params, "subtitle", "Its Up to you!"),
            details,
            background_image: non_empty(params.get("bg")),
            bg_color: non_empty(params.get("bg_color")),
            fg_color: non_empty(params.get("fg_color")),
            variation: params.get("variation").map(|v| Variation::parse(v)).unwrap_or_default(),
            css_override: non_empty(params.get("css")),
            bg_music: non_empty(params.get("bg_music")),
            duration_ms: param_millis(params, "duration").unwrap_or(0),
            next_up: non_empty(params.get("next_network")),
        };
        debug!("Resolved bump configuration from parameters: {:?}", config);
        config
    }

    /// Image, then colour override, then the variation's default.
    pub fn background(&self) -> Background {
        explicit_background(self.background_image.as_deref(), self.bg_color.as_deref())
            .unwrap_or_else(|| Background::Color(self.variation.default_background().to_string()))
    }
}

// --- Pay-per-view ---

/// Configuration of the pay-per-view viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct PpvConfig {
    pub channel: u32,
    pub variation: Variation,
    pub css_override: Option<String>,
    pub background_image: Option<String>,
    pub bg_color: Option<String>,
    pub slide_duration: Duration,
    /// Sibling resource listing background-music tracks.
    pub music_manifest: String,
}

pub const DEFAULT_MUSIC_MANIFEST: &str = "static/ppv/music_playlist.json";

impl PpvConfig {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            variation: Variation::Modern,
            css_override: None,
            background_image: None,
            bg_color: None,
            slide_duration: Duration::from_millis(10_000),
            music_manifest: DEFAULT_MUSIC_MANIFEST.to_string(),
        }
    }

    #[must_use = "resolving the viewer configuration can fail, the Result must be handled"]
    pub fn from_query(query: &str) -> Result<Self, ConfigError> {
        Self::from_params(&parse_query(query))
    }

    #[must_use = "resolving the viewer configuration can fail, the Result must be handled"]
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw = non_empty(params.get("channel")).ok_or_else(|| ConfigError::MissingKey("channel".to_string()))?;
        let channel = raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
            key: "channel".to_string(),
            value: raw.clone(),
        })?;
        let mut config = Self::new(channel);
        config.variation = params.get("variation").map(|v| Variation::parse(v)).unwrap_or_default();
        config.css_override = non_empty(params.get("css"));
        config.background_image = non_empty(params.get("bg"));
        config.bg_color = non_empty(params.get("bg_color"));
        if let Some(ms) = param_millis(params, "duration") {
            config.slide_duration = Duration::from_millis(ms);
        }
        if let Some(manifest) = non_empty(params.get("music_manifest")) {
            config.music_manifest = manifest;
        }
        debug!("Resolved PPV configuration from parameters: {:?}", config);
        Ok(config)
    }

    pub fn background(&self) -> Option<Background> {
        explicit_background(self.background_image.as_deref(), self.bg_color.as_deref())
    }
}

// --- Diagnostics ---

/// Timing of the diagnostics slideshow.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticsConfig {
    pub slide_duration: Duration,
    pub clock_interval: Duration,
    pub refresh_interval: Duration,
    pub rows_per_slide: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            slide_duration: Duration::from_millis(7_000),
            clock_interval: Duration::from_millis(1_000),
            refresh_interval: Duration::from_millis(30_000),
            rows_per_slide: 4,
        }
    }
}

impl DiagnosticsConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = param_millis(params, "duration") {
            config.slide_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = param_millis(params, "refresh") {
            config.refresh_interval = Duration::from_millis(ms);
        }
        config
    }
}

// --- Remote ---

/// Timing of the remote-control surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteConfig {
    /// Inactivity before a typed channel number is committed.
    pub commit_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            commit_delay: Duration::from_millis(1_500),
            poll_interval: Duration::from_millis(2_000),
        }
    }
}
