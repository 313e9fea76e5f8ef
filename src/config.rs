//! Handles process configuration loading.
//!
//! This module defines the `AppConfig` struct which holds the backend URL, the
//! display to run and that display's parameters. It provides the `load_config`
//! function to read these settings from an INI file, and `parse_config` for
//! configuration held in memory.
//!
//! ```ini
//! [settings]
//! api_url = http://localhost:4242
//! display = bump
//!
//! [display]
//! title = Channel 3
//! duration = 8000
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use configparser::ini::Ini;
use log::{debug, error, info};

use super::errors::ConfigError;
use crate::presentation::{BumpConfig, BumpOverrides, DiagnosticsConfig, PpvConfig, RemoteConfig};

/// The interstitial a process runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayKind {
    Bump,
    Ppv,
    Diagnostics,
    Remote,
}

impl DisplayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayKind::Bump => "bump",
            DisplayKind::Ppv => "ppv",
            DisplayKind::Diagnostics => "diagnostics",
            DisplayKind::Remote => "remote",
        }
    }
}

impl fmt::Display for DisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bump" => Ok(DisplayKind::Bump),
            "ppv" => Ok(DisplayKind::Ppv),
            "diagnostics" => Ok(DisplayKind::Diagnostics),
            "remote" => Ok(DisplayKind::Remote),
            _ => Err(ConfigError::InvalidValue { key: "display".to_string(), value: s.to_string() }),
        }
    }
}

/// Holds the process configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub display: DisplayKind,
    /// Replaces the viewer's default music manifest path.
    pub music_manifest: Option<String>,
    /// Keys of the `[display]` section, resolved like URL query parameters.
    pub display_params: HashMap<String, String>,
    /// A JSON override object; when present the bump ignores `display_params`.
    pub overrides: Option<BumpOverrides>,
}

impl AppConfig {
    pub fn bump_config(&self) -> BumpConfig {
        match &self.overrides {
            Some(overrides) => BumpConfig::resolve(Some(overrides.clone())),
            None => BumpConfig::from_params(&self.display_params),
        }
    }

    #[must_use = "resolving the viewer configuration can fail, the Result must be handled"]
    pub fn ppv_config(&self) -> Result<PpvConfig, ConfigError> {
        let mut config = PpvConfig::from_params(&self.display_params)?;
        if let Some(manifest) = &self.music_manifest {
            config.music_manifest = manifest.clone();
        }
        Ok(config)
    }

    pub fn diagnostics_config(&self) -> DiagnosticsConfig {
        DiagnosticsConfig::from_params(&self.display_params)
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::default()
    }
}

/// Loads application configuration from the specified INI file path.
///
/// # Arguments
/// * `path` - The path to the configuration file (e.g., "/etc/interstitial.conf").
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read, is malformed,
/// or if essential keys are missing.
#[must_use = "loading configuration can fail, the Result must be handled"]
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Attempting to load config from: {}", path);
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| {
        error!("Error loading config file '{}': {}", path, e);
        // configparser only reports strings; recognise a missing file by its message.
        let message = e.to_lowercase();
        if message.contains("os error 2") || message.contains("failed to read file") {
            ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, e))
        } else {
            ConfigError::Parse(e)
        }
    })?;
    from_ini(&ini, path)
}

/// Parses configuration from INI text.
#[must_use = "parsing configuration can fail, the Result must be handled"]
pub fn parse_config(text: &str) -> Result<AppConfig, ConfigError> {
    let mut ini = Ini::new();
    ini.read(text.to_string()).map_err(|e| {
        error!("Error parsing configuration: {}", e);
        ConfigError::Parse(e)
    })?;
    from_ini(&ini, "<memory>")
}

fn from_ini(ini: &Ini, origin: &str) -> Result<AppConfig, ConfigError> {
    let get_key = |key_name: &str| {
        ini.get("settings", key_name).filter(|v| !v.is_empty()).ok_or_else(|| {
            error!("Missing configuration key '{}' in section '[settings]' of '{}'", key_name, origin);
            ConfigError::MissingKey(key_name.to_string())
        })
    };

    let api_url = get_key("api_url")?;
    debug!("Loaded config value for key 'api_url': {}", api_url);

    let display = get_key("display")?.parse::<DisplayKind>()?;
    debug!("Loaded config value for key 'display': {}", display);

    let music_manifest = ini.get("settings", "music_manifest").filter(|v| !v.is_empty());

    let mut display_params: HashMap<String, String> = ini
        .get_map_ref()
        .get("display")
        .map(|section| {
            section
                .iter()
                .filter_map(|(key, value)| value.as_ref().map(|v| (key.clone(), v.clone())))
                .collect()
        })
        .unwrap_or_default();

    let overrides = match display_params.remove("overrides") {
        Some(raw) => Some(serde_json::from_str::<BumpOverrides>(&raw).map_err(|e| {
            error!("Invalid bump overrides in '{}': {}", origin, e);
            ConfigError::InvalidValue { key: "overrides".to_string(), value: raw.clone() }
        })?),
        None => None,
    };

    let app_config = AppConfig { api_url, display, music_manifest, display_params, overrides };
    info!("Configuration loaded successfully from {}: {:?}", origin, app_config);
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::Variation;
    use std::time::Duration;

    #[test]
    fn display_section_feeds_the_query_path() {
        let config = parse_config(
            "[settings]\napi_url = http://tv.local:4242\ndisplay = Bump\n\n[display]\ntitle = RETRO FM\ndetail2 = 98.5\nvariation = retro\n",
        )
        .unwrap();
        assert_eq!(config.display, DisplayKind::Bump);
        let bump = config.bump_config();
        assert_eq!(bump.title, "RETRO FM");
        assert_eq!(bump.subtitle, "Its Up to you!");
        assert_eq!(bump.details[1], "98.5");
        assert_eq!(bump.variation, Variation::Retro);
    }

    #[test]
    fn overrides_object_uses_the_object_defaults() {
        let config = parse_config(
            "[settings]\napi_url = http://tv.local:4242\ndisplay = bump\n[display]\noverrides = {\"title\": \"Late Show\", \"duration\": 5000}\n",
        )
        .unwrap();
        let bump = config.bump_config();
        assert_eq!(bump.title, "Late Show");
        assert_eq!(bump.subtitle, "Big Time Watching Is Here!");
        assert_eq!(bump.duration_ms, 5000);
    }

    #[test]
    fn ppv_settings_and_manifest_override() {
        let config = parse_config(
            "[settings]\napi_url = http://tv.local:4242\ndisplay = ppv\nmusic_manifest = static/music.json\n[display]\nchannel = 12\nduration = 4000\n",
        )
        .unwrap();
        let ppv = config.ppv_config().unwrap();
        assert_eq!(ppv.channel, 12);
        assert_eq!(ppv.slide_duration, Duration::from_millis(4000));
        assert_eq!(ppv.music_manifest, "static/music.json");
    }

    #[test]
    fn missing_and_invalid_keys_are_reported() {
        let missing = parse_config("[settings]\ndisplay = ppv\n").unwrap_err();
        assert!(matches!(missing, ConfigError::MissingKey(key) if key == "api_url"));

        let invalid = parse_config("[settings]\napi_url = http://x\ndisplay = teletext\n").unwrap_err();
        assert!(matches!(invalid, ConfigError::InvalidValue { key, .. } if key == "display"));

        let config = parse_config("[settings]\napi_url = http://x\ndisplay = ppv\n").unwrap();
        assert!(matches!(config.ppv_config(), Err(ConfigError::MissingKey(key)) if key == "channel"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_config("/nonexistent/interstitial.conf");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
