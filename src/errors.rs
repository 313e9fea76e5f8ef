//! Defines the custom error types used throughout `interstitial_rs`.
//!
//! This module centralizes error handling, providing specific error enums for
//! different categories of issues (configuration, backend API interactions,
//! display resources), and a top-level `AppError` to wrap them. Controllers never
//! let these escape their task: they are logged and turned into fallback text.

use thiserror::Error;

// --- ConfigError ---
/// Errors related to loading and resolving configuration.
#[must_use = "a configuration error should be handled or propagated"]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred while trying to read the configuration file.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An error occurred while parsing the configuration content.
    #[error("Configuration parse error: {0}")]
    Parse(String),
    /// A required configuration key was missing.
    #[error("Missing configuration key: '{0}'")]
    MissingKey(String),
    /// A key was present but its value could not be used.
    #[error("Invalid value '{value}' for configuration key '{key}'")]
    InvalidValue { key: String, value: String },
}

// --- ApiError ---
/// Errors related to requests against the backend HTTP service.
#[must_use = "an API error should be handled or propagated"]
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or its body could not be read.
    #[error("Backend request error: {0}")]
    Request(#[from] reqwest::Error),
    /// The response body was not the JSON shape we expected.
    #[error("Backend JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// An endpoint URL could not be built.
    #[error("Backend URL error: {0}")]
    Url(#[from] url::ParseError),
    /// The backend answered with a non-success status. `message` carries the
    /// `detail`/`message` field of the error body when the backend sent one.
    #[error("Backend HTTP error {status}: {message}")]
    Http { status: reqwest::StatusCode, message: String },
    /// A generic backend error not covered by other variants.
    #[error("Backend error: {0}")]
    Generic(String),
}

impl ApiError {
    /// The text shown to a user when an action they triggered failed.
    pub fn user_detail(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// --- ResourceError ---
/// Errors reported by display resources (audio elements, images, stylesheets).
#[must_use = "a resource error should be handled or propagated"]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Playback was refused, e.g. autoplay blocked until user interaction.
    #[error("Playback blocked: {0}")]
    Autoplay(String),
}

// --- AppError (Top-level error enum) ---
/// A top-level error type that can encompass any error within the application.
#[must_use = "an application error should be handled or propagated"]
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Application Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Application Backend Error: {0}")]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_user_detail_is_backend_message() {
        let err = ApiError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            message: "File not found: /media/a.mp4".to_string(),
        };
        assert_eq!(err.user_detail(), "File not found: /media/a.mp4");
        assert_eq!(err.to_string(), "Backend HTTP error 404 Not Found: File not found: /media/a.mp4");
    }

    #[test]
    fn config_error_wraps_into_app_error() {
        let app: AppError = ConfigError::MissingKey("api_url".to_string()).into();
        assert_eq!(
            app.to_string(),
            "Application Configuration Error: Missing configuration key: 'api_url'"
        );
    }
}
