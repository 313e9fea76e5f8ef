//! Handles all interactions with the backend HTTP service.
//!
//! `Backend` is the seam the controllers depend on; `ApiClient` implements it with
//! `reqwest` against the station server. All functions are asynchronous and map
//! failures to the `ApiError` type defined in `src/errors.rs`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, error, info, trace};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::errors::ApiError;
use crate::model::{
    CommandResponse, MusicManifest, PlayFileRequest, PlayFileResponse, PlayerInfo, PpvContent, PpvContentList,
    QueueStatus, RemoteCommand, RemoteStatus, ScheduleBlock, ScheduleResponse,
};
use crate::presentation::Variation;

/// Timestamp format the schedule endpoint expects for its window.
pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Operations the displays consume from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Schedule blocks of `source_id` between `start` and `end` (local time).
    async fn schedule(&self, source_id: &str, start: NaiveDateTime, end: NaiveDateTime)
        -> Result<Vec<ScheduleBlock>, ApiError>;
    /// Pay-per-view entries of `channel`, optionally themed by `variation`.
    async fn ppv_contents(&self, channel: u32, variation: Variation) -> Result<Vec<PpvContent>, ApiError>;
    /// Asks the player to play `file_path` on `channel`.
    async fn play_file(&self, channel: u32, file_path: &str) -> Result<PlayFileResponse, ApiError>;
    async fn player_info(&self) -> Result<PlayerInfo, ApiError>;
    async fn queue_connected(&self) -> Result<bool, ApiError>;
    async fn send_command(&self, command: &RemoteCommand) -> Result<CommandResponse, ApiError>;
    async fn status(&self) -> Result<RemoteStatus, ApiError>;
    /// Track paths listed in the background-music manifest at `manifest_path`.
    async fn music_playlist(&self, manifest_path: &str) -> Result<Vec<String>, ApiError>;
}

/// `reqwest` implementation of [`Backend`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: Url,
    client: Client,
}

impl ApiClient {
    /// Creates a client for the server at `base_url` (e.g. `http://tv.local:4242`).
    #[must_use = "creating the client can fail; the Result must be handled"]
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(base_url, Client::new())
    }

    #[must_use = "creating the client can fail; the Result must be handled"]
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Generic(format!("'{}' cannot be used as an API base URL", base_url)));
        }
        debug!("API client created for base URL: {}", base);
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Generic(format!("'{}' cannot be used as an API base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Resolves a path that may contain several segments (e.g. a static resource).
    fn resource(&self, path: &str) -> Result<Url, ApiError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.endpoint(&segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        trace!("GET {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Request error for GET {}: {}", url, e);
            ApiError::Request(e)
        })?;
        Self::read_json(&url, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T, ApiError> {
        trace!("POST {}", url);
        let response = self.client.post(url.clone()).json(body).send().await.map_err(|e| {
            error!("Request error for POST {}: {}", url, e);
            ApiError::Request(e)
        })?;
        Self::read_json(&url, response).await
    }

    async fn read_json<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = error_detail(&body).unwrap_or_else(|| format!("request to {} failed", url.path()));
            error!("HTTP error from {}: {} - {}", url, status, message);
            return Err(ApiError::Http { status, message });
        }
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to decode response from {}: {}", url, e);
            ApiError::Decode(e)
        })
    }
}

/// Extracts the `detail` (or `message`) field of an error body.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
}

#[async_trait]
impl Backend for ApiClient {
    async fn schedule(
        &self,
        source_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ScheduleBlock>, ApiError> {
        let mut url = self.endpoint(&["schedules", source_id])?;
        url.query_pairs_mut()
            .append_pair("start", &start.format(SCHEDULE_TIME_FORMAT).to_string())
            .append_pair("end", &end.format(SCHEDULE_TIME_FORMAT).to_string());
        let response: ScheduleResponse = self.get_json(url).await?;
        debug!("Fetched {} schedule block(s) for source '{}'", response.schedule_blocks.len(), source_id);
        Ok(response.schedule_blocks)
    }

    async fn ppv_contents(&self, channel: u32, variation: Variation) -> Result<Vec<PpvContent>, ApiError> {
        let channel_segment = channel.to_string();
        let mut url = self.endpoint(&["ppv", &channel_segment])?;
        if variation != Variation::Modern {
            url.query_pairs_mut().append_pair("variation", variation.as_str());
        }
        let response: PpvContentList = self.get_json(url).await?;
        info!("Fetched {} PPV entr(ies) for channel {}", response.contents.len(), channel);
        Ok(response.contents)
    }

    async fn play_file(&self, channel: u32, file_path: &str) -> Result<PlayFileResponse, ApiError> {
        let channel_segment = channel.to_string();
        let url = self.endpoint(&["ppv", &channel_segment, "play_file"])?;
        let response: PlayFileResponse = self.post_json(url, &PlayFileRequest { file_path }).await?;
        info!("Play command accepted for '{}' on channel {}: {}", file_path, channel, response.message);
        Ok(response)
    }

    async fn player_info(&self) -> Result<PlayerInfo, ApiError> {
        self.get_json(self.endpoint(&["player", "info"])?).await
    }

    async fn queue_connected(&self) -> Result<bool, ApiError> {
        let status: QueueStatus = self.get_json(self.endpoint(&["player", "status", "queue_connected"])?).await?;
        Ok(status.queue_connected)
    }

    async fn send_command(&self, command: &RemoteCommand) -> Result<CommandResponse, ApiError> {
        let response: CommandResponse = self.post_json(self.endpoint(&["api", "command"])?, command).await?;
        debug!("Command {:?} answered with {:?}", command, response.current);
        Ok(response)
    }

    async fn status(&self) -> Result<RemoteStatus, ApiError> {
        self.get_json(self.endpoint(&["api", "status"])?).await
    }

    async fn music_playlist(&self, manifest_path: &str) -> Result<Vec<String>, ApiError> {
        let manifest: MusicManifest = self.get_json(self.resource(manifest_path)?).await?;
        debug!("Music manifest '{}' lists {} track(s)", manifest_path, manifest.music_files.len());
        Ok(manifest.music_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_joined_and_encoded() {
        let client = ApiClient::new("http://tv.local:4242").unwrap();
        let url = client.endpoint(&["schedules", "Big Network"]).unwrap();
        assert_eq!(url.as_str(), "http://tv.local:4242/schedules/Big%20Network");

        let client = ApiClient::new("http://tv.local:4242/fs42/").unwrap();
        let url = client.resource("static/ppv/music_playlist.json").unwrap();
        assert_eq!(url.as_str(), "http://tv.local:4242/fs42/static/ppv/music_playlist.json");
    }

    #[test]
    fn error_detail_prefers_detail_then_message() {
        assert_eq!(error_detail(r#"{"detail": "Channel 9 not found"}"#).as_deref(), Some("Channel 9 not found"));
        assert_eq!(error_detail(r#"{"message": "nope"}"#).as_deref(), Some("nope"));
        assert_eq!(error_detail("<html>"), None);
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
        assert!(ApiClient::new("not a url").is_err());
    }
}
