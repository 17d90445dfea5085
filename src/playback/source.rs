//! Remote track source: the music-generation backend.

use async_trait::async_trait;
use serde::Deserialize;

use crate::common::{SourceError, now_ms};

/// Collaborator contract for the generator backend. All calls are one-shot
/// and non-blocking; a failed call means "nothing happened".
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// URL serving the audio stream for a track index.
    fn stream_url(&self, track: u32) -> String;

    /// Ask the backend to pick the next track index.
    async fn next_track(&self) -> Result<u32, SourceError>;

    /// Push the new generation prompt. Best effort, response ignored.
    async fn update_prompt(&self, mood: &str, instruments: &str) -> Result<(), SourceError>;
}

pub struct HttpTrackSource {
    client: reqwest::Client,
    base: String,
}

impl HttpTrackSource {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct NextTrackResponse {
    track: u32,
}

#[async_trait]
impl TrackSource for HttpTrackSource {
    fn stream_url(&self, track: u32) -> String {
        // Timestamp defeats intermediary caching of the generated stream.
        format!("{}/api/stream?track={}&t={}", self.base, track, now_ms())
    }

    async fn next_track(&self) -> Result<u32, SourceError> {
        let response = self
            .client
            .post(format!("{}/api/next-track", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<NextTrackResponse>().await?.track)
    }

    async fn update_prompt(&self, mood: &str, instruments: &str) -> Result<(), SourceError> {
        self.client
            .post(format!("{}/api/update-prompt", self.base))
            .json(&serde_json::json!({ "mood": mood, "instruments": instruments }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_carries_track_index() {
        let source = HttpTrackSource::new(reqwest::Client::new(), "http://localhost:8000/");
        let url = source.stream_url(3);
        assert!(url.starts_with("http://localhost:8000/api/stream?track=3&t="));
    }
}
