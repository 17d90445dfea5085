use thiserror::Error;

/// Failures talking to the remote track source. Always recoverable: the
/// caller logs and leaves local state unchanged.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(u16),
}

/// Failures of the audio-output handle.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The audio thread is gone; commands have nowhere to go.
    #[error("audio output closed")]
    Closed,
    /// Play was requested before any source was loaded.
    #[error("no source loaded")]
    NoSource,
    #[error("failed to fetch stream: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("failed to decode stream: {0}")]
    Decode(String),
    /// The output refused to start playback.
    #[error("playback start rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
