pub mod errors;
pub mod http;

pub use errors::{ConfigError, SinkError, SourceError, StorageError};

/// Unix timestamp in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
