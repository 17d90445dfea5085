use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::ConfigError;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the music-generation backend.
    pub http_base: String,
    /// URL of the presence websocket endpoint.
    pub ws_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            http_base: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TimerConfig {
    /// Default work-phase length, used until storage has a saved value.
    pub work_minutes: u32,
    pub break_minutes: u32,
    /// Sound played at the end of a phase.
    pub cue_path: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            cue_path: "timer-end.mp3".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Path of the JSON settings store.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "lofai-settings.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    /// Load `config.toml` from the working directory. A missing file is not
    /// an error; defaults point at a localhost backend.
    pub fn load() -> Result<Self, ConfigError> {
        match std::fs::read_to_string("config.toml") {
            Ok(s) => Ok(Self::parse(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("config.toml not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config_with_defaults() {
        let config = Config::parse(
            r#"
            [backend]
            http_base = "http://music.example:9000"
            ws_url = "ws://music.example:9000/ws"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.http_base, "http://music.example:9000");
        assert_eq!(config.timer.work_minutes, 25);
        assert_eq!(config.timer.break_minutes, 5);
        assert_eq!(config.storage.path, "lofai-settings.json");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::parse("backend = not valid").is_err());
    }
}
