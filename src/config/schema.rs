use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Command to launch player
    #[serde(default = "default_player_command")]
    pub command: String,

    /// Additional arguments passed to player
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: default_player_args(),
        }
    }
}

fn default_player_command() -> String {
    "mpv".to_string()
}

fn default_player_args() -> Vec<String> {
    vec!["--no-video".to_string()]
}

/// Stream downloader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Command used to pull the RTMP stream
    #[serde(default = "default_streaming_command")]
    pub command: String,

    /// Kilobytes that must arrive before playback starts
    #[serde(default = "default_min_buffer_kb")]
    pub min_buffer_kb: u64,
}

impl StreamingConfig {
    pub fn min_buffer_bytes(&self) -> u64 {
        self.min_buffer_kb * 1024
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            command: default_streaming_command(),
            min_buffer_kb: default_min_buffer_kb(),
        }
    }
}

fn default_streaming_command() -> String {
    "rtmpdump".to_string()
}

fn default_min_buffer_kb() -> u64 {
    100
}

/// Playback controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Retries after the first failed attempt to load a track
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Seconds skipped by the seek keys
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,

    /// Directory holding in-progress track downloads
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// File name prefix of downloaded tracks
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

impl PlaybackConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// Resolve the temp directory, falling back to ~/.bohemian/tmp
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".bohemian")
                .join("tmp")
        })
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            seek_step_secs: default_seek_step_secs(),
            temp_dir: None,
            temp_prefix: default_temp_prefix(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    2
}

fn default_seek_step_secs() -> f64 {
    5.0
}

fn default_temp_prefix() -> String {
    "track".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.streaming.command, "rtmpdump");
        assert_eq!(config.streaming.min_buffer_bytes(), 100 * 1024);
        assert_eq!(config.playback.max_retries, 3);
        assert_eq!(config.playback.retry_backoff(), Duration::from_secs(2));
        assert_eq!(config.playback.temp_prefix, "track");
    }

    #[test]
    fn test_default_temp_dir() {
        let config = PlaybackConfig::default();
        assert!(config.temp_dir().ends_with(".bohemian/tmp"));
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.player.args, vec!["--no-video"]);
        assert_eq!(config.playback.seek_step_secs, 5.0);
    }

    #[test]
    fn test_partial_player_section_keeps_default_args() {
        let config: Config = toml::from_str("[player]\ncommand = \"/opt/mpv/bin/mpv\"\n").unwrap();
        assert_eq!(config.player.command, "/opt/mpv/bin/mpv");
        assert_eq!(config.player.args, vec!["--no-video"]);
    }

    #[test]
    fn test_config_deserialization_full() {
        let toml_str = r#"
[player]
command = "/usr/local/bin/mpv"
args = ["--volume=50"]

[streaming]
command = "rtmpdump-ksv"
min_buffer_kb = 256

[playback]
max_retries = 5
retry_backoff_secs = 1
seek_step_secs = 10.0
temp_dir = "/tmp/bohemian"
temp_prefix = "song"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.player.command, "/usr/local/bin/mpv");
        assert_eq!(config.player.args, vec!["--volume=50"]);
        assert_eq!(config.streaming.min_buffer_bytes(), 256 * 1024);
        assert_eq!(config.playback.max_retries, 5);
        assert_eq!(config.playback.temp_dir(), PathBuf::from("/tmp/bohemian"));
        assert_eq!(config.playback.temp_prefix, "song");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("rtmpdump"));
        assert!(toml_str.contains("min_buffer_kb = 100"));
    }
}
