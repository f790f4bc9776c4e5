mod mpv;

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::PlayerError;

pub use mpv::MpvPlayer;

/// Last known state reported by the external player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    /// File currently loaded, if any
    pub filename: Option<String>,
    /// True unless paused
    pub playing: bool,
    /// Playback position in seconds
    pub elapsed: f64,
}

impl PlayerState {
    pub fn has_content(&self) -> bool {
        self.filename.is_some()
    }
}

/// Events emitted by the external player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready,
    Status {
        filename: Option<String>,
        playing: bool,
    },
    Time(f64),
    /// End of stream or player shutdown
    Stop,
}

/// An external media player driven over some control channel
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Resolve once the player accepts commands
    async fn wait_until_ready(&self) -> Result<(), PlayerError>;

    async fn open_file(&self, path: &Path) -> Result<(), PlayerError>;

    async fn play(&self) -> Result<(), PlayerError>;

    async fn pause(&self) -> Result<(), PlayerError>;

    /// Seek to an absolute position in seconds
    async fn seek(&self, seconds: f64) -> Result<(), PlayerError>;

    fn state(&self) -> PlayerState;

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}
