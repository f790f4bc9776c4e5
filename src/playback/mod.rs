//! Track acquisition and local playback.
//!
//! [`TrackDownloader`] resolves a track's encodings, picks one and streams it
//! into the [`TemporaryTrackArea`]. [`PlaybackController`] drives the external
//! player over the result, retrying failed acquisitions and cleaning up the
//! area on every exit path.

mod acquisition;
mod controller;
mod temp_area;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::api::{MediaVariant, TrackMedia};
use crate::error::PlaybackError;
use crate::streaming::Transfer;

pub use acquisition::TrackDownloader;
pub use controller::{PlaybackController, PlaybackPhase, RetryPolicy};
pub use temp_area::TemporaryTrackArea;

/// A track being written to a local file, ready for playback.
///
/// The download keeps running in the background until the handle is dropped.
#[derive(Debug)]
pub struct DownloadHandle {
    pub path: PathBuf,
    pub extension: String,
    pub track: TrackMedia,
    pub variant: MediaVariant,
    transfer: Transfer,
}

impl DownloadHandle {
    #[cfg(test)]
    pub fn new(
        path: PathBuf,
        extension: String,
        track: TrackMedia,
        variant: MediaVariant,
        transfer: Transfer,
    ) -> Self {
        Self {
            path,
            extension,
            track,
            variant,
            transfer,
        }
    }

    /// Whether the stream is still being written
    pub fn is_downloading(&self) -> bool {
        self.transfer.is_running()
    }
}

/// Produces a playable local file for a track id
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Download `track_id` to `stem` plus an extension chosen by the source
    async fn acquire(&self, track_id: &str, stem: &Path) -> Result<DownloadHandle, PlaybackError>;
}
