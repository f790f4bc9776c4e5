use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{DownloadHandle, TrackSource};
use crate::api::{select_variant, RhapsodyClient, TrackMedia};
use crate::error::{ApiError, PlaybackError};
use crate::streaming::{StreamLocation, StreamTransport};

/// Looks up the playable encodings of a track
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve_track_media(&self, track_id: &str) -> Result<TrackMedia, ApiError>;
}

#[async_trait]
impl MediaResolver for RhapsodyClient {
    async fn resolve_track_media(&self, track_id: &str) -> Result<TrackMedia, ApiError> {
        RhapsodyClient::resolve_track_media(self, track_id).await
    }
}

/// Turns a track id into a locally playable, still-growing file
pub struct TrackDownloader<R, T> {
    resolver: Arc<R>,
    transport: T,
}

impl<R, T> TrackDownloader<R, T>
where
    R: MediaResolver,
    T: StreamTransport,
{
    pub fn new(resolver: Arc<R>, transport: T) -> Self {
        Self {
            resolver,
            transport,
        }
    }
}

#[async_trait]
impl<R, T> TrackSource for TrackDownloader<R, T>
where
    R: MediaResolver,
    T: StreamTransport,
{
    async fn acquire(&self, track_id: &str, stem: &Path) -> Result<DownloadHandle, PlaybackError> {
        let track = self.resolver.resolve_track_media(track_id).await?;

        let variant = select_variant(&track.medias)
            .cloned()
            .ok_or(ApiError::TrackUnavailable)?;
        let extension = variant.extension();
        let path = with_extension(stem, &extension);

        tracing::info!(
            track_id,
            bitrate = variant.bitrate,
            format = %variant.format,
            "Selected media variant"
        );

        let location = StreamLocation::parse(&variant.location, &extension)?;
        let transfer = self.transport.open_stream(&location, &path).await?;

        Ok(DownloadHandle {
            path,
            extension,
            track,
            variant,
            transfer,
        })
    }
}

/// `stem` + "." + `extension`, leaving any dots already in the stem alone
fn with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut path = OsString::from(stem.as_os_str());
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}
