use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Directory holding downloaded tracks for as long as the player lives.
///
/// Only files named `<prefix>.<ext>` are ever written here. The area is
/// cleaned when dropped, so an unwinding panic does not leak media files.
#[derive(Debug)]
pub struct TemporaryTrackArea {
    dir: PathBuf,
    prefix: String,
}

impl TemporaryTrackArea {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path without extension, e.g. `~/.bohemian/tmp/track`
    pub fn stem(&self) -> PathBuf {
        self.dir.join(&self.prefix)
    }

    /// Create the directory if needed
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Delete all track files, then the directory if it is left empty.
    ///
    /// An already missing area and a directory holding other files are fine;
    /// any other filesystem error is returned.
    pub async fn cleanup(&self) -> io::Result<()> {
        let dir = self.dir.clone();
        let prefix = self.prefix.clone();
        tokio::task::spawn_blocking(move || remove_track_files(&dir, &prefix))
            .await
            .map_err(io::Error::other)?
    }

    /// Paths of the track files currently in the area
    #[cfg(test)]
    pub fn track_files(&self) -> io::Result<Vec<PathBuf>> {
        list_track_files(&self.dir, &self.prefix)
    }
}

impl Drop for TemporaryTrackArea {
    fn drop(&mut self) {
        if let Err(e) = remove_track_files(&self.dir, &self.prefix) {
            tracing::warn!("Failed to clean up {}: {}", self.dir.display(), e);
        }
    }
}

fn list_track_files(dir: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let mut pattern = OsString::from(prefix);
    pattern.push(".");
    let pattern = pattern.to_string_lossy().into_owned();

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(&pattern) {
            files.push(entry.path());
        }
    }
    Ok(files)
}

fn remove_track_files(dir: &Path, prefix: &str) -> io::Result<()> {
    let result = list_track_files(dir, prefix).and_then(|files| {
        for file in files {
            tracing::debug!("Removing {}", file.display());
            match fs::remove_file(&file) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        fs::remove_dir(dir)
    });

    match result {
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_in(root: &Path) -> TemporaryTrackArea {
        TemporaryTrackArea::new(root.join("tmp"), "track")
    }

    #[test]
    fn test_stem() {
        let area = TemporaryTrackArea::new("/home/me/.bohemian/tmp", "track");
        assert_eq!(area.stem(), PathBuf::from("/home/me/.bohemian/tmp/track"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_tracks_and_dir() {
        let root = tempfile::tempdir().unwrap();
        let area = area_in(root.path());
        area.ensure().await.unwrap();
        fs::write(area.dir().join("track.mp4"), b"audio").unwrap();
        fs::write(area.dir().join("track.mp3"), b"audio").unwrap();

        area.cleanup().await.unwrap();

        assert!(!area.dir().exists());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let area = area_in(root.path());
        area.ensure().await.unwrap();
        fs::write(area.dir().join("track.mp4"), b"audio").unwrap();
        fs::write(area.dir().join("notes.txt"), b"keep me").unwrap();

        area.cleanup().await.unwrap();

        assert!(area.dir().join("notes.txt").exists());
        assert!(area.track_files().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let area = area_in(root.path());

        // Never created
        area.cleanup().await.unwrap();

        area.ensure().await.unwrap();
        fs::write(area.dir().join("track.mp3"), b"audio").unwrap();
        area.cleanup().await.unwrap();
        area.cleanup().await.unwrap();
        assert!(!area.dir().exists());
    }

    #[tokio::test]
    async fn test_cleanup_reports_unexpected_errors() {
        let root = tempfile::tempdir().unwrap();
        let area = area_in(root.path());
        fs::write(area.dir(), b"not a directory").unwrap();

        let err = area.cleanup().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotADirectory);
        assert!(area.dir().is_file());
    }

    #[test]
    fn test_drop_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("tmp");
        {
            let area = TemporaryTrackArea::new(&dir, "track");
            fs::create_dir_all(area.dir()).unwrap();
            fs::write(area.dir().join("track.mp4"), b"audio").unwrap();
        }
        assert!(!dir.exists());
    }
}
