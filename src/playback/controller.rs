use std::fmt;
use std::io;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::{DownloadHandle, TemporaryTrackArea, TrackSource};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlayerError};
use crate::player::{MediaPlayer, PlayerEvent, PlayerState};

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

const NOTICE_CAPACITY: usize = 16;

/// How often, and how patiently, a failed track load is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff: RETRY_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    /// Acquiring a track; `attempt` counts from zero
    Preparing { attempt: u32 },
    Playing,
    Paused,
    /// The player reached the end of the track or went away
    Stopped,
}

/// Broadcast before each retry of a failed track load
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// 1-based retry number
    pub attempt: u32,
    pub max_retries: u32,
    pub reason: String,
}

impl fmt::Display for RetryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to load track. Trying again... ({}/{}): {}",
            self.attempt, self.max_retries, self.reason
        )
    }
}

/// Drives one external player over tracks downloaded into a single
/// temporary area.
///
/// Starting a new track always supersedes the previous download, so at most
/// one transfer is writing into the area at any time.
pub struct PlaybackController<S, P> {
    source: S,
    player: P,
    area: TemporaryTrackArea,
    policy: RetryPolicy,
    phase: PlaybackPhase,
    current: Option<DownloadHandle>,
    player_events: broadcast::Receiver<PlayerEvent>,
    notices: broadcast::Sender<RetryNotice>,
}

impl<S, P> PlaybackController<S, P>
where
    S: TrackSource,
    P: MediaPlayer,
{
    pub fn new(source: S, player: P, area: TemporaryTrackArea) -> Self {
        let player_events = player.subscribe();
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            source,
            player,
            area,
            policy: RetryPolicy::default(),
            phase: PlaybackPhase::Idle,
            current: None,
            player_events,
            notices,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn player_state(&self) -> PlayerState {
        self.player.state()
    }

    /// The download backing the current track, if any
    pub fn current(&self) -> Option<&DownloadHandle> {
        self.current.as_ref()
    }

    pub fn notices(&self) -> broadcast::Receiver<RetryNotice> {
        self.notices.subscribe()
    }

    /// Download `track_id` and start playing it.
    ///
    /// Acquisition failures are retried up to the policy's limit with a fixed
    /// pause in between. On final failure the temporary area is cleaned and
    /// the last error is returned.
    pub async fn play_track(&mut self, track_id: &str) -> Result<(), PlaybackError> {
        let mut attempt = 0;

        let handle = loop {
            self.phase = PlaybackPhase::Preparing { attempt };

            match self.acquire(track_id).await {
                Ok(handle) => break handle,
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        track_id,
                        attempt,
                        max_retries = self.policy.max_retries,
                        "Unable to load track, trying again: {}",
                        e
                    );
                    let _ = self.notices.send(RetryNotice {
                        attempt,
                        max_retries: self.policy.max_retries,
                        reason: e.to_string(),
                    });
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => return Err(self.fail(e).await),
            }
        };

        if let Err(e) = self.start_playback(&handle).await {
            drop(handle);
            return Err(self.fail(e.into()).await);
        }

        tracing::info!(
            track_id = %handle.track.track_id,
            name = handle.track.name.as_deref().unwrap_or("unknown"),
            format = %handle.variant.format,
            bitrate = handle.variant.bitrate,
            extension = %handle.extension,
            path = %handle.path.display(),
            buffered = handle.transfer.buffered(),
            downloading = handle.is_downloading(),
            "Playing track"
        );
        self.current = Some(handle);
        self.phase = PlaybackPhase::Playing;
        Ok(())
    }

    /// Toggle pause. Does nothing while no track is loaded.
    pub async fn play_pause(&mut self) -> Result<(), PlayerError> {
        let state = self.player.state();
        if !state.has_content() {
            return Ok(());
        }

        if state.playing {
            self.player.pause().await?;
            self.phase = PlaybackPhase::Paused;
        } else {
            self.player.play().await?;
            self.phase = PlaybackPhase::Playing;
        }
        Ok(())
    }

    /// Seek `delta` seconds from the current position
    pub async fn seek_relative(&self, delta: f64) -> Result<(), PlayerError> {
        let state = self.player.state();
        if !state.has_content() {
            return Ok(());
        }
        self.player.seek(state.elapsed + delta).await
    }

    /// Stop the current download and remove every track file
    pub async fn cleanup(&mut self) -> io::Result<()> {
        self.current = None;
        self.area.cleanup().await
    }

    /// Wait for the next player event, updating the phase from it.
    ///
    /// Returns `None` once the player is gone for good.
    pub async fn next_event(&mut self) -> Option<PlayerEvent> {
        loop {
            match self.player_events.recv().await {
                Ok(event) => {
                    self.apply_event(&event);
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Player events lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next_event`](Self::next_event)
    pub fn try_next_event(&mut self) -> Option<PlayerEvent> {
        loop {
            match self.player_events.try_recv() {
                Ok(event) => {
                    self.apply_event(&event);
                    return Some(event);
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    async fn acquire(&mut self, track_id: &str) -> Result<DownloadHandle, PlaybackError> {
        // The old transfer must stop before its file is removed
        self.current = None;
        self.area.cleanup().await?;
        self.area.ensure().await?;

        self.source.acquire(track_id, &self.area.stem()).await
    }

    async fn start_playback(&self, handle: &DownloadHandle) -> Result<(), PlayerError> {
        self.player.wait_until_ready().await?;
        self.player.open_file(&handle.path).await?;
        self.player.play().await
    }

    async fn fail(&mut self, error: PlaybackError) -> PlaybackError {
        tracing::error!("Giving up on track: {}", error);
        self.phase = PlaybackPhase::Idle;
        self.current = None;

        // The area itself is what failed; cleaning it again would only repeat that
        if matches!(error, PlaybackError::Filesystem(_)) {
            return error;
        }

        match self.area.cleanup().await {
            Ok(()) => error,
            Err(cleanup) => {
                tracing::error!("Failed to clean up temporary tracks: {}", cleanup);
                PlaybackError::Abandoned {
                    cause: Box::new(error),
                    cleanup,
                }
            }
        }
    }

    fn apply_event(&mut self, event: &PlayerEvent) {
        let active = matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Paused);
        match event {
            PlayerEvent::Stop if active => {
                tracing::info!("Track finished");
                self.phase = PlaybackPhase::Stopped;
            }
            PlayerEvent::Status {
                filename: Some(_),
                playing,
            } if active => {
                self.phase = if *playing {
                    PlaybackPhase::Playing
                } else {
                    PlaybackPhase::Paused
                };
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::api::{MediaVariant, TrackMedia};
    use crate::error::StreamingError;
    use crate::streaming::Transfer;

    /// Writes a partial file on every attempt and fails the first `failures`
    #[derive(Clone)]
    struct FakeSource {
        attempts: Arc<AtomicU32>,
        failures: u32,
        extension: &'static str,
        /// Replace the area directory with a plain file when failing
        break_area: bool,
    }

    impl FakeSource {
        fn failing(failures: u32) -> Self {
            Self {
                attempts: Arc::new(AtomicU32::new(0)),
                failures,
                extension: "mp3",
                break_area: false,
            }
        }
    }

    #[async_trait]
    impl TrackSource for FakeSource {
        async fn acquire(
            &self,
            track_id: &str,
            stem: &Path,
        ) -> Result<DownloadHandle, PlaybackError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let path = PathBuf::from(format!("{}.{}", stem.display(), self.extension));
            std::fs::write(&path, b"partial audio").unwrap();

            if attempt <= self.failures {
                if self.break_area {
                    let dir = stem.parent().unwrap();
                    std::fs::remove_dir_all(dir).unwrap();
                    std::fs::write(dir, b"not a directory").unwrap();
                }
                return Err(StreamingError::Transfer("connection reset".to_string()).into());
            }

            Ok(DownloadHandle::new(
                path,
                self.extension.to_string(),
                TrackMedia {
                    track_id: track_id.to_string(),
                    name: Some("Bohemian Rhapsody".to_string()),
                    medias: vec![],
                },
                MediaVariant::new(320, "AAC", "rtmp://h/a/b/c/d/e.m4a"),
                Transfer::finished(100 * 1024),
            ))
        }
    }

    struct PlayerInner {
        ready: bool,
        state: Mutex<PlayerState>,
        commands: Mutex<Vec<String>>,
        events: broadcast::Sender<PlayerEvent>,
    }

    #[derive(Clone)]
    struct FakePlayer(Arc<PlayerInner>);

    impl FakePlayer {
        fn new(ready: bool) -> Self {
            let (events, _) = broadcast::channel(16);
            Self(Arc::new(PlayerInner {
                ready,
                state: Mutex::new(PlayerState::default()),
                commands: Mutex::new(Vec::new()),
                events,
            }))
        }

        fn commands(&self) -> Vec<String> {
            self.0.commands.lock().unwrap().clone()
        }

        fn set_state(&self, state: PlayerState) {
            *self.0.state.lock().unwrap() = state;
        }

        fn emit(&self, event: PlayerEvent) {
            let _ = self.0.events.send(event);
        }

        fn record(&self, command: String) {
            self.0.commands.lock().unwrap().push(command);
        }
    }

    #[async_trait]
    impl MediaPlayer for FakePlayer {
        async fn wait_until_ready(&self) -> Result<(), PlayerError> {
            if self.0.ready {
                Ok(())
            } else {
                Err(PlayerError::ExitError("exited".to_string()))
            }
        }

        async fn open_file(&self, path: &Path) -> Result<(), PlayerError> {
            self.record(format!("open {}", path.display()));
            self.0.state.lock().unwrap().filename = Some(path.display().to_string());
            Ok(())
        }

        async fn play(&self) -> Result<(), PlayerError> {
            self.record("play".to_string());
            self.0.state.lock().unwrap().playing = true;
            Ok(())
        }

        async fn pause(&self) -> Result<(), PlayerError> {
            self.record("pause".to_string());
            self.0.state.lock().unwrap().playing = false;
            Ok(())
        }

        async fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
            self.record(format!("seek {}", seconds));
            Ok(())
        }

        fn state(&self) -> PlayerState {
            self.0.state.lock().unwrap().clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
            self.0.events.subscribe()
        }
    }

    const FAST: RetryPolicy = RetryPolicy {
        max_retries: 3,
        backoff: Duration::from_millis(1),
    };

    fn controller(
        root: &Path,
        source: FakeSource,
        player: FakePlayer,
    ) -> PlaybackController<FakeSource, FakePlayer> {
        let area = TemporaryTrackArea::new(root.join("tmp"), "track");
        PlaybackController::new(source, player, area).with_retry_policy(FAST)
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = PlaybackConfig {
            max_retries: 5,
            retry_backoff_secs: 1,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert_eq!(RetryPolicy::default().max_retries, MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_play_track_opens_and_plays() {
        let root = tempfile::tempdir().unwrap();
        let player = FakePlayer::new(true);
        let mut controller = controller(root.path(), FakeSource::failing(0), player.clone());

        controller.play_track("Tra.1").await.unwrap();

        let expected = root.path().join("tmp").join("track.mp3");
        assert_eq!(controller.phase(), PlaybackPhase::Playing);
        assert_eq!(controller.current().unwrap().path, expected);
        assert_eq!(
            player.commands(),
            vec![format!("open {}", expected.display()), "play".to_string()]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let root = tempfile::tempdir().unwrap();
        let source = FakeSource::failing(u32::MAX);
        let attempts = source.attempts.clone();
        let player = FakePlayer::new(true);
        let mut controller = controller(root.path(), source, player.clone());
        let mut notices = controller.notices();

        let err = controller.play_track("Tra.1").await.unwrap_err();

        assert!(matches!(err, PlaybackError::Download(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(controller.current().is_none());
        assert!(player.commands().is_empty());
        assert!(!root.path().join("tmp").exists());

        let mut seen = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            seen.push(notice.attempt);
            assert_eq!(notice.max_retries, 3);
            assert!(notice.reason.contains("connection reset"));
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_backoff_between_attempts() {
        let root = tempfile::tempdir().unwrap();
        let area = TemporaryTrackArea::new(root.path().join("tmp"), "track");
        let mut controller =
            PlaybackController::new(FakeSource::failing(u32::MAX), FakePlayer::new(true), area);

        let started = tokio::time::Instant::now();
        controller.play_track("Tra.1").await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(RETRY_BACKOFF, Duration::from_secs(2));
        assert!(elapsed >= Duration::from_secs(6), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(6100), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_retry_notice_message() {
        let notice = RetryNotice {
            attempt: 2,
            max_retries: 3,
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            notice.to_string(),
            "Unable to load track. Trying again... (2/3): connection reset"
        );
    }

    #[tokio::test]
    async fn test_broken_area_is_not_retried() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("tmp"), b"not a directory").unwrap();
        let source = FakeSource::failing(0);
        let attempts = source.attempts.clone();
        let mut controller = controller(root.path(), source, FakePlayer::new(true));

        let err = controller.play_track("Tra.1").await.unwrap_err();

        assert!(!err.is_retryable());
        match err {
            PlaybackError::Filesystem(e) => assert_eq!(e.kind(), io::ErrorKind::NotADirectory),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
    }

    #[tokio::test]
    async fn test_cleanup_failure_after_last_attempt_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let source = FakeSource {
            break_area: true,
            ..FakeSource::failing(u32::MAX)
        };
        let area = TemporaryTrackArea::new(root.path().join("tmp"), "track");
        let mut controller = PlaybackController::new(source, FakePlayer::new(true), area)
            .with_retry_policy(RetryPolicy {
                max_retries: 0,
                ..FAST
            });

        let err = controller.play_track("Tra.1").await.unwrap_err();

        match err {
            PlaybackError::Abandoned { cause, cleanup } => {
                assert!(matches!(*cause, PlaybackError::Download(_)));
                assert_eq!(cleanup.kind(), io::ErrorKind::NotADirectory);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let root = tempfile::tempdir().unwrap();
        let source = FakeSource::failing(2);
        let attempts = source.attempts.clone();
        let mut controller = controller(root.path(), source, FakePlayer::new(true));

        controller.play_track("Tra.1").await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(controller.phase(), PlaybackPhase::Playing);
    }

    #[tokio::test]
    async fn test_player_failure_is_not_retried() {
        let root = tempfile::tempdir().unwrap();
        let source = FakeSource::failing(0);
        let attempts = source.attempts.clone();
        let mut controller = controller(root.path(), source, FakePlayer::new(false));

        let err = controller.play_track("Tra.1").await.unwrap_err();

        assert!(matches!(err, PlaybackError::Player(PlayerError::ExitError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!root.path().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_new_track_replaces_previous_file() {
        let root = tempfile::tempdir().unwrap();
        let area = TemporaryTrackArea::new(root.path().join("tmp"), "track");
        let old = area.dir().join("track.mp4");

        // A leftover from an earlier track in a different format
        std::fs::create_dir_all(area.dir()).unwrap();
        std::fs::write(&old, b"old audio").unwrap();

        let source = FakeSource::failing(0);
        let mut controller = PlaybackController::new(source, FakePlayer::new(true), area)
            .with_retry_policy(FAST);
        controller.play_track("Tra.2").await.unwrap();

        assert!(!old.exists());
        assert!(root.path().join("tmp").join("track.mp3").exists());

        controller.cleanup().await.unwrap();
        controller.cleanup().await.unwrap();
        assert!(!root.path().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_play_pause_without_content_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let player = FakePlayer::new(true);
        let mut controller = controller(root.path(), FakeSource::failing(0), player.clone());

        controller.play_pause().await.unwrap();
        controller.seek_relative(5.0).await.unwrap();

        assert!(player.commands().is_empty());
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
    }

    #[tokio::test]
    async fn test_play_pause_toggles() {
        let root = tempfile::tempdir().unwrap();
        let player = FakePlayer::new(true);
        let mut controller = controller(root.path(), FakeSource::failing(0), player.clone());
        controller.play_track("Tra.1").await.unwrap();

        controller.play_pause().await.unwrap();
        assert_eq!(controller.phase(), PlaybackPhase::Paused);
        assert!(!controller.player_state().playing);

        controller.play_pause().await.unwrap();
        assert_eq!(controller.phase(), PlaybackPhase::Playing);
        assert_eq!(player.commands()[2..], ["pause", "play"]);
    }

    #[tokio::test]
    async fn test_seek_is_relative_to_elapsed() {
        let root = tempfile::tempdir().unwrap();
        let player = FakePlayer::new(true);
        let controller = controller(root.path(), FakeSource::failing(0), player.clone());
        player.set_state(PlayerState {
            filename: Some("track.mp4".to_string()),
            playing: true,
            elapsed: 30.0,
        });

        controller.seek_relative(-5.0).await.unwrap();
        controller.seek_relative(5.0).await.unwrap();

        assert_eq!(player.commands(), vec!["seek 25", "seek 35"]);
    }

    #[tokio::test]
    async fn test_stop_event_ends_playback() {
        let root = tempfile::tempdir().unwrap();
        let player = FakePlayer::new(true);
        let mut controller = controller(root.path(), FakeSource::failing(0), player.clone());

        // Ignored while idle
        player.emit(PlayerEvent::Stop);
        assert_eq!(controller.try_next_event(), Some(PlayerEvent::Stop));
        assert_eq!(controller.phase(), PlaybackPhase::Idle);

        controller.play_track("Tra.1").await.unwrap();
        player.emit(PlayerEvent::Status {
            filename: Some("track.mp3".to_string()),
            playing: false,
        });
        assert!(controller.try_next_event().is_some());
        assert_eq!(controller.phase(), PlaybackPhase::Paused);

        player.emit(PlayerEvent::Stop);
        assert_eq!(controller.next_event().await, Some(PlayerEvent::Stop));
        assert_eq!(controller.phase(), PlaybackPhase::Stopped);
        assert_eq!(controller.try_next_event(), None);
    }
}
