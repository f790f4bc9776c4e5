use thiserror::Error;

/// Application-wide result type
pub type Result<T> = anyhow::Result<T>;

/// Catalog/session API errors with typed variants for matching
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),

    #[error("Unable to find client keys")]
    MissingClientKeys,

    #[error("Not logged in!")]
    NotLoggedIn,

    #[error("{0}")]
    Backend(String),

    #[error("Unable to load track!")]
    TrackUnavailable,

    #[error("Rhapsody API error: {0}")]
    Http(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Configuration and saved-credential errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file: {0}")]
    Invalid(String),

    #[error("No saved credentials found.")]
    CredentialsNotFound,

    #[error("Invalid credentials file: {0}")]
    InvalidCredentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Streaming transport errors
#[derive(Error, Debug)]
pub enum StreamingError {
    #[error("Stream downloader '{0}' not found. Please install it or configure a different command.")]
    TransportNotFound(String),

    #[error("Failed to start stream downloader: {0}")]
    Spawn(String),

    #[error("Encountered an error while attempting to download track: {0}")]
    Transfer(String),

    #[error("Stream ended before any audio was received")]
    EndedEarly,

    #[error("Invalid stream location: {0}")]
    InvalidLocation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Player errors
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Please install it or configure a different player.")]
    NotFound(String),

    #[error("Player exited with error: {0}")]
    ExitError(String),

    #[error("Failed to launch player: {0}")]
    LaunchFailed(String),

    #[error("Player is not ready")]
    NotReady,

    #[error("Player IPC error: {0}")]
    Ipc(String),
}

/// Errors surfaced by the playback controller
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Download(#[from] StreamingError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error("Temporary track area error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// The track failed and so did removing its leftovers
    #[error("{cause} (cleaning up temporary tracks also failed: {cleanup})")]
    Abandoned {
        cause: Box<PlaybackError>,
        #[source]
        cleanup: std::io::Error,
    },
}

impl PlaybackError {
    /// Acquisition failures are retried by the controller; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaybackError::Api(_) | PlaybackError::Download(_))
    }
}
