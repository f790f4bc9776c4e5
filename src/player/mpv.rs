use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use super::{MediaPlayer, PlayerEvent, PlayerState};
use crate::config::PlayerConfig;
use crate::error::PlayerError;

/// How often to retry connecting to the IPC socket while mpv starts
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CAPACITY: usize = 64;

/// Properties mirrored into [`PlayerState`]
const OBSERVED_PROPERTIES: &[&str] = &["pause", "filename", "time-pos"];

#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    Starting,
    Ready,
    Failed(String),
}

type WriterSlot = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// mpv running in idle mode, controlled over its JSON IPC socket.
///
/// A single background task owns the process and the read half of the
/// socket; it is the only writer of the player state.
pub struct MpvPlayer {
    socket_path: PathBuf,
    writer: WriterSlot,
    readiness: watch::Receiver<Readiness>,
    state: watch::Receiver<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
    actor: JoinHandle<()>,
}

impl MpvPlayer {
    /// Launch the configured player and start listening for its events
    pub fn spawn(config: &PlayerConfig) -> Result<Self, PlayerError> {
        let program = which::which(&config.command)
            .map_err(|_| PlayerError::NotFound(config.command.clone()))?;

        let socket_path =
            std::env::temp_dir().join(format!("bohemian-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        tracing::info!("Launching player: {} {:?}", config.command, config.args);

        let child = Command::new(program)
            .args(&config.args)
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg("--really-quiet")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::LaunchFailed(e.to_string()))?;

        let writer: WriterSlot = Arc::new(Mutex::new(None));
        let (readiness_tx, readiness) = watch::channel(Readiness::Starting);
        let (state_tx, state) = watch::channel(PlayerState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = tokio::spawn(run_actor(
            child,
            socket_path.clone(),
            writer.clone(),
            readiness_tx,
            state_tx,
            events.clone(),
        ));

        Ok(Self {
            socket_path,
            writer,
            readiness,
            state,
            events,
            actor,
        })
    }

    async fn send_command(&self, command: Value) -> Result<(), PlayerError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(PlayerError::NotReady)?;
        write_command(writer, command).await
    }
}

#[async_trait]
impl MediaPlayer for MpvPlayer {
    async fn wait_until_ready(&self) -> Result<(), PlayerError> {
        let mut readiness = self.readiness.clone();
        let current = readiness
            .wait_for(|r| *r != Readiness::Starting)
            .await
            .map_err(|_| PlayerError::ExitError("player task stopped".to_string()))?;

        let result = match &*current {
            Readiness::Ready => Ok(()),
            Readiness::Failed(reason) => Err(PlayerError::ExitError(reason.clone())),
            Readiness::Starting => Err(PlayerError::NotReady),
        };
        result
    }

    async fn open_file(&self, path: &Path) -> Result<(), PlayerError> {
        tracing::debug!("Opening {} in player", path.display());
        self.send_command(json!(["loadfile", path.to_string_lossy(), "replace"]))
            .await
    }

    async fn play(&self) -> Result<(), PlayerError> {
        self.send_command(json!(["set_property", "pause", false])).await
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.send_command(json!(["set_property", "pause", true])).await
    }

    async fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.send_command(json!(["seek", seconds, "absolute"])).await
    }

    fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        // Aborting the actor drops the child, which kills mpv
        self.actor.abort();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn write_command(writer: &mut OwnedWriteHalf, command: Value) -> Result<(), PlayerError> {
    let mut line = json!({ "command": command }).to_string();
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| PlayerError::Ipc(e.to_string()))
}

async fn run_actor(
    mut child: Child,
    socket_path: PathBuf,
    writer: WriterSlot,
    readiness: watch::Sender<Readiness>,
    state_tx: watch::Sender<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
) {
    let stream = match connect(&mut child, &socket_path).await {
        Ok(stream) => stream,
        Err(reason) => {
            tracing::warn!("Player failed to start: {}", reason);
            readiness.send_replace(Readiness::Failed(reason));
            return;
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    for (id, property) in OBSERVED_PROPERTIES.iter().enumerate() {
        let command = json!(["observe_property", id + 1, property]);
        if let Err(e) = write_command(&mut write_half, command).await {
            readiness.send_replace(Readiness::Failed(e.to_string()));
            return;
        }
    }
    *writer.lock().await = Some(write_half);

    tracing::info!("Player ready");
    readiness.send_replace(Readiness::Ready);
    let _ = events.send(PlayerEvent::Ready);

    let mut state = PlayerState::default();
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Ok(message) = serde_json::from_str::<Value>(&line) else {
                    tracing::debug!("Ignoring malformed player message: {}", line);
                    continue;
                };
                if let Some(event) = apply_message(&mut state, &message) {
                    state_tx.send_replace(state.clone());
                    let _ = events.send(event);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Player IPC read failed: {}", e);
                break;
            }
        }
    }

    tracing::info!("Player connection closed");
    *writer.lock().await = None;
    readiness.send_replace(Readiness::Failed("player exited".to_string()));
    state.filename = None;
    state.playing = false;
    state_tx.send_replace(state);
    let _ = events.send(PlayerEvent::Stop);
}

/// Wait for mpv to open its IPC socket, bailing out if the process dies
async fn connect(child: &mut Child, socket_path: &Path) -> Result<UnixStream, String> {
    let started = Instant::now();

    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(format!("player exited during startup ({})", status));
        }

        match UnixStream::connect(socket_path).await {
            Ok(stream) => return Ok(stream),
            Err(e) if started.elapsed() > READY_TIMEOUT => {
                return Err(format!("timed out waiting for player IPC socket: {}", e));
            }
            Err(_) => tokio::time::sleep(READY_POLL_INTERVAL).await,
        }
    }
}

/// Fold one IPC message into the player state, returning the event it represents
fn apply_message(state: &mut PlayerState, message: &Value) -> Option<PlayerEvent> {
    match message.get("event").and_then(Value::as_str)? {
        "property-change" => {
            let data = message.get("data").unwrap_or(&Value::Null);
            match message.get("name").and_then(Value::as_str)? {
                "pause" => {
                    state.playing = !data.as_bool()?;
                    Some(status_event(state))
                }
                "filename" => {
                    state.filename = data.as_str().map(str::to_string);
                    if state.filename.is_none() {
                        state.elapsed = 0.0;
                    }
                    Some(status_event(state))
                }
                "time-pos" => {
                    let seconds = data.as_f64()?;
                    state.elapsed = seconds;
                    Some(PlayerEvent::Time(seconds))
                }
                _ => None,
            }
        }
        "end-file" => match message.get("reason").and_then(Value::as_str) {
            // "stop" is also sent when a new file replaces the current one
            Some("eof") | Some("error") => {
                state.filename = None;
                state.playing = false;
                Some(PlayerEvent::Stop)
            }
            _ => None,
        },
        _ => None,
    }
}

fn status_event(state: &PlayerState) -> PlayerEvent {
    PlayerEvent::Status {
        filename: state.filename.clone(),
        playing: state.playing,
    }
}
