//! RTMP stream download through an external `rtmpdump` process.
//!
//! Bytes are copied from the downloader's stdout into the destination file.
//! Opening a stream resolves as soon as enough data is buffered for playback
//! to start; the copy then carries on in a background task until the stream
//! ends or the [`Transfer`] is dropped.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::StreamingConfig;
use crate::error::StreamingError;

/// SWF player used for RTMP verification
const SWF_URL: &str = "http://app.rhapsody.com/player/WebclientPlayer.swf";

/// Read size for the stdout copy loop
const CHUNK_SIZE: usize = 16 * 1024;

type ReadySender = oneshot::Sender<Result<u64, StreamingError>>;
type ReadyReceiver = oneshot::Receiver<Result<u64, StreamingError>>;

/// Connection parameters for one RTMP stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLocation {
    /// Full location as given by the backend
    pub rtmp: String,
    pub tc_url: String,
    pub app: String,
    pub playpath: String,
}

impl StreamLocation {
    /// Split a location like `rtmp://host/app/instance/path/file.m4a?auth`
    /// into the parts the RTMP handshake needs.
    pub fn parse(location: &str, extension: &str) -> Result<Self, StreamingError> {
        let parts: Vec<&str> = location.split('/').collect();
        if parts.len() < 6 {
            return Err(StreamingError::InvalidLocation(location.to_string()));
        }

        Ok(Self {
            rtmp: location.to_string(),
            tc_url: format!("{}/", parts[..5].join("/")),
            app: format!("{}/", parts[3..5].join("/")),
            playpath: format!("{}:{}", extension, parts[5..].join("/")),
        })
    }

    fn downloader_args(&self) -> Vec<String> {
        vec![
            "--rtmp".to_string(),
            self.rtmp.clone(),
            "--tcUrl".to_string(),
            self.tc_url.clone(),
            "--app".to_string(),
            self.app.clone(),
            "--playpath".to_string(),
            self.playpath.clone(),
            "--swfVfy".to_string(),
            SWF_URL.to_string(),
        ]
    }
}

/// A running (or finished) stream download.
///
/// Dropping it stops the download and kills the downloader process.
#[derive(Debug)]
pub struct Transfer {
    task: Option<JoinHandle<()>>,
    buffered: u64,
}

impl Transfer {
    /// A transfer with nothing left running in the background
    #[cfg(test)]
    pub fn finished(buffered: u64) -> Self {
        Self {
            task: None,
            buffered,
        }
    }

    /// Bytes written when the stream was handed over for playback
    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Something that can pull a stream into a local file
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open_stream(
        &self,
        location: &StreamLocation,
        dest: &Path,
    ) -> Result<Transfer, StreamingError>;
}

/// `rtmpdump`-backed transport
pub struct RtmpStreamer {
    command: String,
    min_buffer_bytes: u64,
}

impl RtmpStreamer {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            command: config.command.clone(),
            min_buffer_bytes: config.min_buffer_bytes(),
        }
    }

    /// Check if the downloader is available in PATH
    pub fn is_available(&self) -> bool {
        which::which(&self.command).is_ok()
    }
}

#[async_trait]
impl StreamTransport for RtmpStreamer {
    async fn open_stream(
        &self,
        location: &StreamLocation,
        dest: &Path,
    ) -> Result<Transfer, StreamingError> {
        let program = which::which(&self.command)
            .map_err(|_| StreamingError::TransportNotFound(self.command.clone()))?;

        let mut child = Command::new(program)
            .args(location.downloader_args())
            .args(["--quiet", "-o", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StreamingError::Spawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StreamingError::Spawn("downloader stdout unavailable".to_string()))?;
        let file = File::create(dest).await?;

        tracing::info!("Streaming {} to {}", location.rtmp, dest.display());

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(run_transfer(child, stdout, file, self.min_buffer_bytes, ready_tx));

        wait_until_buffered(task, ready_rx).await
    }
}

/// Wait for the copy task to report enough buffered data.
///
/// The task is owned by a [`Transfer`] from the start, so dropping this
/// future early aborts the copy and kills the downloader.
async fn wait_until_buffered(
    task: JoinHandle<()>,
    ready: ReadyReceiver,
) -> Result<Transfer, StreamingError> {
    let mut transfer = Transfer {
        task: Some(task),
        buffered: 0,
    };

    match ready.await {
        Ok(Ok(buffered)) => {
            tracing::debug!(buffered, "Stream buffered, handing over for playback");
            transfer.buffered = buffered;
            Ok(transfer)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(StreamingError::Transfer(
            "download task ended unexpectedly".to_string(),
        )),
    }
}

async fn run_transfer(
    mut child: Child,
    stdout: ChildStdout,
    file: File,
    threshold: u64,
    ready: ReadySender,
) {
    let mut ready = Some(ready);

    let outcome = match copy_until_eof(stdout, file, threshold, &mut ready).await {
        Ok(total) => match child.wait().await {
            Ok(status) if status.success() => Ok(total),
            Ok(status) => Err(StreamingError::Transfer(format!(
                "downloader exited with {}",
                status
            ))),
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e),
    };

    match outcome {
        Ok(total) => {
            tracing::info!(total, "Stream finished");
            // Short tracks can end before reaching the threshold
            if let Some(tx) = ready.take() {
                let result = if total > 0 {
                    Ok(total)
                } else {
                    Err(StreamingError::EndedEarly)
                };
                let _ = tx.send(result);
            }
        }
        Err(e) => match ready.take() {
            Some(tx) => {
                let _ = tx.send(Err(e));
            }
            None => tracing::warn!("Stream failed after playback started: {}", e),
        },
    }
}

/// Copy everything from `reader` to `writer`, signalling `ready` once
/// `threshold` bytes have been written. Returns the total byte count.
async fn copy_until_eof<R, W>(
    mut reader: R,
    mut writer: W,
    threshold: u64,
    ready: &mut Option<ReadySender>,
) -> Result<u64, StreamingError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        writer.write_all(&buf[..n]).await?;
        // The player reads the same file, so data must reach it right away
        writer.flush().await?;
        total += n as u64;

        if total >= threshold {
            if let Some(tx) = ready.take() {
                let _ = tx.send(Ok(total));
            }
        }
    }

    writer.flush().await?;
    Ok(total)
}
