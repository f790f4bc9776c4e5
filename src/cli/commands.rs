use std::process::ExitCode;
use std::sync::Arc;

use crate::api::{RhapsodyClient, SearchKind};
use crate::config::{load_config, load_credentials, Config, Credentials};
use crate::error::{Result, StreamingError};
use crate::playback::{
    PlaybackController, PlaybackPhase, RetryPolicy, TemporaryTrackArea, TrackDownloader,
};
use crate::player::MpvPlayer;
use crate::shutdown::Shutdown;
use crate::streaming::RtmpStreamer;
use crate::ui::App;

type Controller =
    PlaybackController<TrackDownloader<RhapsodyClient, RtmpStreamer>, MpvPlayer>;

/// Wire the downloader, player and temporary area from the config
fn build_controller(config: &Config, client: Arc<RhapsodyClient>) -> Result<Controller> {
    let streamer = RtmpStreamer::new(&config.streaming);
    if !streamer.is_available() {
        return Err(StreamingError::TransportNotFound(config.streaming.command.clone()).into());
    }

    let player = MpvPlayer::spawn(&config.player)?;
    let area = TemporaryTrackArea::new(config.playback.temp_dir(), &config.playback.temp_prefix);

    Ok(
        PlaybackController::new(TrackDownloader::new(client, streamer), player, area)
            .with_retry_policy(RetryPolicy::from_config(&config.playback)),
    )
}

/// Run interactive mode
pub async fn interactive() -> Result<ExitCode> {
    let config = load_config()?;
    let client = Arc::new(RhapsodyClient::new());
    let controller = build_controller(&config, client.clone())?;

    let mut app = App::new(client, controller, config.playback.seek_step_secs);
    app.run().await
}

/// Search for a track, play the first hit until it ends, then exit
pub async fn play(
    query: String,
    username: Option<String>,
    password: Option<String>,
) -> Result<ExitCode> {
    let credentials = if username.is_some() || password.is_some() {
        Credentials::new(username.unwrap_or_default(), password.unwrap_or_default())
    } else {
        match load_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::debug!("Failed to load saved credentials: {}", e);
                println!(
                    "Unable to load saved credentials. Try the interactive mode or use the -u and -p options."
                );
                return Ok(ExitCode::SUCCESS);
            }
        }
    };

    let config = load_config()?;
    let client = Arc::new(RhapsodyClient::new());
    client.login(&credentials).await?;

    let results = client.search(SearchKind::Track, &query).await?;
    let Some(track) = results.into_iter().next() else {
        println!("No matching tracks found.");
        return Ok(ExitCode::SUCCESS);
    };

    println!(
        "Preparing to play: {} - {}",
        track.artist_name().unwrap_or("Unknown artist"),
        track.name
    );

    // From here on a signal ends in cleanup rather than killing the process
    let mut shutdown = Shutdown::listen()?;
    let mut controller = build_controller(&config, client)?;
    let outcome = tokio::select! {
        result = play_until_stopped(&mut controller, &track.id) => result,
        _ = shutdown.requested() => Ok(()),
    };

    let cleaned = controller.cleanup().await;
    outcome?;
    match cleaned {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn play_until_stopped(controller: &mut Controller, track_id: &str) -> Result<()> {
    let mut notices = controller.notices();

    {
        let play = controller.play_track(track_id);
        tokio::pin!(play);

        loop {
            tokio::select! {
                result = &mut play => {
                    result?;
                    break;
                }
                Ok(notice) = notices.recv() => println!("{}", notice),
            }
        }
    }

    while controller.phase() != PlaybackPhase::Stopped {
        if controller.next_event().await.is_none() {
            break;
        }
    }

    Ok(())
}
