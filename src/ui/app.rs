use std::io::{self, Stdout};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::api::{NamedRef, RhapsodyClient, SearchResult};
use crate::config::{delete_credentials, load_credentials, save_credentials, Credentials};
use crate::error::Result;
use crate::playback::{DownloadHandle, PlaybackController, TrackSource};
use crate::player::{MediaPlayer, PlayerEvent, PlayerState};
use crate::shutdown::Shutdown;
use crate::ui::components::{NowPlaying, Spinner};
use crate::ui::screens::{
    ErrorScreen, LoginAction, LoginScreen, MenuAction, MenuItem, MenuScreen, ResultsAction,
    ResultsKind, ResultsScreen, SearchAction, SearchScreen,
};
use crate::ui::search_flow::{track_label, SearchOutcome, SearchRequest};
use crate::ui::theme::Theme;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Redraw interval while a track is loading
const LOADING_TICK: Duration = Duration::from_millis(80);

enum Screen {
    Login(LoginScreen),
    Menu(MenuScreen),
    Search(SearchScreen),
    Results(ResultsScreen),
    Loading(Spinner),
    Error(ErrorScreen),
}

/// Work to run on the next loop iteration, behind a loading screen
enum PendingOperation {
    None,
    Login(Credentials),
    Logout,
    Search(SearchRequest),
    ArtistTracks(SearchResult),
    Play(SearchResult),
}

/// Interactive terminal client
pub struct App<S, P> {
    client: Arc<RhapsodyClient>,
    controller: PlaybackController<S, P>,
    screen: Screen,
    pending: PendingOperation,
    should_quit: bool,
    /// Seconds moved by the arrow keys
    seek_step: f64,
    /// Label of the last track started
    now_playing: Option<String>,
    theme: Theme,
}

impl<S, P> App<S, P>
where
    S: TrackSource,
    P: MediaPlayer,
{
    pub fn new(
        client: Arc<RhapsodyClient>,
        controller: PlaybackController<S, P>,
        seek_step: f64,
    ) -> Self {
        Self {
            client,
            controller,
            screen: Screen::Login(LoginScreen::new()),
            pending: PendingOperation::None,
            should_quit: false,
            seek_step,
            now_playing: None,
            theme: Theme::default(),
        }
    }

    /// Run until the user quits, then clean up downloaded tracks.
    ///
    /// Exits with failure only when that cleanup fails.
    pub async fn run(&mut self) -> Result<ExitCode> {
        match load_credentials() {
            Ok(credentials) => self.begin(PendingOperation::Login(credentials), "Logging in..."),
            Err(e) => tracing::debug!("Not using saved credentials: {}", e),
        }

        let mut shutdown =
            Shutdown::listen().context("Failed to listen for termination signals")?;
        let mut terminal = setup_terminal()?;
        let outcome = self.event_loop(&mut terminal, &mut shutdown).await;
        let restored = restore_terminal(&mut terminal);
        let cleaned = self.controller.cleanup().await;

        outcome?;
        restored?;
        match cleaned {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!("{}", e);
                Ok(ExitCode::FAILURE)
            }
        }
    }

    async fn event_loop(&mut self, terminal: &mut Tui, shutdown: &mut Shutdown) -> Result<()> {
        while !self.should_quit {
            if shutdown.is_requested() {
                self.should_quit = true;
                break;
            }

            self.drain_player_events();

            let state = self.controller.player_state();
            terminal.draw(|f| {
                render_screen(
                    f,
                    &mut self.screen,
                    &self.theme,
                    &state,
                    self.now_playing.as_deref(),
                )
            })?;

            if !matches!(self.pending, PendingOperation::None) {
                let interrupted = tokio::select! {
                    result = self.handle_pending_operation(terminal) => {
                        result?;
                        false
                    }
                    _ = shutdown.requested() => true,
                };
                if interrupted {
                    self.should_quit = true;
                }
                continue;
            }

            // Poll with a timeout so player status keeps refreshing
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key).await;
                    }
                }
            }
        }

        Ok(())
    }

    fn begin(&mut self, operation: PendingOperation, message: &str) {
        self.pending = operation;
        self.screen = Screen::Loading(Spinner::new(message));
    }

    fn show_menu(&mut self, message: Option<String>) {
        let has_content = self.controller.player_state().has_content();
        self.screen = Screen::Menu(MenuScreen::new(has_content, message));
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.screen = Screen::Error(ErrorScreen::new(message));
    }

    fn drain_player_events(&mut self) {
        while let Some(event) = self.controller.try_next_event() {
            if matches!(event, PlayerEvent::Stop | PlayerEvent::Status { .. }) {
                let has_content = self.controller.player_state().has_content();
                if let Screen::Menu(menu) = &mut self.screen {
                    menu.set_has_content(has_content);
                }
            }
        }
    }

    async fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // Playback keys work wherever a list has focus
        if matches!(self.screen, Screen::Menu(_) | Screen::Results(_)) {
            match key.code {
                KeyCode::Left => return self.seek(-self.seek_step).await,
                KeyCode::Right => return self.seek(self.seek_step).await,
                KeyCode::Char(' ') => return self.toggle_playback().await,
                _ => {}
            }
        }

        match &mut self.screen {
            Screen::Login(screen) => match screen.handle_key(key) {
                Some(LoginAction::Submit(credentials)) => {
                    self.begin(PendingOperation::Login(credentials), "Logging in...")
                }
                Some(LoginAction::Quit) => self.should_quit = true,
                None => {}
            },
            Screen::Menu(screen) => {
                if let Some(MenuAction::Select(item)) = screen.handle_key(key) {
                    match item {
                        MenuItem::PlayPause => self.toggle_playback().await,
                        MenuItem::Search => self.screen = Screen::Search(SearchScreen::new()),
                        MenuItem::Exit => self.should_quit = true,
                        MenuItem::Logout => self.begin(PendingOperation::Logout, "Logging out..."),
                    }
                }
            }
            Screen::Search(screen) => match screen.handle_key(key) {
                Some(SearchAction::Submit { artist, track }) => {
                    match SearchRequest::from_inputs(&artist, &track) {
                        Some(request) => {
                            self.begin(PendingOperation::Search(request), "Searching...")
                        }
                        None => self.show_menu(Some(
                            "Sorry - you need to enter an artist or track.".to_string(),
                        )),
                    }
                }
                Some(SearchAction::Back) => self.show_menu(None),
                None => {}
            },
            Screen::Results(screen) => {
                let kind = screen.kind;
                match screen.handle_key(key) {
                    Some(ResultsAction::Select(result)) => match kind {
                        ResultsKind::Tracks => {
                            self.begin(PendingOperation::Play(result), "Loading track...")
                        }
                        ResultsKind::Artists => self.begin(
                            PendingOperation::ArtistTracks(result),
                            "Fetching songs for artist...",
                        ),
                    },
                    Some(ResultsAction::Back) => self.show_menu(None),
                    None => {}
                }
            }
            Screen::Loading(_) => {}
            Screen::Error(screen) => {
                if screen.handle_key(key) {
                    self.show_menu(None);
                }
            }
        }
    }

    async fn seek(&mut self, delta: f64) {
        if let Err(e) = self.controller.seek_relative(delta).await {
            tracing::warn!("Seek failed: {}", e);
        }
    }

    async fn toggle_playback(&mut self) {
        if let Err(e) = self.controller.play_pause().await {
            self.show_error(e.to_string());
        }
    }

    async fn handle_pending_operation(&mut self, terminal: &mut Tui) -> Result<()> {
        let operation = std::mem::replace(&mut self.pending, PendingOperation::None);

        match operation {
            PendingOperation::None => {}
            PendingOperation::Login(credentials) => {
                match self.client.login(&credentials).await {
                    Ok(_) => {
                        if let Err(e) = save_credentials(&credentials) {
                            tracing::warn!("Failed to save credentials: {}", e);
                        }
                        self.show_menu(None);
                    }
                    Err(e) => {
                        tracing::info!("Login failed: {}", e);
                        self.screen = Screen::Login(LoginScreen::retry(
                            &credentials.username,
                            format!("Login failed: {}", e),
                        ));
                    }
                }
            }
            PendingOperation::Logout => {
                self.client.logout().await;
                if let Err(e) = delete_credentials() {
                    tracing::warn!("Failed to delete saved credentials: {}", e);
                }
                self.screen = Screen::Login(LoginScreen::new());
            }
            PendingOperation::Search(request) => {
                match self.client.search(request.kind(), &request.term()).await {
                    Ok(results) => self.apply_outcome(request.outcome(results)),
                    Err(e) => self.show_error(e.to_string()),
                }
            }
            PendingOperation::ArtistTracks(artist) => {
                match self.client.artist_top_tracks(&artist.id).await {
                    Ok(tracks) if tracks.is_empty() => {
                        self.show_menu(Some("No matching tracks.".to_string()))
                    }
                    Ok(tracks) => {
                        let tracks = with_artist(tracks, &artist.name);
                        self.screen = Screen::Results(ResultsScreen::tracks(tracks));
                    }
                    Err(e) => self.show_error(e.to_string()),
                }
            }
            PendingOperation::Play(track) => self.play(track, terminal).await?,
        }

        Ok(())
    }

    fn apply_outcome(&mut self, outcome: SearchOutcome) {
        match outcome {
            SearchOutcome::Play(track) => {
                self.begin(PendingOperation::Play(track), "Loading track...")
            }
            SearchOutcome::ArtistTracks(artist) => self.begin(
                PendingOperation::ArtistTracks(artist),
                "Fetching songs for artist...",
            ),
            SearchOutcome::ChooseTrack(results) => {
                self.screen = Screen::Results(ResultsScreen::tracks(results))
            }
            SearchOutcome::ChooseArtist(results) => {
                self.screen = Screen::Results(ResultsScreen::artists(results))
            }
            SearchOutcome::NoTracks => self.show_menu(Some("No matching tracks.".to_string())),
            SearchOutcome::NoArtists => self.show_menu(Some("No matching artists.".to_string())),
        }
    }

    /// Play a track, keeping the loading screen alive and showing retries
    async fn play(&mut self, track: SearchResult, terminal: &mut Tui) -> Result<()> {
        let snapshot = self.controller.player_state();
        let mut notices = self.controller.notices();

        let result = {
            let play = self.controller.play_track(&track.id);
            tokio::pin!(play);

            loop {
                tokio::select! {
                    result = &mut play => break result,
                    Ok(notice) = notices.recv() => {
                        tracing::debug!(attempt = notice.attempt, "Retrying track");
                        if let Screen::Loading(spinner) = &mut self.screen {
                            spinner.set_notice(notice.to_string());
                        }
                    }
                    _ = tokio::time::sleep(LOADING_TICK) => {}
                }

                terminal.draw(|f| {
                    render_screen(
                        f,
                        &mut self.screen,
                        &self.theme,
                        &snapshot,
                        self.now_playing.as_deref(),
                    )
                })?;
            }
        };

        match result {
            Ok(()) => {
                let title = playing_title(self.controller.current(), &track);
                self.show_menu(Some(format!("Playing {}", title)));
                self.now_playing = Some(title);
            }
            Err(e) => {
                self.now_playing = None;
                self.show_error(e.to_string());
            }
        }

        Ok(())
    }
}

/// Label for the now-playing bar, preferring the name the media lookup returned
fn playing_title(handle: Option<&DownloadHandle>, picked: &SearchResult) -> String {
    let name = handle
        .and_then(|handle| handle.track.name.as_deref())
        .unwrap_or(&picked.name);
    track_label(name, picked.artist_name())
}

/// Top-track entries carry no artist, so borrow it from the artist picked
fn with_artist(tracks: Vec<SearchResult>, artist: &str) -> Vec<SearchResult> {
    tracks
        .into_iter()
        .map(|mut track| {
            track.artist.get_or_insert_with(|| NamedRef {
                name: artist.to_string(),
            });
            track
        })
        .collect()
}

fn render_screen(
    frame: &mut Frame,
    screen: &mut Screen,
    theme: &Theme,
    state: &PlayerState,
    title: Option<&str>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(frame.area());
    let area = chunks[0];

    match screen {
        Screen::Login(screen) => screen.render(frame, area, theme),
        Screen::Menu(screen) => screen.render(frame, area, theme),
        Screen::Search(screen) => screen.render(frame, area, theme),
        Screen::Results(screen) => screen.render(frame, area, theme),
        Screen::Loading(spinner) => {
            let centered = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Length(2),
                    Constraint::Min(0),
                ])
                .split(area);
            spinner.render(frame, centered[1], theme);
        }
        Screen::Error(screen) => screen.render(frame, area, theme),
    }

    if !matches!(screen, Screen::Login(_)) {
        NowPlaying::new(state, title).render(frame, chunks[1], theme);
    }
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}
