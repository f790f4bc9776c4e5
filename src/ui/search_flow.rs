//! Decides what an artist/track query should lead to: direct playback,
//! an artist's top tracks, or a list to choose from.

use crate::api::{SearchKind, SearchResult};

/// A validated query from the search screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    Track {
        artist: Option<String>,
        track: String,
    },
    Artist(String),
}

/// Where a search leads once results are in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The first track matched the query exactly
    Play(SearchResult),
    /// The first artist matched the query exactly
    ArtistTracks(SearchResult),
    ChooseTrack(Vec<SearchResult>),
    ChooseArtist(Vec<SearchResult>),
    NoTracks,
    NoArtists,
}

impl SearchRequest {
    /// Build a request from the two inputs. `None` when both are blank.
    pub fn from_inputs(artist: &str, track: &str) -> Option<Self> {
        let artist = artist.trim();
        let track = track.trim();

        match (artist.is_empty(), track.is_empty()) {
            (true, true) => None,
            (_, false) => Some(SearchRequest::Track {
                artist: (!artist.is_empty()).then(|| artist.to_string()),
                track: track.to_string(),
            }),
            (false, true) => Some(SearchRequest::Artist(artist.to_string())),
        }
    }

    pub fn kind(&self) -> SearchKind {
        match self {
            SearchRequest::Track { .. } => SearchKind::Track,
            SearchRequest::Artist(_) => SearchKind::Artist,
        }
    }

    /// Query string sent to the catalog, e.g. `Queen - Bohemian Rhapsody`
    pub fn term(&self) -> String {
        match self {
            SearchRequest::Track {
                artist: Some(artist),
                track,
            } => format!("{} - {}", artist, track),
            SearchRequest::Track { artist: None, track } => track.clone(),
            SearchRequest::Artist(artist) => artist.clone(),
        }
    }

    pub fn outcome(&self, results: Vec<SearchResult>) -> SearchOutcome {
        let Some(first) = results.first() else {
            return match self {
                SearchRequest::Track { .. } => SearchOutcome::NoTracks,
                SearchRequest::Artist(_) => SearchOutcome::NoArtists,
            };
        };

        match self {
            SearchRequest::Track { artist, track } => {
                let track_matches = same_name(&first.name, track);
                let artist_matches = match artist {
                    Some(artist) => first
                        .artist_name()
                        .is_some_and(|name| same_name(name, artist)),
                    None => true,
                };

                if track_matches && artist_matches {
                    SearchOutcome::Play(first.clone())
                } else {
                    SearchOutcome::ChooseTrack(results)
                }
            }
            SearchRequest::Artist(artist) => {
                if same_name(&first.name, artist) {
                    SearchOutcome::ArtistTracks(first.clone())
                } else {
                    SearchOutcome::ChooseArtist(results)
                }
            }
        }
    }
}

/// Collapse whitespace runs and lowercase
pub fn normalize(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn same_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// `Name (Artist)`, as shown in the now-playing bar
pub fn track_label(name: &str, artist: Option<&str>) -> String {
    match artist {
        Some(artist) => format!("{} ({})", name, artist),
        None => name.to_string(),
    }
}
