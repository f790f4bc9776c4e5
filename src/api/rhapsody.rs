use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::api::MediaVariant;
use crate::config::Credentials;
use crate::error::ApiError;

const COBRAND: &str = "40134";
const CATALOG: &str = "101";
const CATALOG_STRING: &str = "US";
const LOCALE: &str = "en_US";
const SEARCH_LIMIT: &str = "48";
const ARTIST_TOP_TRACKS: &str = "50";

const RHAPSODY_SERVER: &str = "https://direct.rhapsody.com";
const JS_URL: &str = "http://app.rhapsody.com/assets/webclient-cli.js";
const SEARCH_URL: &str = "http://api.rhapsody.com/v1/search/typeahead";

lazy_static! {
    static ref BASIC_AUTH_RE: Regex =
        Regex::new(r#"Authorization['"]?:\s*["'](Basic [^"']+)["']"#).unwrap();
    static ref NAPI_KEY_RE: Regex =
        Regex::new(r#"http://api\.rhapsody\.com[^}]+NAPIKey["']?:\s*["']([^"']+)["']"#).unwrap();
    static ref DEV_KEY_RE: Regex = Regex::new(r#"["']?devkey["']?:\s*["']([^"']+)["']"#).unwrap();
    static ref RDS_DEV_KEY_RE: Regex =
        Regex::new(r#"['"]x-rds-devkey['"]:\s*['"]([^'"]+)['"]"#).unwrap();
}

fn auth_url() -> String {
    format!("{}/authserver/v3/useraccounts", RHAPSODY_SERVER)
}

fn playback_url() -> String {
    format!("{}/playbackserver/v1/users", RHAPSODY_SERVER)
}

fn artist_top_url() -> String {
    format!(
        "{}/metadata/data/methods/getTopTracksForArtist.js",
        RHAPSODY_SERVER
    )
}

/// Keys embedded in the web client's JavaScript bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKeys {
    pub basic_auth: String,
    pub napi_key: String,
    pub dev_key: String,
    pub rds_dev_key: String,
}

impl ClientKeys {
    /// Scrape all four keys out of the bundle, failing if any is missing
    pub fn extract(js: &str) -> Result<Self, ApiError> {
        let capture = |re: &Regex| {
            re.captures(js)
                .map(|caps| caps[1].to_string())
                .ok_or(ApiError::MissingClientKeys)
        };

        Ok(Self {
            basic_auth: capture(&BASIC_AUTH_RE)?,
            napi_key: capture(&NAPI_KEY_RE)?,
            dev_key: capture(&DEV_KEY_RE)?,
            rds_dev_key: capture(&RDS_DEV_KEY_RE)?,
        })
    }
}

/// Account details returned by the auth server
#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: String,
    pub access_token: String,
}

/// A live, authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub keys: ClientKeys,
    pub account: Account,
    /// Server-issued playback session id
    pub session_id: String,
}

impl Session {
    fn playback_path(&self, path: &[&str]) -> String {
        let mut url = format!(
            "{}/{}/sessions/{}",
            playback_url(),
            self.account.user_id,
            self.session_id
        );
        for segment in path {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }
}

/// What to search the catalog for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
    Artist,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Artist => "artist",
        }
    }
}

/// A named reference nested in search results (artist, genre)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// A catalog entry: a track or an artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<NamedRef>,
    #[serde(default)]
    pub genre: Option<NamedRef>,
}

impl SearchResult {
    pub fn artist_name(&self) -> Option<&str> {
        self.artist.as_ref().map(|a| a.name.as_str())
    }

    pub fn genre_name(&self) -> Option<&str> {
        self.genre.as_ref().map(|g| g.name.as_str())
    }
}

/// Playable encodings resolved for one track
#[derive(Debug, Clone)]
pub struct TrackMedia {
    pub track_id: String,
    pub name: Option<String>,
    pub medias: Vec<MediaVariant>,
}

/// Rhapsody catalog and session client
pub struct RhapsodyClient {
    client: Client,
    session: RwLock<Option<Session>>,
}

impl RhapsodyClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<Session, ApiError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(ApiError::NotLoggedIn)
    }

    /// Log in, replacing any existing session
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        *self.session.write().await = None;

        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(ApiError::Auth(
                "You must supply a username and password".to_string(),
            ));
        }

        let keys = self.fetch_client_keys().await?;

        tracing::debug!("Authenticating {}", credentials.username);
        let response = self
            .client
            .get(auth_url())
            .query(&[("userName", credentials.username.as_str())])
            .header("Accept", "application/json")
            .header("Authorization", &keys.basic_auth)
            .header("x-rds-cobrand", COBRAND)
            .header("x-rds-devkey", &keys.rds_dev_key)
            .header("x-rds-authentication", &credentials.password)
            .send()
            .await
            .map_err(|_| ApiError::Auth("Invalid credentials".to_string()))?;

        let json: Value = response
            .json()
            .await
            .map_err(|_| ApiError::Auth("Invalid credentials".to_string()))?;
        let account = parse_account(&json)?;

        let response = self
            .client
            .post(format!("{}/{}/sessions", playback_url(), account.user_id))
            .header("Accept", "application/json")
            .header("Authorization", &keys.basic_auth)
            .header("x-rds-devkey", &keys.rds_dev_key)
            .json(&serde_json::json!({ "clientType": "rhap-web" }))
            .send()
            .await?;

        let json: Value = response
            .json()
            .await
            .map_err(|_| ApiError::Auth("Unable to fetch session.".to_string()))?;
        let session_id = json
            .get("id")
            .and_then(value_to_id)
            .ok_or_else(|| ApiError::Auth("Unable to fetch session.".to_string()))?;

        let session = Session {
            keys,
            account,
            session_id,
        };
        tracing::info!("Logged in as {}", credentials.username);
        *self.session.write().await = Some(session.clone());

        Ok(session)
    }

    async fn fetch_client_keys(&self) -> Result<ClientKeys, ApiError> {
        tracing::debug!("Fetching client keys from: {}", JS_URL);
        let js = self
            .client
            .get(JS_URL)
            .send()
            .await
            .map_err(|_| ApiError::MissingClientKeys)?
            .text()
            .await
            .map_err(|_| ApiError::MissingClientKeys)?;
        ClientKeys::extract(&js)
    }

    /// Typeahead search over tracks or artists
    pub async fn search(&self, kind: SearchKind, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let session = self.session().await?;

        tracing::debug!("Searching {} for: {}", kind.as_str(), query);
        let request = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("type", kind.as_str()),
                ("q", query),
                ("limit", SEARCH_LIMIT),
                ("offset", "0"),
                ("catalog", CATALOG_STRING),
                ("apikey", session.keys.napi_key.as_str()),
            ])
            .header("Accept", "application/json");

        let response = send_checked(request).await?;
        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to parse search results: {}", e)))?;

        Ok(results)
    }

    /// Top tracks of an artist
    pub async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<SearchResult>, ApiError> {
        let session = self.session().await?;
        let cobrand_id = format!("{}:{}:{}", COBRAND, CATALOG, LOCALE);

        let request = self
            .client
            .get(artist_top_url())
            .query(&[
                ("artistId", artist_id),
                ("filterRightsKey", "2"),
                ("start", "0"),
                ("end", ARTIST_TOP_TRACKS),
                ("developerKey", session.keys.dev_key.as_str()),
                ("cobrandId", cobrand_id.as_str()),
            ])
            .header("Accept", "application/json");

        let response = send_checked(request).await?;
        let json: Value = response.json().await?;
        parse_artist_tracks(&json)
    }

    /// Resolve the playable encodings of a track
    pub async fn resolve_track_media(&self, track_id: &str) -> Result<TrackMedia, ApiError> {
        let session = self.session().await?;
        let url = session.playback_path(&["track", track_id]);

        tracing::debug!("Resolving track media from: {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("context", "ON_DEMAND")])
            .header("Accept", "application/json")
            .header("Authorization", &session.keys.basic_auth)
            .header("x-rhapsody-access-token-v2", &session.account.access_token)
            .header("x-rds-devkey", &session.keys.rds_dev_key)
            .send()
            .await?;

        let status = response.status();
        let json: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP {}: {}", status, e)))?;

        parse_track_media(track_id, &json)
    }

    /// Drop the current session
    pub async fn logout(&self) {
        if self.session.write().await.take().is_some() {
            tracing::info!("Logged out");
        }
    }
}

impl Default for RhapsodyClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn send_checked(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await?;

    if !response.status().is_success() {
        return Err(ApiError::Http(format!("HTTP {}", response.status())));
    }

    Ok(response)
}

/// Description of the first entry of an `errors` payload, if any
fn first_error(json: &Value) -> Option<String> {
    let errors = json.get("errors")?;
    let description = errors
        .get(0)
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error");
    Some(description.to_string())
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(&value).ok_or_else(|| serde::de::Error::custom("expected a string or numeric id"))
}

fn parse_account(json: &Value) -> Result<Account, ApiError> {
    if json.is_null() {
        return Err(ApiError::Auth("Invalid credentials".to_string()));
    }
    if let Some(description) = first_error(json) {
        return Err(ApiError::Auth(description));
    }

    let user_id = json.get("userId").and_then(value_to_id);
    let access_token = json
        .get("rhapsodyAccessToken")
        .and_then(Value::as_str)
        .map(str::to_string);

    match (user_id, access_token) {
        (Some(user_id), Some(access_token)) => Ok(Account {
            user_id,
            access_token,
        }),
        _ => Err(ApiError::Auth("Invalid credentials".to_string())),
    }
}

fn parse_artist_tracks(json: &Value) -> Result<Vec<SearchResult>, ApiError> {
    if let Some(description) = first_error(json) {
        return Err(ApiError::Backend(description));
    }

    let tracks = json
        .get("tracks")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Http("Malformed artist response".to_string()))?;

    Ok(tracks
        .iter()
        .filter_map(|t| {
            Some(SearchResult {
                id: t.get("trackId").and_then(value_to_id)?,
                name: t.get("name").and_then(Value::as_str)?.to_string(),
                artist: None,
                genre: None,
            })
        })
        .collect())
}

fn parse_track_media(track_id: &str, json: &Value) -> Result<TrackMedia, ApiError> {
    if let Some(description) = first_error(json) {
        return Err(ApiError::Backend(description));
    }

    let station_track = json.get("stationTrack").ok_or(ApiError::TrackUnavailable)?;
    let medias = station_track
        .get("medias")
        .filter(|m| !m.is_null())
        .ok_or(ApiError::TrackUnavailable)?;

    let medias: Vec<MediaVariant> = serde_json::from_value(medias.clone())
        .map_err(|e| ApiError::Http(format!("Malformed track media: {}", e)))?;

    if medias.is_empty() {
        return Err(ApiError::TrackUnavailable);
    }

    Ok(TrackMedia {
        track_id: track_id.to_string(),
        name: station_track
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        medias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLIENT_JS: &str = r#"
        var cfg = {headers: {Authorization: "Basic d2ViOnNlY3JldA=="}};
        var napi = {url: "http://api.rhapsody.com/v1", NAPIKey: "napi-123"};
        var dev = {devkey: "dev-456"};
        var rds = {'x-rds-devkey': 'rds-789'};
    "#;

    #[test]
    fn test_extract_client_keys() {
        let keys = ClientKeys::extract(CLIENT_JS).unwrap();
        assert_eq!(keys.basic_auth, "Basic d2ViOnNlY3JldA==");
        assert_eq!(keys.napi_key, "napi-123");
        assert_eq!(keys.dev_key, "dev-456");
        assert_eq!(keys.rds_dev_key, "rds-789");
    }

    #[test]
    fn test_missing_client_key() {
        let js = r#"var cfg = {headers: {Authorization: "Basic abc"}};"#;
        assert!(matches!(
            ClientKeys::extract(js),
            Err(ApiError::MissingClientKeys)
        ));
    }

    #[test]
    fn test_parse_account() {
        let account = parse_account(&json!({
            "userId": 4242,
            "rhapsodyAccessToken": "token"
        }))
        .unwrap();
        assert_eq!(account.user_id, "4242");
        assert_eq!(account.access_token, "token");
    }

    #[test]
    fn test_parse_account_error_payload() {
        let result = parse_account(&json!({
            "errors": [{"code": "BAD_PASSWORD", "description": "Wrong password"}]
        }));
        match result {
            Err(ApiError::Auth(msg)) => assert_eq!(msg, "Wrong password"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_search_results_deserialize() {
        let results: Vec<SearchResult> = serde_json::from_value(json!([
            {"id": "Tra.1", "name": "Stayin' Alive", "artist": {"id": "Art.1", "name": "Bee Gees"}},
            {"id": "Art.2", "name": "Queen", "genre": {"name": "Rock"}}
        ]))
        .unwrap();

        assert_eq!(results[0].artist_name(), Some("Bee Gees"));
        assert_eq!(results[0].genre_name(), None);
        assert_eq!(results[1].genre_name(), Some("Rock"));
    }

    #[test]
    fn test_parse_artist_tracks() {
        let tracks = parse_artist_tracks(&json!({
            "tracks": [
                {"trackId": "Tra.10", "name": "Bohemian Rhapsody"},
                {"trackId": 11, "name": "Somebody to Love"}
            ]
        }))
        .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "Tra.10");
        assert_eq!(tracks[1].id, "11");
        assert!(tracks[1].artist.is_none());
    }

    #[test]
    fn test_parse_track_media() {
        let media = parse_track_media(
            "Tra.1",
            &json!({
                "stationTrack": {
                    "name": "Stayin' Alive",
                    "medias": [
                        {"bitrate": "128", "format": "MP3", "location": "rtmp://h/a/i/p/t.mp3?x"},
                        {"bitrate": 64, "format": "AAC PLUS", "location": "rtmp://h/a/i/p/t.m4a?x"}
                    ]
                }
            }),
        )
        .unwrap();

        assert_eq!(media.track_id, "Tra.1");
        assert_eq!(media.name.as_deref(), Some("Stayin' Alive"));
        assert_eq!(media.medias.len(), 2);
    }

    #[test]
    fn test_track_media_backend_error() {
        let result = parse_track_media(
            "Tra.1",
            &json!({"errors": [{"description": "Track is not streamable"}]}),
        );
        match result {
            Err(ApiError::Backend(msg)) => assert_eq!(msg, "Track is not streamable"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_track_media_without_medias_is_unavailable() {
        let result = parse_track_media("Tra.1", &json!({"stationTrack": {"name": "x"}}));
        assert!(matches!(result, Err(ApiError::TrackUnavailable)));

        let result = parse_track_media("Tra.1", &json!({}));
        assert!(matches!(result, Err(ApiError::TrackUnavailable)));

        let result = parse_track_media("Tra.1", &json!({"stationTrack": {"medias": []}}));
        assert!(matches!(result, Err(ApiError::TrackUnavailable)));
    }

    #[tokio::test]
    async fn test_calls_require_login() {
        let client = RhapsodyClient::new();
        assert!(matches!(client.session().await, Err(ApiError::NotLoggedIn)));
        assert!(matches!(
            client.search(SearchKind::Track, "bee gees").await,
            Err(ApiError::NotLoggedIn)
        ));
        assert!(matches!(
            client.resolve_track_media("Tra.1").await,
            Err(ApiError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_empty_credentials() {
        let client = RhapsodyClient::new();
        let result = client.login(&Credentials::new("", "secret")).await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }
}
