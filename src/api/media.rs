use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Formats preferred when several variants share the top bitrate, best first
pub const PREFERRED_FORMATS: &[&str] = &["aac plus", "aac", "mp3"];

/// Extension used when the location does not carry one
pub const DEFAULT_EXTENSION: &str = "mp3";

lazy_static! {
    // Match the extension right before the query string, e.g. ".m4a?"
    static ref EXTENSION_RE: Regex = Regex::new(r"\.(\w{3,4})\?").unwrap();
}

/// One playable encoding of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaVariant {
    /// Bitrate in kbps
    #[serde(deserialize_with = "deserialize_bitrate")]
    pub bitrate: u32,
    /// Encoding name, e.g. "AAC PLUS"
    pub format: String,
    /// Streaming-server location of this encoding
    pub location: String,
}

impl MediaVariant {
    #[cfg(test)]
    pub fn new(bitrate: u32, format: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            bitrate,
            format: format.into(),
            location: location.into(),
        }
    }

    /// Rank of the format in the preference list (higher is better, 0 if unlisted)
    pub fn format_rank(&self) -> usize {
        let format = self.format.to_lowercase();
        PREFERRED_FORMATS
            .iter()
            .position(|f| *f == format)
            .map_or(0, |idx| PREFERRED_FORMATS.len() - idx)
    }

    /// File extension the player should see for this variant
    pub fn extension(&self) -> String {
        let ext = EXTENSION_RE
            .captures(&self.location)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        // The player wants the container, not the codec
        if ext == "m4a" {
            "mp4".to_string()
        } else {
            ext
        }
    }
}

/// Pick the variant to download: highest bitrate, then preferred format.
///
/// Remaining ties keep the earliest variant in input order. Returns `None`
/// only for an empty slice.
pub fn select_variant(variants: &[MediaVariant]) -> Option<&MediaVariant> {
    let mut best: Option<&MediaVariant> = None;

    for variant in variants {
        let better = best.map_or(true, |current| {
            (variant.bitrate, variant.format_rank()) > (current.bitrate, current.format_rank())
        });
        if better {
            best = Some(variant);
        }
    }

    best
}

/// The backend sends bitrates both as numbers and as numeric strings
fn deserialize_bitrate<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bitrate {
        Number(u32),
        Text(String),
    }

    match Bitrate::deserialize(deserializer)? {
        Bitrate::Number(n) => Ok(n),
        Bitrate::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(bitrate: u32, format: &str) -> MediaVariant {
        MediaVariant::new(bitrate, format, format!("rtmp://host/app/inst/{bitrate}.mp3?x"))
    }

    #[test]
    fn test_highest_bitrate_wins() {
        let variants = vec![variant(64, "aac plus"), variant(192, "mp3"), variant(128, "aac")];
        let selected = select_variant(&variants).unwrap();
        assert_eq!(selected.bitrate, 192);
        assert_eq!(selected.format, "mp3");
    }

    #[test]
    fn test_bitrate_beats_format_preference() {
        let variants = vec![variant(64, "aac plus"), variant(192, "mp3")];
        assert_eq!(select_variant(&variants).unwrap().bitrate, 192);
    }

    #[test]
    fn test_preferred_format_on_tie() {
        let variants = vec![variant(128, "mp3"), variant(128, "aac")];
        assert_eq!(select_variant(&variants).unwrap().format, "aac");

        let variants = vec![variant(128, "aac"), variant(128, "AAC PLUS"), variant(128, "mp3")];
        assert_eq!(select_variant(&variants).unwrap().format, "AAC PLUS");
    }

    #[test]
    fn test_unlisted_format_never_beats_listed() {
        let variants = vec![variant(320, "wma"), variant(320, "mp3")];
        assert_eq!(select_variant(&variants).unwrap().format, "mp3");

        let variants = vec![variant(320, "mp3"), variant(320, "flac")];
        assert_eq!(select_variant(&variants).unwrap().format, "mp3");
    }

    #[test]
    fn test_full_tie_keeps_input_order() {
        let first = MediaVariant::new(128, "mp3", "rtmp://a/b/c/first.mp3?x");
        let second = MediaVariant::new(128, "MP3", "rtmp://a/b/c/second.mp3?x");
        let variants = vec![first.clone(), second];
        assert_eq!(select_variant(&variants), Some(&first));
    }

    #[test]
    fn test_empty_selection() {
        assert!(select_variant(&[]).is_none());
    }

    #[test]
    fn test_extension_m4a_becomes_mp4() {
        let v = MediaVariant::new(64, "aac", "rtmp://host/ondemand/i/a/track.m4a?token=1");
        assert_eq!(v.extension(), "mp4");
    }

    #[test]
    fn test_extension_defaults_to_mp3() {
        let v = MediaVariant::new(64, "aac", "rtmp://host/ondemand/i/a/track");
        assert_eq!(v.extension(), "mp3");

        let no_query = MediaVariant::new(64, "aac", "rtmp://host/ondemand/i/a/track.flac");
        assert_eq!(no_query.extension(), "mp3");
    }

    #[test]
    fn test_extension_passthrough() {
        let v = MediaVariant::new(192, "mp3", "rtmp://host/ondemand/i/a/track.mp3?e=1");
        assert_eq!(v.extension(), "mp3");
    }

    #[test]
    fn test_bitrate_from_string_or_number() {
        let json = r#"[
            {"bitrate": "128", "format": "MP3", "location": "rtmp://a"},
            {"bitrate": 64, "format": "AAC", "location": "rtmp://b"}
        ]"#;
        let variants: Vec<MediaVariant> = serde_json::from_str(json).unwrap();
        assert_eq!(variants[0].bitrate, 128);
        assert_eq!(variants[1].bitrate, 64);
    }
}
