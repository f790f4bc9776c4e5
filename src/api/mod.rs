mod media;
mod rhapsody;

pub use media::{select_variant, MediaVariant};
pub use rhapsody::{NamedRef, RhapsodyClient, SearchKind, SearchResult, TrackMedia};
