mod input;
mod list;
mod now_playing;
mod spinner;

pub use input::Input;
pub use list::SelectableList;
pub use now_playing::NowPlaying;
pub use spinner::Spinner;
