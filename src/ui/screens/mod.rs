mod error;
mod login;
mod menu;
mod results;
mod search;

pub use error::ErrorScreen;
pub use login::{LoginAction, LoginScreen};
pub use menu::{MenuAction, MenuItem, MenuScreen};
pub use results::{ResultsAction, ResultsKind, ResultsScreen};
pub use search::{SearchAction, SearchScreen};
