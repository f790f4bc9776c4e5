mod loader;
mod schema;

pub use loader::{
    delete_credentials, load_config, load_credentials, log_path, save_credentials, Credentials,
};
pub use schema::{Config, PlaybackConfig, PlayerConfig, StreamingConfig};
