use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ConfigError;

/// Get the config file path (~/.config/bohemian/config.toml)
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bohemian")
        .join("config.toml")
}

/// Get the saved credentials path (~/.bohemian/credentials)
pub fn credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bohemian")
        .join("credentials")
}

/// Log file used while the terminal UI owns the screen (~/.bohemian/bohemian.log)
pub fn log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bohemian")
        .join("bohemian.log")
}

/// Load config from the default path, using defaults when the file is absent
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Account credentials remembered between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

pub fn load_credentials() -> Result<Credentials, ConfigError> {
    load_credentials_from(&credentials_path())
}

pub fn load_credentials_from(path: &Path) -> Result<Credentials, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::CredentialsNotFound)
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content).map_err(|e| ConfigError::InvalidCredentials(e.to_string()))
}

pub fn save_credentials(credentials: &Credentials) -> Result<(), ConfigError> {
    save_credentials_to(&credentials_path(), credentials)
}

/// Save credentials with secure permissions
pub fn save_credentials_to(path: &Path, credentials: &Credentials) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string(credentials)
        .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;

    fs::write(path, content)?;

    // Set secure permissions (0600) on Unix
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

pub fn delete_credentials() -> Result<(), ConfigError> {
    delete_credentials_at(&credentials_path())
}

/// Remove saved credentials; a missing file is not an error
pub fn delete_credentials_at(path: &Path) -> Result<(), ConfigError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
