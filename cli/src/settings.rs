//! Optional TOML settings file.
//!
//! ```toml
//! seed = 7
//! player = "ada"
//!
//! [game]
//! inventory_cap = 4
//! spawn_weights = { joker = 2, rank1 = 88, rank2 = 10 }
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tilefuse_core::{ConfigError, GameConfig};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid game config: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub seed: Option<u64>,
    pub player: Option<String>,
    pub game: GameConfig,
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.game.validate()?;
        Ok(settings)
    }

    /// Load `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Settings::from_toml(&text, path)
    }
}
