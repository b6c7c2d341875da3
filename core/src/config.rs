//! Settings persistence and configuration errors
//!
//! Settings live in the platform config directory under the `foresight`
//! application name (via `confy`). Suppression rules are loaded separately,
//! see [`crate::abnormals::load_rules`].

use std::path::PathBuf;

use foresight_types::Settings;
use thiserror::Error;

const APP_NAME: &str = "foresight";

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Settings store error: {0}")]
    Store(#[from] confy::ConfyError),
}

/// Load persisted settings, falling back to defaults if missing or unreadable.
pub fn load_settings() -> Settings {
    match confy::load(APP_NAME, None) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        }
    }
}

/// Persist settings (e.g. after a debug toggle).
pub fn store_settings(settings: &Settings) -> Result<(), ConfigError> {
    confy::store(APP_NAME, None, settings)?;
    Ok(())
}

/// Path of the persisted settings file, if the platform has a config dir.
pub fn settings_path() -> Option<PathBuf> {
    confy::get_configuration_file_path(APP_NAME, None).ok()
}
