use std::{env, path::PathBuf};

use crate::error::{Error, Result};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `LISTEN__`),
/// then an optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("LISTEN")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().map_err(|e| Error::Config(e.to_string()))?;
        let settings: Settings = cfg
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<()> {
        if self.playback.progress_tick_ms == 0 {
            return Err(Error::Config(
                "playback.progress_tick_ms must be >= 1".to_string(),
            ));
        }
        if self.playback.position_save_secs == 0 {
            return Err(Error::Config(
                "playback.position_save_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The data directory to use: configured value or the XDG default.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(default_data_dir)
            .ok_or_else(|| Error::Config("no data directory could be resolved".to_string()))
    }
}

/// Resolve the config path from `LISTEN_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("LISTEN_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/listen/config.toml`
/// or `~/.config/listen/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".config"))
    } else {
        None
    };

    config_home.map(|d| d.join("listen").join("config.toml"))
}

/// Compute the default data directory under `$XDG_DATA_HOME/listen` or
/// `~/.local/share/listen` when `XDG_DATA_HOME` is not set.
pub fn default_data_dir() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".local").join("share"))
    } else {
        None
    };

    data_home.map(|d| d.join("listen"))
}
