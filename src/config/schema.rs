use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/listen/config.toml` or
/// `~/.config/listen/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `LISTEN__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub playback: PlaybackSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory for imported media copies and the record file.
    ///
    /// Imported payloads land in `<data_dir>/media`, the record file at
    /// `<data_dir>/library.json`. Defaults to `$XDG_DATA_HOME/listen` or
    /// `~/.local/share/listen`.
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Ordering of the track list, which also drives next/previous.
    pub sort_key: SortKey,
    /// What to do when an import's file name is already taken.
    pub import_collision: ImportCollision,
    /// Whether returning to the foreground resumes a session that was
    /// playing when the app was backgrounded.
    pub resume_on_foreground: bool,
    /// Progress sampling cadence (milliseconds).
    pub progress_tick_ms: u64,
    /// Coarse cadence for periodic position saves (seconds of played time).
    pub position_save_secs: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            sort_key: SortKey::DateAdded,
            import_collision: ImportCollision::Overwrite,
            resume_on_foreground: true,
            progress_tick_ms: 200,
            position_save_secs: 5,
        }
    }
}

/// Sort key for the track list: most-recently-imported-first or
/// most-recently-played-first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[serde(alias = "date_added", alias = "added")]
    DateAdded,
    #[serde(alias = "last_played", alias = "played")]
    LastPlayed,
}

/// Policy for an import whose sanitized file name is already stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportCollision {
    /// Last import wins: the payload is replaced and the existing record
    /// keeps its identity and play statistics.
    Overwrite,
    /// The import fails with `DuplicateName`.
    Reject,
}
