use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier of an imported track, assigned at import.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted metadata for one imported audio file.
///
/// The payload itself lives in the store's media directory under
/// `stored_name`; the record carries identity and play statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: TrackId,
    /// File name the payload is kept under; changes only via rename.
    pub stored_name: String,
    /// Import timestamp, immutable.
    pub date_added: DateTime<Utc>,
    /// Set on each play start.
    pub last_played: Option<DateTime<Utc>>,
    /// Incremented once per play start, not per frame.
    pub play_count: u64,
    /// Last known playback position in seconds, clamped to the payload's
    /// duration; used to resume.
    pub last_position_secs: f64,
}

impl TrackRecord {
    pub fn new(stored_name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            stored_name: stored_name.into(),
            date_added: Utc::now(),
            last_played: None,
            play_count: 0,
            last_position_secs: 0.0,
        }
    }

    /// The stored name minus its extension; derived, never stored.
    pub fn display_name(&self) -> &str {
        match self.stored_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.stored_name,
        }
    }

    /// The stored name's extension, if any.
    pub fn extension(&self) -> Option<&str> {
        match self.stored_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Where the payload lives under the given media directory.
    pub fn path_in(&self, media_dir: &Path) -> PathBuf {
        media_dir.join(&self.stored_name)
    }
}

/// Strip path separators, reserved characters and control characters from a
/// candidate file name, then trim surrounding whitespace.
///
/// An empty result means the name is unusable (`InvalidName` at call sites).
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| {
            !matches!(c, '/' | '\\' | '?' | '%' | '*' | '|' | '"' | '<' | '>') && !c.is_control()
        })
        .collect::<String>()
        .trim()
        .to_string()
}
