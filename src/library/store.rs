use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::config::SortKey;
use crate::error::{Error, Result};

use super::model::{TrackId, TrackRecord, sanitize_file_name};

/// Record file name under the data directory.
pub const RECORDS_FILE: &str = "library.json";
/// Media directory name under the data directory.
pub const MEDIA_DIR: &str = "media";

/// Ordered collection of [`TrackRecord`]s with persistence on every mutation.
///
/// Records are written to `library.json` as JSON; the audio payloads live in
/// the sibling `media/` directory. When the durable layer cannot be set up at
/// startup the store degrades to in-memory operation instead of failing: the
/// session keeps working, nothing survives a restart.
pub struct TrackStore {
    records: Vec<TrackRecord>,
    media_dir: PathBuf,
    records_path: PathBuf,
    sort_key: SortKey,
    persistent: bool,
}

impl TrackStore {
    /// Open (or create) the store rooted at `data_dir`.
    pub fn open(data_dir: &Path, sort_key: SortKey) -> Self {
        let media_dir = data_dir.join(MEDIA_DIR);
        let records_path = data_dir.join(RECORDS_FILE);

        let mut persistent = true;
        if let Err(e) = fs::create_dir_all(&media_dir) {
            warn!(
                "cannot create {:?}, falling back to an in-memory library: {e}",
                media_dir
            );
            persistent = false;
        }

        let records = if persistent && records_path.exists() {
            match read_records(&records_path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "could not read {:?}, starting with an empty library: {e}",
                        records_path
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        info!("opened library with {} tracks", records.len());
        Self {
            records,
            media_dir,
            records_path,
            sort_key,
            persistent,
        }
    }

    /// A store that never touches the record file. Media files are still
    /// resolved against `media_dir`.
    pub fn in_memory(media_dir: impl Into<PathBuf>, sort_key: SortKey) -> Self {
        let media_dir = media_dir.into();
        let records_path = media_dir.join(RECORDS_FILE);
        Self {
            records: Vec::new(),
            media_dir,
            records_path,
            sort_key,
            persistent: false,
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// False when the store degraded to in-memory operation at startup.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &TrackId) -> Option<&TrackRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    pub fn contains_name(&self, stored_name: &str) -> bool {
        self.records.iter().any(|r| r.stored_name == stored_name)
    }

    /// Absolute path of a record's payload.
    pub fn track_path(&self, record: &TrackRecord) -> PathBuf {
        record.path_in(&self.media_dir)
    }

    /// All records ordered by the configured sort key, descending.
    ///
    /// `DateAdded`: most recently imported first. `LastPlayed`: most recently
    /// played first, never-played records last, ties broken by date added.
    pub fn all(&self) -> Vec<&TrackRecord> {
        let mut out: Vec<&TrackRecord> = self.records.iter().collect();
        match self.sort_key {
            SortKey::DateAdded => out.sort_by(|a, b| b.date_added.cmp(&a.date_added)),
            SortKey::LastPlayed => out.sort_by(|a, b| {
                b.last_played
                    .cmp(&a.last_played)
                    .then(b.date_added.cmp(&a.date_added))
            }),
        }
        out
    }

    /// Insert a new record. Fails with `DuplicateName` when the stored name
    /// is already taken.
    pub fn add(&mut self, record: TrackRecord) -> Result<()> {
        if self.contains_name(&record.stored_name) {
            return Err(Error::DuplicateName(record.stored_name));
        }
        self.records.push(record);
        self.persist()
    }

    /// Insert the record, or refresh the existing record holding the same
    /// stored name (the import-overwrite rejoin point). The surviving
    /// record's id is returned; an overwritten payload restarts from
    /// position zero but keeps its identity and play statistics.
    pub fn upsert(&mut self, record: TrackRecord) -> Result<TrackId> {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.stored_name == record.stored_name)
        {
            existing.last_position_secs = 0.0;
            let id = existing.id;
            self.persist()?;
            return Ok(id);
        }
        let id = record.id;
        self.records.push(record);
        self.persist()?;
        Ok(id)
    }

    /// Remove a record and its payload. The evicted record is returned so
    /// the caller can compare it against an active playback session.
    pub fn remove(&mut self, id: &TrackId) -> Result<TrackRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == *id)
            .ok_or(Error::NotFound(*id))?;

        let path = self.records[idx].path_in(&self.media_dir);
        match fs::remove_file(&path) {
            Ok(()) => {}
            // Stale record: the payload is already gone.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let record = self.records.remove(idx);
        self.persist()?;
        Ok(record)
    }

    /// Rename a record and move its payload, as an atomic pair: the on-disk
    /// move must succeed before any record field changes.
    ///
    /// The new name is sanitized and the record's current extension is kept.
    /// Renaming to the unchanged name is a no-op with no filesystem move.
    pub fn rename(&mut self, id: &TrackId, new_name: &str) -> Result<()> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == *id)
            .ok_or(Error::NotFound(*id))?;

        let sanitized = sanitize_file_name(new_name);
        if sanitized.is_empty() {
            return Err(Error::InvalidName);
        }

        let target = match self.records[idx].extension() {
            Some(ext) => format!("{sanitized}.{ext}"),
            None => sanitized,
        };
        if target == self.records[idx].stored_name {
            return Ok(());
        }

        let to = self.media_dir.join(&target);
        let collides = self
            .records
            .iter()
            .enumerate()
            .any(|(i, r)| i != idx && r.stored_name == target);
        if collides || to.exists() {
            return Err(Error::NameExists(target));
        }

        let from = self.records[idx].path_in(&self.media_dir);
        fs::rename(&from, &to).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ResourceNotFound(from.clone()),
            _ => Error::Io(e),
        })?;

        self.records[idx].stored_name = target;
        self.persist()
    }

    /// Update a record's saved playback position, clamped to
    /// `[0, duration_secs]`.
    pub fn save_position(&mut self, id: &TrackId, secs: f64, duration_secs: f64) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or(Error::NotFound(*id))?;
        record.last_position_secs = secs.clamp(0.0, duration_secs.max(0.0));
        self.persist()
    }

    /// Record a play start: bump the play count and stamp `last_played`.
    pub fn mark_played(&mut self, id: &TrackId) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or(Error::NotFound(*id))?;
        record.play_count += 1;
        record.last_played = Some(Utc::now());
        self.persist()
    }

    /// Write the record file. A no-op `Ok` when degraded to in-memory.
    fn persist(&self) -> Result<()> {
        if !self.persistent {
            return Ok(());
        }
        let data = serde_json::to_string_pretty(&self.records)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        // Write through a temp file so a crash mid-write never truncates
        // the record file.
        let tmp = self.records_path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .and_then(|()| fs::rename(&tmp, &self.records_path))
            .map_err(|e| Error::Persistence(e.to_string()))
    }
}

fn read_records(path: &Path) -> Result<Vec<TrackRecord>> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| Error::Persistence(e.to_string()))
}
