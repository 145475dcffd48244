use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::ImportCollision;
use crate::error::{Error, Result};

use super::model::{TrackId, TrackRecord, sanitize_file_name};
use super::store::TrackStore;

/// Security-scoped access token handed out by the host's file picker.
///
/// `acquire` must succeed before the picked location may be read; `release`
/// is called once the copy is done (or failed). Plain filesystem paths don't
/// need one.
pub trait ScopedAccess: Send {
    fn acquire(&self) -> bool;
    fn release(&self);
}

/// One source location yielded by the file-picker collaborator.
pub struct PickedFile {
    pub location: PathBuf,
    pub access: Option<Box<dyn ScopedAccess>>,
}

impl PickedFile {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            access: None,
        }
    }

    pub fn with_access(location: impl Into<PathBuf>, access: Box<dyn ScopedAccess>) -> Self {
        Self {
            location: location.into(),
            access: Some(access),
        }
    }
}

/// Copies picked files byte-for-byte into the media directory and builds
/// their records.
///
/// The filesystem half (`stage`) is deliberately separate from the store
/// mutation so callers can run the blocking copy off the player thread and
/// rejoin with the finished record.
pub struct Importer {
    media_dir: PathBuf,
    collision: ImportCollision,
}

impl Importer {
    pub fn new(media_dir: impl Into<PathBuf>, collision: ImportCollision) -> Self {
        Self {
            media_dir: media_dir.into(),
            collision,
        }
    }

    /// Copy one picked file into the media directory and build its record.
    ///
    /// `existing_names` are the stored names already taken; under the
    /// `Reject` policy a collision fails with `DuplicateName` before any
    /// bytes move. The returned record still has to be handed to the store
    /// (or the running player) to become visible.
    pub fn stage(&self, existing_names: &HashSet<String>, picked: &PickedFile) -> Result<TrackRecord> {
        let file_name = picked
            .location
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(Error::InvalidName)?;
        let stored_name = sanitize_file_name(file_name);
        if stored_name.is_empty() {
            return Err(Error::InvalidName);
        }

        if self.collision == ImportCollision::Reject && existing_names.contains(&stored_name) {
            return Err(Error::DuplicateName(stored_name));
        }

        if let Some(access) = &picked.access {
            if !access.acquire() {
                return Err(Error::AccessDenied(picked.location.clone()));
            }
        }

        let dest = self.media_dir.join(&stored_name);
        let copied = fs::copy(&picked.location, &dest).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ResourceNotFound(picked.location.clone()),
            ErrorKind::PermissionDenied => Error::AccessDenied(picked.location.clone()),
            _ => Error::Io(e),
        });

        if let Some(access) = &picked.access {
            access.release();
        }
        copied?;

        Ok(TrackRecord::new(stored_name))
    }

    /// Import a batch directly into a store, one result per picked file.
    ///
    /// Failures are per-file: a bad pick is reported and the rest of the
    /// batch proceeds.
    pub fn import(
        &self,
        store: &mut TrackStore,
        picked: Vec<PickedFile>,
    ) -> Vec<(PathBuf, Result<TrackId>)> {
        let mut out = Vec::with_capacity(picked.len());
        for file in picked {
            let location = file.location.clone();
            let names: HashSet<String> = store
                .all()
                .iter()
                .map(|r| r.stored_name.clone())
                .collect();
            let result = self.stage(&names, &file).and_then(|record| {
                match self.collision {
                    ImportCollision::Overwrite => store.upsert(record),
                    ImportCollision::Reject => {
                        let id = record.id;
                        store.add(record)?;
                        Ok(id)
                    }
                }
            });
            if let Err(e) = &result {
                warn!("import of {:?} failed: {e}", location);
            }
            out.push((location, result));
        }
        out
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }
}
