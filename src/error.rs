//! Error types for the listen core.
//!
//! Nothing here is fatal to the process: naming and access errors are
//! reported to the initiating caller, open failures abort only the affected
//! selection, and persistence failures during periodic saves are logged and
//! swallowed by the coordinator.

use std::path::PathBuf;

use thiserror::Error;

use crate::library::TrackId;

#[derive(Error, Debug)]
pub enum Error {
    /// The audio payload is missing at its expected path (stale record).
    #[error("file not found: {0:?}")]
    ResourceNotFound(PathBuf),

    /// Unsupported or corrupt audio data.
    #[error("could not decode {0:?}: {1}")]
    Decode(PathBuf, String),

    /// Import would collide with an already stored name.
    #[error("a track named {0:?} already exists")]
    DuplicateName(String),

    /// Rename target collides with another record or an existing file.
    #[error("a file named {0:?} already exists")]
    NameExists(String),

    /// Name is empty after sanitization.
    #[error("not a valid file name")]
    InvalidName,

    /// The durable record store is unavailable or a write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Security-scoped access to a picked file could not be acquired.
    #[error("access denied: {0:?}")]
    AccessDenied(PathBuf),

    /// No record with the given id exists in the store.
    #[error("no track with id {0}")]
    NotFound(TrackId),

    /// No usable audio output device.
    #[error("audio output error: {0}")]
    AudioOutput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The player worker thread is gone.
    #[error("player is no longer running")]
    ChannelClosed,
}

/// Convenience Result type using the listen [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
