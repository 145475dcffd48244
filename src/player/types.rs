//! Player-facing small types and handles.
//!
//! This module defines the command enum sent to the worker thread, the
//! coordinator states and the shared session snapshot observers read.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::library::{TrackId, TrackRecord};

/// Neighbor direction for `advance`, relative to the store's current
/// ordering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Coordinator state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayerState {
    /// No track selected.
    Idle,
    /// A track is loaded, transport paused.
    Paused,
    /// A track is loaded and playing.
    Playing,
}

#[derive(Debug)]
pub enum PlayerCmd {
    /// Select a track: persist the previous position, open, resume, play.
    Select {
        id: TrackId,
        reply: Option<Sender<Result<()>>>,
    },
    /// Toggle between playing and paused; no-op while idle.
    Toggle,
    /// Seek relative to the current position (seconds, either sign).
    Skip(f64),
    /// Move to the neighboring track in the current ordering, wrapping.
    Advance(Direction),
    /// Remove a track and its payload; stops playback if it is active.
    Delete {
        id: TrackId,
        reply: Option<Sender<Result<TrackRecord>>>,
    },
    /// Rename a track (payload move and record update as an atomic pair).
    Rename {
        id: TrackId,
        new_name: String,
        reply: Option<Sender<Result<()>>>,
    },
    /// Rejoin point for a staged import: hand the finished record to the
    /// store under the configured collision policy.
    AddRecord {
        record: TrackRecord,
        reply: Option<Sender<Result<TrackId>>>,
    },
    /// Snapshot of all records in the current ordering.
    List { reply: Sender<Vec<TrackRecord>> },
    /// App moved to background/inactive: persist position and pause.
    EnterBackground,
    /// App returned to foreground: optionally resume.
    EnterForeground,
    /// Persist state and shut the worker down.
    Quit,
}

/// Runtime snapshot of the playback session shared with observers.
///
/// The UI observes this single object; it never holds its own mutable copy
/// of the current track.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    /// Currently selected track, if any.
    pub current: Option<TrackId>,
    /// Whether the coordinator considers playback active.
    pub playing: bool,
    /// Position within the current track.
    pub position: Duration,
    /// Duration of the current track (zero if nothing is open).
    pub duration: Duration,
    /// `position / duration` in `[0, 1]`; 0 when duration is 0.
    pub progress: f64,
    /// Last playback failure surfaced to the UI, if any.
    pub last_error: Option<String>,
}

pub type SessionHandle = Arc<Mutex<SessionInfo>>;
