//! Playback-state and persistence core for a single-user local audio player.
//!
//! `listen` keeps an audio transport's state (current track, position,
//! playing/paused) in sync with a persisted record per imported file, across
//! track switches, deletions, renames and app lifecycle transitions.
//!
//! The pieces, leaves first:
//! - [`library::TrackRecord`] / [`library::TrackStore`]: per-file metadata
//!   (play count, last played, last playback position) kept in an ordered
//!   collection that persists on every mutation.
//! - [`audio::Transport`]: a single decoder/output session at a time;
//!   [`audio::RodioTransport`] is the rodio-backed implementation.
//! - [`player::Coordinator`]: the state machine tying the transport to the
//!   selected record: resume on select, auto-advance on completion,
//!   pause-on-background, stop-on-delete.
//! - [`player::Player`]: owns the worker thread the coordinator runs on and
//!   exposes the command surface; progress is observed through a shared
//!   [`player::SessionHandle`].
//!
//! UI, the system file picker and media-key integration are deliberately out
//! of scope; the picker is modeled as the [`library::PickedFile`] seam.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod player;

pub use error::{Error, Result};
