//! Playback coordination: the state machine tying the transport to the
//! track store, and the worker thread it runs on.
//!
//! [`Coordinator`] owns all mutable playback state and the store; every
//! mutation happens on the single worker thread spawned by [`Player`], so
//! there are never concurrent writers to a track record. Progress is
//! published through the shared [`SessionHandle`].

mod coordinator;
mod handle;
mod thread;
mod types;

pub use coordinator::Coordinator;
pub use handle::Player;
pub use types::{Direction, PlayerCmd, PlayerState, SessionHandle, SessionInfo};
