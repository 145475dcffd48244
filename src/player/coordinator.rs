use std::time::Duration;

use tracing::{debug, warn};

use crate::audio::Transport;
use crate::config::{ImportCollision, PlaybackSettings};
use crate::error::{Error, Result};
use crate::library::{TrackId, TrackRecord, TrackStore};

use super::types::{Direction, PlayerCmd, PlayerState, SessionHandle};

/// The playback state machine.
///
/// Owns the track store, the transport and all transient session state.
/// Every method runs on the worker thread (or directly in tests), so store
/// and transport mutations are strictly serialized; a `Select` can never be
/// interleaved with a later one because opens complete synchronously here.
pub struct Coordinator<T: Transport> {
    store: TrackStore,
    transport: T,
    settings: PlaybackSettings,
    session: SessionHandle,

    state: PlayerState,
    current: Option<TrackId>,
    /// Whether the session was playing when the app went to background.
    was_playing: bool,
    /// Position of the last persisted save, the periodic-save watermark.
    last_saved: Duration,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(
        store: TrackStore,
        transport: T,
        settings: PlaybackSettings,
        session: SessionHandle,
    ) -> Self {
        Self {
            store,
            transport,
            settings,
            session,
            state: PlayerState::Idle,
            current: None,
            was_playing: false,
            last_saved: Duration::ZERO,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current(&self) -> Option<TrackId> {
        self.current
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Dispatch one command. Returns false once the worker should stop.
    pub fn handle(&mut self, cmd: PlayerCmd) -> bool {
        match cmd {
            PlayerCmd::Select { id, reply } => {
                let result = self.select(id);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            PlayerCmd::Toggle => self.toggle(),
            PlayerCmd::Skip(secs) => self.skip(secs),
            PlayerCmd::Advance(direction) => self.advance(direction),
            PlayerCmd::Delete { id, reply } => {
                let result = self.delete(id);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            PlayerCmd::Rename {
                id,
                new_name,
                reply,
            } => {
                let result = self.rename(&id, &new_name);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            PlayerCmd::AddRecord { record, reply } => {
                let result = self.add_record(record);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            PlayerCmd::List { reply } => {
                let records: Vec<TrackRecord> =
                    self.store.all().into_iter().cloned().collect();
                let _ = reply.send(records);
            }
            PlayerCmd::EnterBackground => self.enter_background(),
            PlayerCmd::EnterForeground => self.enter_foreground(),
            PlayerCmd::Quit => {
                self.save_current_position();
                self.transport.stop();
                self.state = PlayerState::Idle;
                self.current = None;
                // Final snapshot: observers must not see a live session
                // after the worker is gone.
                self.publish();
                return false;
            }
        }
        self.publish();
        true
    }

    /// Switch playback to the given track.
    ///
    /// The previous track's position is persisted first (best-effort). On
    /// open failure the coordinator keeps its prior logical state and the
    /// failure is surfaced through the session's `last_error`.
    pub fn select(&mut self, id: TrackId) -> Result<()> {
        let Some(record) = self.store.get(&id) else {
            return Err(Error::NotFound(id));
        };
        let path = self.store.track_path(record);
        let resume_secs = record.last_position_secs;

        if self.current != Some(id) {
            self.save_current_position();
        }

        if let Err(e) = self.transport.open(&path) {
            warn!("could not open {:?}: {e}", path);
            self.set_error(format!("playback failed: {e}"));
            return Err(e);
        }

        let duration_secs = self.transport.duration().as_secs_f64();
        // A saved position at or past the end means the track completed
        // last time; start over instead of resuming at the tail.
        let resume_secs = if duration_secs > 0.0 && resume_secs >= duration_secs {
            0.0
        } else {
            resume_secs.max(0.0)
        };
        if resume_secs > 0.0 {
            if let Err(e) = self.transport.seek(Duration::from_secs_f64(resume_secs)) {
                warn!("could not resume {:?} at {resume_secs}s: {e}", path);
            }
        }

        if let Err(e) = self.store.mark_played(&id) {
            warn!("could not record play start: {e}");
        }

        self.current = Some(id);
        self.state = PlayerState::Playing;
        self.last_saved = Duration::from_secs_f64(resume_secs);
        self.clear_error();
        self.transport.play();
        Ok(())
    }

    /// Toggle playing/paused; pausing persists the position. Idle: no-op.
    pub fn toggle(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.save_current_position();
                self.transport.pause();
                self.state = PlayerState::Paused;
            }
            PlayerState::Paused => {
                self.transport.play();
                self.state = PlayerState::Playing;
            }
            PlayerState::Idle => {}
        }
    }

    /// Seek relative to the current position, clamped to the track bounds.
    /// A skip is a deliberate save point: the position persists immediately.
    pub fn skip(&mut self, secs: f64) {
        if self.state == PlayerState::Idle || !self.transport.is_open() {
            return;
        }
        let current = self.transport.position().as_secs_f64();
        let duration = self.transport.duration().as_secs_f64();
        let target = (current + secs).clamp(0.0, duration.max(0.0));
        if let Err(e) = self.transport.seek(Duration::from_secs_f64(target)) {
            warn!("seek failed: {e}");
            return;
        }
        self.save_current_position();
    }

    /// Select the neighboring track in the store's current ordering,
    /// wrapping at both ends. No-op when the store is empty or the current
    /// track is no longer present.
    pub fn advance(&mut self, direction: Direction) {
        let Some(next) = self.neighbor(direction) else {
            return;
        };
        if let Err(e) = self.select(next) {
            warn!("advance failed: {e}");
        }
    }

    /// Remove a track; deleting the active one stops the transport and
    /// returns the coordinator to idle.
    pub fn delete(&mut self, id: TrackId) -> Result<TrackRecord> {
        let record = self.store.remove(&id)?;
        if self.current == Some(id) {
            self.transport.stop();
            self.state = PlayerState::Idle;
            self.current = None;
        }
        Ok(record)
    }

    /// Rename a track. The active session survives: it is keyed by id, the
    /// open decoder handle outlives the payload move, and the transport is
    /// pointed at the new location so later seeks rebuild from the moved
    /// file.
    pub fn rename(&mut self, id: &TrackId, new_name: &str) -> Result<()> {
        self.store.rename(id, new_name)?;
        if self.current == Some(*id) {
            if let Some(record) = self.store.get(id) {
                let path = self.store.track_path(record);
                self.transport.relocate(&path);
            }
        }
        Ok(())
    }

    /// Store a staged import under the configured collision policy.
    pub fn add_record(&mut self, record: TrackRecord) -> Result<TrackId> {
        match self.settings.import_collision {
            ImportCollision::Overwrite => self.store.upsert(record),
            ImportCollision::Reject => {
                let id = record.id;
                self.store.add(record)?;
                Ok(id)
            }
        }
    }

    /// App lost the foreground: persist the position and pause, remembering
    /// whether we were playing so foregrounding can resume.
    pub fn enter_background(&mut self) {
        if self.state == PlayerState::Idle {
            return;
        }
        self.was_playing = self.state == PlayerState::Playing;
        self.save_current_position();
        self.transport.pause();
        self.state = PlayerState::Paused;
    }

    /// App regained the foreground: resume only if configured to and the
    /// session was playing when it went to background.
    pub fn enter_foreground(&mut self) {
        if self.state == PlayerState::Paused
            && self.was_playing
            && self.settings.resume_on_foreground
        {
            self.transport.play();
            self.state = PlayerState::Playing;
        }
        self.was_playing = false;
    }

    /// One progress-notifier tick. Publishes progress, performs the coarse
    /// periodic position save, detects natural completion and reconciles a
    /// transport that stopped underneath us.
    pub fn tick(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }

        if self.transport.finished() {
            self.on_finished();
            self.publish();
            return;
        }

        if !self.transport.is_playing() {
            // Underlying output stopped without us asking (device
            // interruption): reconcile to paused.
            debug!("transport stopped underneath a playing session, pausing");
            self.save_current_position();
            self.transport.pause();
            self.state = PlayerState::Paused;
            self.publish();
            return;
        }

        // Coarse save cadence bounds write amplification; the final pause
        // or stop always writes the exact position regardless of phase.
        let position = self.transport.position();
        let interval = Duration::from_secs(self.settings.position_save_secs);
        if position.saturating_sub(self.last_saved) >= interval {
            self.save_current_position();
        }

        self.publish();
    }

    /// Natural completion: persist the final position as the full duration,
    /// then chain into the next track. If that open fails the coordinator
    /// settles into idle rather than retrying.
    fn on_finished(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        let next = self.neighbor(Direction::Next);

        let duration_secs = self.transport.duration().as_secs_f64();
        if let Err(e) = self.store.save_position(&id, duration_secs, duration_secs) {
            warn!("could not save final position: {e}");
        }
        // The finished session is over; release it before chaining so the
        // next select cannot overwrite the final position we just saved.
        self.transport.stop();

        let advanced = match next {
            Some(next) => self.select(next).is_ok(),
            None => false,
        };
        if !advanced {
            self.transport.stop();
            self.state = PlayerState::Idle;
            self.current = None;
        }
    }

    fn neighbor(&self, direction: Direction) -> Option<TrackId> {
        let order: Vec<TrackId> = self.store.all().iter().map(|r| r.id).collect();
        if order.is_empty() {
            return None;
        }
        let current = self.current?;
        let pos = order.iter().position(|id| *id == current)?;
        let next = match direction {
            Direction::Next => order[(pos + 1) % order.len()],
            Direction::Previous => order[(pos + order.len() - 1) % order.len()],
        };
        Some(next)
    }

    /// Persist the active track's position. Best-effort: a failed write is
    /// logged, losing one position update is acceptable.
    fn save_current_position(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        if !self.transport.is_open() {
            return;
        }
        let position = self.transport.position();
        let duration = self.transport.duration();
        if let Err(e) =
            self.store
                .save_position(&id, position.as_secs_f64(), duration.as_secs_f64())
        {
            warn!("could not save playback position: {e}");
        }
        self.last_saved = position;
    }

    /// Push the current snapshot into the shared session.
    pub fn publish(&self) {
        if let Ok(mut info) = self.session.lock() {
            info.current = self.current;
            info.playing = self.state == PlayerState::Playing;
            info.position = self.transport.position();
            info.duration = self.transport.duration();
            info.progress = if info.duration > Duration::ZERO {
                (info.position.as_secs_f64() / info.duration.as_secs_f64()).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
    }

    fn set_error(&self, message: String) {
        if let Ok(mut info) = self.session.lock() {
            info.last_error = Some(message);
        }
    }

    fn clear_error(&self) {
        if let Ok(mut info) = self.session.lock() {
            info.last_error = None;
        }
    }
}
