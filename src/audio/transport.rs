use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lofty::file::AudioFile;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::{Error, Result};

use super::sink::create_sink_at;

/// A single decoder/output session.
///
/// Implementations uphold the "at most one concurrent playback" invariant
/// structurally: `open` releases any previous session before starting the
/// next one. `stop` releases the decoder handle, `pause` does not.
/// `position` and `duration` report zero while nothing is open.
pub trait Transport {
    /// Open the audio resource at `path`, replacing any open session.
    /// The new session starts paused at position zero.
    fn open(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop and release the decoder handle.
    fn stop(&mut self);
    /// Seek to an absolute position, clamped to `[0, duration]`.
    fn seek(&mut self, to: Duration) -> Result<()>;
    /// Point the open session at the payload's new location after a rename.
    /// The decoder keeps its handle; only later rebuilds read the new path.
    /// No effect while nothing is open.
    fn relocate(&mut self, path: &Path);
    fn position(&self) -> Duration;
    fn duration(&self) -> Duration;
    fn is_open(&self) -> bool;
    /// Whether the underlying output is actually producing audio right now.
    fn is_playing(&self) -> bool;
    /// Whether the open session has played to the end of its source.
    fn finished(&self) -> bool;
}

/// Wall-clock position bookkeeping for a sink that cannot report its own
/// position: start-instant plus accumulated-while-paused.
pub(super) struct PlayClock {
    started_at: Option<Instant>,
    accumulated: Duration,
    /// First instant the source was observed drained, so an unknown-duration
    /// session stops accruing wall-clock time once playback ends.
    drained_at: Cell<Option<Instant>>,
}

impl PlayClock {
    pub(super) fn new() -> Self {
        Self {
            started_at: None,
            accumulated: Duration::ZERO,
            drained_at: Cell::new(None),
        }
    }

    /// Restart the clock, stopped, at `at` (open or seek).
    pub(super) fn reset_to(&mut self, at: Duration) {
        self.started_at = None;
        self.accumulated = at;
        self.drained_at.set(None);
    }

    pub(super) fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Fold the running span into the accumulator and stop the clock.
    pub(super) fn pause(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
    }

    /// Elapsed play time, bounded by `duration` when it is known. When the
    /// duration is unknown and the source has drained, the reading freezes
    /// at the first drained observation instead of tracking the wall clock.
    pub(super) fn position(&self, duration: Duration, drained: bool) -> Duration {
        let elapsed = |until: Option<Instant>| {
            self.accumulated
                + self.started_at.map_or(Duration::ZERO, |st| match until {
                    Some(t) => t.saturating_duration_since(st),
                    None => st.elapsed(),
                })
        };

        if duration > Duration::ZERO {
            return elapsed(None).min(duration);
        }
        if drained {
            let at = self.drained_at.get().unwrap_or_else(|| {
                let now = Instant::now();
                self.drained_at.set(Some(now));
                now
            });
            return elapsed(Some(at));
        }
        elapsed(None)
    }
}

/// Rodio-backed [`Transport`].
///
/// Position is tracked by a [`PlayClock`], the bookkeeping the sink itself
/// cannot provide; seeking rebuilds the sink and skips into the file.
pub struct RodioTransport {
    stream: OutputStream,
    sink: Option<Sink>,
    path: Option<PathBuf>,
    duration: Duration,
    clock: PlayClock,
    paused: bool,
}

impl RodioTransport {
    /// Open the default output device.
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::AudioOutput(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in
        // debugging, but noisy for an embedding app.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            path: None,
            duration: Duration::ZERO,
            clock: PlayClock::new(),
            paused: true,
        })
    }
}

impl Transport for RodioTransport {
    fn open(&mut self, path: &Path) -> Result<()> {
        // At most one session: release the previous one first.
        self.stop();

        let (sink, decoded_total) = create_sink_at(&self.stream, path, Duration::ZERO)?;
        self.duration = probe_duration(path)
            .or(decoded_total)
            .unwrap_or(Duration::ZERO);
        self.sink = Some(sink);
        self.path = Some(path.to_path_buf());
        self.clock.reset_to(Duration::ZERO);
        self.paused = true;
        Ok(())
    }

    fn play(&mut self) {
        if let Some(s) = &self.sink {
            s.play();
            self.clock.start();
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        if let Some(s) = &self.sink {
            s.pause();
            self.clock.pause();
            self.paused = true;
        }
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.path = None;
        self.duration = Duration::ZERO;
        self.clock.reset_to(Duration::ZERO);
        self.paused = true;
    }

    fn seek(&mut self, to: Duration) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let to = if self.duration > Duration::ZERO {
            to.min(self.duration)
        } else {
            to
        };

        // Scrubbing: rebuild the sink and skip into the file.
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        let (sink, _) = match create_sink_at(&self.stream, &path, to) {
            Ok(built) => built,
            Err(e) => {
                // The file went away mid-session; the transport is closed.
                self.stop();
                return Err(e);
            }
        };
        self.clock.reset_to(to);
        if !self.paused {
            sink.play();
            self.clock.start();
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn relocate(&mut self, path: &Path) {
        if self.sink.is_some() {
            self.path = Some(path.to_path_buf());
        }
    }

    fn position(&self) -> Duration {
        let Some(s) = &self.sink else {
            return Duration::ZERO;
        };
        self.clock.position(self.duration, s.empty())
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map_or(false, |s| !s.is_paused() && !s.empty())
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map_or(false, |s| s.empty())
    }
}

/// Total duration as reported by the container/tag metadata.
pub(crate) fn probe_duration(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
}
