//! Utilities for creating `rodio` sinks from audio files.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{Error, Result};

/// Create a paused `Sink` for the file at `path` that starts playback at
/// `start_at`, plus the decoder-reported total duration when available.
pub(super) fn create_sink_at(
    handle: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>)> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ResourceNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Decode(path.to_path_buf(), e.to_string()))?;
    let total = source.total_duration();

    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = source.skip_duration(start_at);

    let sink = Sink::connect_new(handle.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}
