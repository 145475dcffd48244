use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::audio::Transport;
use crate::config::PlaybackSettings;
use crate::error::Result;
use crate::library::TrackStore;

use super::coordinator::Coordinator;
use super::types::{PlayerCmd, SessionHandle};

/// Spawn the player worker thread.
///
/// The transport is constructed *inside* the thread (audio output handles
/// are not `Send` on every platform); `ready` reports whether that
/// succeeded before the command loop starts. The loop waits for commands
/// with a timeout equal to the progress tick, so an idle channel still
/// drives the periodic tick.
pub(super) fn spawn_player_thread<T, F>(
    store: TrackStore,
    make_transport: F,
    settings: PlaybackSettings,
    session: SessionHandle,
    rx: Receiver<PlayerCmd>,
    ready: Sender<Result<()>>,
) -> JoinHandle<()>
where
    T: Transport + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let tick = Duration::from_millis(settings.progress_tick_ms.max(1));

    thread::spawn(move || {
        let transport = match make_transport() {
            Ok(transport) => transport,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let mut coordinator = Coordinator::new(store, transport, settings, session);
        coordinator.publish();
        let _ = ready.send(Ok(()));

        loop {
            match rx.recv_timeout(tick) {
                Ok(cmd) => {
                    if !coordinator.handle(cmd) {
                        debug!("player worker shutting down");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => coordinator.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
