use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::audio::{RodioTransport, Transport};
use crate::config::{ImportCollision, Settings};
use crate::error::{Error, Result};
use crate::library::{Importer, PickedFile, TrackId, TrackRecord, TrackStore};

use super::thread::spawn_player_thread;
use super::types::{Direction, PlayerCmd, SessionHandle};

/// Handle to the running player worker.
///
/// Cheap to share by reference; commands are serialized onto the worker
/// thread. Mutating operations that the caller needs an answer for block on
/// a reply channel, everything else is fire-and-forget.
pub struct Player {
    tx: Sender<PlayerCmd>,
    session: SessionHandle,
    media_dir: PathBuf,
    collision: ImportCollision,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Spawn the worker with an explicit store and transport factory.
    ///
    /// The factory runs on the worker thread; construction failure (for
    /// example, no audio output device) is returned here.
    pub fn new<T, F>(store: TrackStore, make_transport: F, settings: &Settings) -> Result<Self>
    where
        T: Transport + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let media_dir = store.media_dir().to_path_buf();
        let collision = settings.playback.import_collision;
        let session: SessionHandle = Arc::default();

        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let join = spawn_player_thread(
            store,
            make_transport,
            settings.playback.clone(),
            session.clone(),
            rx,
            ready_tx,
        );
        ready_rx.recv().map_err(|_| Error::ChannelClosed)??;

        Ok(Self {
            tx,
            session,
            media_dir,
            collision,
            join: Mutex::new(Some(join)),
        })
    }

    /// Open the store at the configured data directory and spawn the worker
    /// with the default rodio transport.
    pub fn open(settings: &Settings) -> Result<Self> {
        let data_dir = settings.resolved_data_dir()?;
        let store = TrackStore::open(&data_dir, settings.playback.sort_key);
        Self::new(store, RodioTransport::new, settings)
    }

    /// Shared snapshot of the playback session, updated by the worker.
    pub fn session_handle(&self) -> SessionHandle {
        self.session.clone()
    }

    pub fn send(&self, cmd: PlayerCmd) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::ChannelClosed)
    }

    /// Select a track for playback, waiting for the open to complete.
    pub fn select(&self, id: TrackId) -> Result<()> {
        let (reply, rx) = mpsc::channel();
        self.send(PlayerCmd::Select {
            id,
            reply: Some(reply),
        })?;
        rx.recv().map_err(|_| Error::ChannelClosed)?
    }

    pub fn toggle(&self) -> Result<()> {
        self.send(PlayerCmd::Toggle)
    }

    pub fn skip(&self, secs: f64) -> Result<()> {
        self.send(PlayerCmd::Skip(secs))
    }

    pub fn next(&self) -> Result<()> {
        self.send(PlayerCmd::Advance(Direction::Next))
    }

    pub fn previous(&self) -> Result<()> {
        self.send(PlayerCmd::Advance(Direction::Previous))
    }

    pub fn delete(&self, id: TrackId) -> Result<TrackRecord> {
        let (reply, rx) = mpsc::channel();
        self.send(PlayerCmd::Delete {
            id,
            reply: Some(reply),
        })?;
        rx.recv().map_err(|_| Error::ChannelClosed)?
    }

    pub fn rename(&self, id: TrackId, new_name: &str) -> Result<()> {
        let (reply, rx) = mpsc::channel();
        self.send(PlayerCmd::Rename {
            id,
            new_name: new_name.to_string(),
            reply: Some(reply),
        })?;
        rx.recv().map_err(|_| Error::ChannelClosed)?
    }

    /// All records in the store's current ordering.
    pub fn tracks(&self) -> Result<Vec<TrackRecord>> {
        let (reply, rx) = mpsc::channel();
        self.send(PlayerCmd::List { reply })?;
        rx.recv().map_err(|_| Error::ChannelClosed)
    }

    /// Import picked files: the blocking copies run on the caller's thread,
    /// then each finished record rejoins the worker, where the store
    /// mutation appears atomic. One result per picked file.
    pub fn import(&self, picked: Vec<PickedFile>) -> Result<Vec<(PathBuf, Result<TrackId>)>> {
        let mut names: HashSet<String> = self
            .tracks()?
            .into_iter()
            .map(|r| r.stored_name)
            .collect();
        let importer = Importer::new(&self.media_dir, self.collision);

        let mut out = Vec::with_capacity(picked.len());
        for file in picked {
            let location = file.location.clone();
            let result = importer.stage(&names, &file).and_then(|record| {
                names.insert(record.stored_name.clone());
                let (reply, rx) = mpsc::channel();
                self.send(PlayerCmd::AddRecord {
                    record,
                    reply: Some(reply),
                })?;
                rx.recv().map_err(|_| Error::ChannelClosed)?
            });
            out.push((location, result));
        }
        Ok(out)
    }

    pub fn enter_background(&self) -> Result<()> {
        self.send(PlayerCmd::EnterBackground)
    }

    pub fn enter_foreground(&self) -> Result<()> {
        self.send(PlayerCmd::EnterForeground)
    }

    /// Persist state, stop the transport and join the worker.
    pub fn quit(&self) {
        let _ = self.send(PlayerCmd::Quit);
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
