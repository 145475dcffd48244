use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tempfile::tempdir;

use crate::config::{ImportCollision, SortKey};
use crate::error::Error;

use super::import::{Importer, PickedFile, ScopedAccess};
use super::model::{TrackRecord, sanitize_file_name};
use super::store::TrackStore;

fn store_with(dir: &std::path::Path, names: &[&str]) -> TrackStore {
    let mut store = TrackStore::open(dir, SortKey::DateAdded);
    for name in names {
        fs::write(store.media_dir().join(name), b"payload").unwrap();
        store.add(TrackRecord::new(*name)).unwrap();
    }
    store
}

#[test]
fn sanitize_strips_separators_and_control_characters() {
    assert_eq!(sanitize_file_name("Track.mp3"), "Track.mp3");
    assert_eq!(sanitize_file_name("a/b\\c.mp3"), "abc.mp3");
    assert_eq!(sanitize_file_name("we?ird%na*me|\"<>.mp3"), "weirdname.mp3");
    assert_eq!(sanitize_file_name("tab\there\n.mp3"), "tabhere.mp3");
    assert_eq!(sanitize_file_name("  padded.mp3  "), "padded.mp3");
    assert_eq!(sanitize_file_name("///"), "");
    assert_eq!(sanitize_file_name("  \n "), "");
}

#[test]
fn display_name_drops_extension_only() {
    assert_eq!(TrackRecord::new("Track.mp3").display_name(), "Track");
    assert_eq!(TrackRecord::new("no-extension").display_name(), "no-extension");
    assert_eq!(TrackRecord::new(".hidden").display_name(), ".hidden");
    assert_eq!(TrackRecord::new("two.dots.mp3").display_name(), "two.dots");
}

#[test]
fn add_rejects_duplicate_stored_name() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);

    let err = store.add(TrackRecord::new("a.mp3")).unwrap_err();
    assert!(matches!(err, Error::DuplicateName(n) if n == "a.mp3"));
    assert_eq!(store.len(), 1);
}

#[test]
fn remove_deletes_payload_and_record() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3", "b.mp3"]);
    let id = store.all()[0].id;
    let path = store.track_path(store.get(&id).unwrap());

    let removed = store.remove(&id).unwrap();
    assert_eq!(removed.id, id);
    assert!(!path.exists());
    assert_eq!(store.len(), 1);
    assert!(store.get(&id).is_none());
}

#[test]
fn remove_tolerates_missing_payload() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);
    let id = store.all()[0].id;
    fs::remove_file(store.media_dir().join("a.mp3")).unwrap();

    assert!(store.remove(&id).is_ok());
    assert!(store.is_empty());
}

#[test]
fn remove_unknown_id_is_not_found() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);
    let err = store.remove(&super::model::TrackId::new()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn rename_moves_payload_then_updates_record() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["Track.mp3"]);
    let id = store.all()[0].id;

    store.rename(&id, "Renamed").unwrap();

    let record = store.get(&id).unwrap();
    assert_eq!(record.stored_name, "Renamed.mp3");
    assert!(store.media_dir().join("Renamed.mp3").exists());
    assert!(!store.media_dir().join("Track.mp3").exists());
}

#[test]
fn rename_to_unchanged_name_is_a_no_op() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["Track.mp3"]);
    let id = store.all()[0].id;

    store.rename(&id, "Track").unwrap();

    assert_eq!(store.get(&id).unwrap().stored_name, "Track.mp3");
    assert!(store.media_dir().join("Track.mp3").exists());
}

#[test]
fn rename_collision_leaves_both_records_and_files_untouched() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3", "b.mp3"]);
    let ids: Vec<_> = store.all().iter().map(|r| r.id).collect();
    let a = ids.iter().find(|id| store.get(id).unwrap().stored_name == "a.mp3").copied().unwrap();

    let err = store.rename(&a, "b").unwrap_err();
    assert!(matches!(err, Error::NameExists(n) if n == "b.mp3"));
    assert_eq!(store.get(&a).unwrap().stored_name, "a.mp3");
    assert!(store.media_dir().join("a.mp3").exists());
    assert!(store.media_dir().join("b.mp3").exists());
}

#[test]
fn rename_sanitizes_and_rejects_empty_names() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);
    let id = store.all()[0].id;

    assert!(matches!(store.rename(&id, "///"), Err(Error::InvalidName)));
    assert!(matches!(store.rename(&id, "   "), Err(Error::InvalidName)));

    store.rename(&id, "cle/an").unwrap();
    assert_eq!(store.get(&id).unwrap().stored_name, "clean.mp3");
}

#[test]
fn all_orders_by_date_added_descending() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let now = Utc::now();
    for (name, age_mins) in [("old.mp3", 30), ("newest.mp3", 0), ("mid.mp3", 10)] {
        let mut record = TrackRecord::new(name);
        record.date_added = now - ChronoDuration::minutes(age_mins);
        store.add(record).unwrap();
    }

    let names: Vec<_> = store.all().iter().map(|r| r.stored_name.clone()).collect();
    assert_eq!(names, vec!["newest.mp3", "mid.mp3", "old.mp3"]);
}

#[test]
fn all_orders_by_last_played_with_never_played_last() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::LastPlayed);
    let now = Utc::now();

    let mut recent = TrackRecord::new("recent.mp3");
    recent.last_played = Some(now);
    let mut stale = TrackRecord::new("stale.mp3");
    stale.last_played = Some(now - ChronoDuration::hours(2));
    let never = TrackRecord::new("never.mp3");

    store.add(stale).unwrap();
    store.add(never).unwrap();
    store.add(recent).unwrap();

    let names: Vec<_> = store.all().iter().map(|r| r.stored_name.clone()).collect();
    assert_eq!(names, vec!["recent.mp3", "stale.mp3", "never.mp3"]);
}

#[test]
fn save_position_clamps_to_duration() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);
    let id = store.all()[0].id;

    store.save_position(&id, 95.0, 60.0).unwrap();
    assert_eq!(store.get(&id).unwrap().last_position_secs, 60.0);

    store.save_position(&id, -3.0, 60.0).unwrap();
    assert_eq!(store.get(&id).unwrap().last_position_secs, 0.0);

    store.save_position(&id, 12.5, 60.0).unwrap();
    assert_eq!(store.get(&id).unwrap().last_position_secs, 12.5);
}

#[test]
fn mark_played_bumps_count_and_timestamp() {
    let dir = tempdir().unwrap();
    let mut store = store_with(dir.path(), &["a.mp3"]);
    let id = store.all()[0].id;

    store.mark_played(&id).unwrap();
    store.mark_played(&id).unwrap();

    let record = store.get(&id).unwrap();
    assert_eq!(record.play_count, 2);
    assert!(record.last_played.is_some());
}

#[test]
fn records_survive_reopen() {
    let dir = tempdir().unwrap();
    let id = {
        let mut store = store_with(dir.path(), &["a.mp3"]);
        let id = store.all()[0].id;
        store.save_position(&id, 42.0, 120.0).unwrap();
        store.mark_played(&id).unwrap();
        id
    };

    let store = TrackStore::open(dir.path(), SortKey::DateAdded);
    assert!(store.is_persistent());
    let record = store.get(&id).unwrap();
    assert_eq!(record.stored_name, "a.mp3");
    assert_eq!(record.last_position_secs, 42.0);
    assert_eq!(record.play_count, 1);
}

#[test]
fn unusable_data_dir_degrades_to_in_memory() {
    let dir = tempdir().unwrap();
    // A file where the data directory should be makes create_dir_all fail.
    let blocker = dir.path().join("blocked");
    fs::write(&blocker, b"").unwrap();

    let mut store = TrackStore::open(&blocker.join("nested"), SortKey::DateAdded);
    assert!(!store.is_persistent());
    // The session still works, just without durability.
    store.add(TrackRecord::new("a.mp3")).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn corrupt_record_file_starts_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(super::store::RECORDS_FILE), b"{ not json").unwrap();

    let store = TrackStore::open(dir.path(), SortKey::DateAdded);
    assert!(store.is_empty());
    assert!(store.is_persistent());
}

struct CountingAccess {
    grant: bool,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScopedAccess for CountingAccess {
    fn acquire(&self) -> bool {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.grant
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn import_copies_bytes_and_inserts_record() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let src = dir.path().join("incoming Song.mp3");
    fs::write(&src, b"mp3 bytes").unwrap();

    let importer = Importer::new(store.media_dir(), ImportCollision::Overwrite);
    let results = importer.import(&mut store, vec![PickedFile::new(&src)]);

    assert_eq!(results.len(), 1);
    let id = results[0].1.as_ref().unwrap();
    let record = store.get(id).unwrap();
    assert_eq!(record.stored_name, "incoming Song.mp3");
    assert_eq!(
        fs::read(store.media_dir().join("incoming Song.mp3")).unwrap(),
        b"mp3 bytes"
    );
}

#[test]
fn import_overwrite_replaces_payload_and_keeps_record_identity() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let importer = Importer::new(store.media_dir(), ImportCollision::Overwrite);

    let src = dir.path().join("song.mp3");
    fs::write(&src, b"first").unwrap();
    let first = importer.import(&mut store, vec![PickedFile::new(&src)]);
    let id = *first[0].1.as_ref().unwrap();
    store.save_position(&id, 30.0, 60.0).unwrap();
    store.mark_played(&id).unwrap();

    fs::write(&src, b"second").unwrap();
    let second = importer.import(&mut store, vec![PickedFile::new(&src)]);
    assert_eq!(*second[0].1.as_ref().unwrap(), id);

    assert_eq!(store.len(), 1);
    let record = store.get(&id).unwrap();
    // Replaced payload restarts from zero, statistics survive.
    assert_eq!(record.last_position_secs, 0.0);
    assert_eq!(record.play_count, 1);
    assert_eq!(fs::read(store.media_dir().join("song.mp3")).unwrap(), b"second");
}

#[test]
fn import_reject_fails_on_collision_without_touching_payload() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let importer = Importer::new(store.media_dir(), ImportCollision::Reject);

    let src = dir.path().join("song.mp3");
    fs::write(&src, b"first").unwrap();
    importer.import(&mut store, vec![PickedFile::new(&src)]);

    fs::write(&src, b"second").unwrap();
    let results = importer.import(&mut store, vec![PickedFile::new(&src)]);
    assert!(matches!(
        results[0].1.as_ref().unwrap_err(),
        Error::DuplicateName(n) if n == "song.mp3"
    ));
    assert_eq!(store.len(), 1);
    assert_eq!(fs::read(store.media_dir().join("song.mp3")).unwrap(), b"first");
}

#[test]
fn import_missing_source_is_resource_not_found() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let importer = Importer::new(store.media_dir(), ImportCollision::Overwrite);

    let results = importer.import(
        &mut store,
        vec![PickedFile::new(dir.path().join("gone.mp3"))],
    );
    assert!(matches!(
        results[0].1.as_ref().unwrap_err(),
        Error::ResourceNotFound(_)
    ));
    assert!(store.is_empty());
}

#[test]
fn import_denied_access_is_reported_and_skips_copy() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let importer = Importer::new(store.media_dir(), ImportCollision::Overwrite);

    let src = dir.path().join("guarded.mp3");
    fs::write(&src, b"bytes").unwrap();
    let acquired = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let picked = PickedFile::with_access(
        &src,
        Box::new(CountingAccess {
            grant: false,
            acquired: acquired.clone(),
            released: released.clone(),
        }),
    );

    let results = importer.import(&mut store, vec![picked]);
    assert!(matches!(
        results[0].1.as_ref().unwrap_err(),
        Error::AccessDenied(_)
    ));
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    // A denied grant is not released.
    assert_eq!(released.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
    assert!(!store.media_dir().join("guarded.mp3").exists());
}

#[test]
fn import_releases_access_after_copy() {
    let dir = tempdir().unwrap();
    let mut store = TrackStore::open(dir.path(), SortKey::DateAdded);
    let importer = Importer::new(store.media_dir(), ImportCollision::Overwrite);

    let src = dir.path().join("guarded.mp3");
    fs::write(&src, b"bytes").unwrap();
    let acquired = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let picked = PickedFile::with_access(
        &src,
        Box::new(CountingAccess {
            grant: true,
            acquired: acquired.clone(),
            released: released.clone(),
        }),
    );

    let results = importer.import(&mut store, vec![picked]);
    assert!(results[0].1.is_ok());
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn stage_rejects_unusable_names() {
    let dir = tempdir().unwrap();
    let importer = Importer::new(dir.path(), ImportCollision::Overwrite);
    let names: HashSet<String> = HashSet::new();

    let err = importer
        .stage(&names, &PickedFile::new("   "))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidName));
}
