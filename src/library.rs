//! Track library: record model, ordered persistent store and import.
//!
//! A [`TrackRecord`] is the durable metadata for one imported audio file;
//! the [`TrackStore`] keeps the records ordered and writes them back to disk
//! on every mutation. [`Importer`] copies picked files into the media
//! directory and hands their records to the store.

mod import;
mod model;
mod store;

pub use import::{Importer, PickedFile, ScopedAccess};
pub use model::{TrackId, TrackRecord, sanitize_file_name};
pub use store::{MEDIA_DIR, RECORDS_FILE, TrackStore};

#[cfg(test)]
mod tests;
