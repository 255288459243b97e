//! Lazy access to the on-disk source files a PDB references.
//!
//! A [`PdbSourceDocument`] pairs a source reference with the file behind its
//! recorded path, when that file exists on the local machine. Access degrades
//! gracefully: a missing or moved file yields empty text, never an error, and
//! checksum verification answers `None` when the recorded kind cannot be
//! recomputed.

use std::{
    fs,
    io::{Read, Seek, SeekFrom},
    path::Path,
    sync::{Arc, Mutex},
};

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::symbols::lines::{ChecksumKind, PdbSource};

/// A lazily constructed wrapper around a [`PdbSource`] that can load source text.
///
/// Documents are created on the first resolution request touching a source file and
/// cached by the owning reader, keyed on the source's identity. Creation never fails:
/// when the recorded path does not exist on this machine (the usual case when
/// converting symbols away from the build host) the document simply carries no open
/// handle and [`text`](PdbSourceDocument::text) returns empty.
///
/// The open handle, when present, lives until the owning reader is closed. Dropping
/// the reader without closing it leaks the handle until process exit - an accepted
/// contract for a short-lived conversion tool, preserved here for API compatibility.
#[derive(Debug)]
pub struct PdbSourceDocument {
    source: Arc<PdbSource>,
    handle: Mutex<Option<fs::File>>,
}

impl PdbSourceDocument {
    /// Create a document for `source`, probing the recorded path.
    #[must_use]
    pub fn new(source: Arc<PdbSource>) -> Self {
        let handle = fs::File::open(Path::new(&source.name)).ok();
        PdbSourceDocument {
            source,
            handle: Mutex::new(handle),
        }
    }

    /// The source file this document wraps.
    #[must_use]
    pub fn source(&self) -> &Arc<PdbSource> {
        &self.source
    }

    /// File name as recorded by the producer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.source.name
    }

    /// True when the recorded path was present and could be opened.
    #[must_use]
    pub fn has_text(&self) -> bool {
        lock!(self.handle).is_some()
    }

    /// Load the document's literal source text.
    ///
    /// Degrades gracefully: a missing file, a closed document or an unreadable
    /// file all yield an empty string rather than an error.
    #[must_use]
    pub fn text(&self) -> String {
        let mut guard = lock!(self.handle);
        let Some(file) = guard.as_mut() else {
            return String::new();
        };

        if file.seek(SeekFrom::Start(0)).is_err() {
            return String::new();
        }

        let mut text = String::new();
        if file.read_to_string(&mut text).is_err() {
            return String::new();
        }
        text
    }

    /// Verify the on-disk file against the checksum recorded in the PDB.
    ///
    /// Returns `None` when no text is available, no checksum was recorded, or the
    /// recorded algorithm is not one this crate computes (SHA-256).
    #[must_use]
    pub fn verify_checksum(&self) -> Option<bool> {
        if self.source.checksum.is_empty() {
            return None;
        }

        let mut guard = lock!(self.handle);
        let file = guard.as_mut()?;
        if file.seek(SeekFrom::Start(0)).is_err() {
            return None;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).ok()?;

        let digest: Vec<u8> = match self.source.checksum_kind {
            ChecksumKind::Md5 => Md5::digest(&contents).to_vec(),
            ChecksumKind::Sha1 => Sha1::digest(&contents).to_vec(),
            ChecksumKind::Sha256 | ChecksumKind::None => return None,
        };

        Some(digest == self.source.checksum)
    }

    /// Release the open file handle, if any.
    ///
    /// Subsequent [`text`](PdbSourceDocument::text) calls return empty.
    pub fn close(&self) {
        lock!(self.handle).take();
    }
}
