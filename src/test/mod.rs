//! Shared test helpers: synthetic container and record builders.
//!
//! Everything here exists so unit tests can assemble byte-exact MSF containers,
//! info/names streams, CodeView symbol records and C13 line sections without
//! shipping binary fixtures. The builders mirror the on-disk layouts the parsers
//! consume; they are compiled only for tests.


use std::sync::Arc;

use uguid::Guid;

use crate::symbols::lines::{ChecksumKind, PdbSource};

/// A bare source-file reference with no checksum, for model-level tests.
pub fn source(name: &str) -> Arc<PdbSource> {
    Arc::new(PdbSource {
        name: name.to_string(),
        language: Guid::ZERO,
        vendor: Guid::ZERO,
        doc_type: Guid::ZERO,
        checksum_kind: ChecksumKind::None,
        checksum: Vec::new(),
    })
}
