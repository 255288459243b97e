//! Source files and IL-offset→line mappings.
//!
//! A function's line information arrives as one or more blocks, each tied to a single
//! source file and holding an offset-sorted run of line records. The sort order is a
//! producer guarantee that this module leans on: lookups are a binary search over the
//! offsets, so the whole resolution path is `O(log n)` per block.
//!
//! # Key Components
//!
//! - [`PdbSource`] - A source file reference: name, language/vendor/document GUIDs, checksum
//! - [`PdbLine`] - One IL offset mapped to a start/end line and column range
//! - [`PdbLines`] - A block of [`PdbLine`] records for one source file
//! - [`ChecksumKind`] - The hash algorithm recorded for a source file
//!
//! # Hidden lines
//!
//! Compilers mark compiler-generated code with the magic line numbers `0xFEEFEE` and
//! `0xF00F00`; such records participate in lookups like any other (the consumer decides
//! how to treat them), but [`PdbLine::is_hidden`] exposes the convention.

use std::sync::Arc;

use uguid::Guid;

/// The hash algorithm a producer recorded for a source file in the C13
/// file-checksum subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// No checksum recorded
    None,
    /// MD5 (16 bytes)
    Md5,
    /// SHA-1 (20 bytes)
    Sha1,
    /// SHA-256 (32 bytes)
    Sha256,
}

impl ChecksumKind {
    /// Map the raw C13 checksum-kind byte onto the known algorithms.
    ///
    /// Unknown values degrade to `None` rather than failing the parse; the
    /// checksum is advisory data.
    #[must_use]
    pub fn from_raw(raw: u8) -> ChecksumKind {
        match raw {
            1 => ChecksumKind::Md5,
            2 => ChecksumKind::Sha1,
            3 => ChecksumKind::Sha256,
            _ => ChecksumKind::None,
        }
    }
}

/// A source file referenced by line information.
///
/// Identity for document-cache purposes is the file name; two blocks naming the same
/// file share one `Arc<PdbSource>` instance after module parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbSource {
    /// File name as recorded by the producer (usually an absolute Windows path)
    pub name: String,
    /// Source language GUID (C#, VB, F#, ...)
    pub language: Guid,
    /// Language vendor GUID
    pub vendor: Guid,
    /// Document type GUID (text)
    pub doc_type: Guid,
    /// Hash algorithm of `checksum`
    pub checksum_kind: ChecksumKind,
    /// Hash of the file contents at compile time
    pub checksum: Vec<u8>,
}

/// Line number a compiler emits for code that has no user-visible source.
pub const HIDDEN_LINE: u32 = 0xFEEFEE;
/// Alternate hidden-line marker used by older producers.
pub const HIDDEN_LINE_ALT: u32 = 0xF00F00;

/// One line record: an IL offset mapped to a source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdbLine {
    /// Offset in the method's IL stream
    pub offset: u32,
    /// Starting line in the source file
    pub line_begin: u32,
    /// Starting column in the source file
    pub col_begin: u16,
    /// Ending line in the source file
    pub line_end: u32,
    /// Ending column in the source file
    pub col_end: u16,
}

impl PdbLine {
    /// True for the compiler-generated markers `0xFEEFEE` / `0xF00F00`.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.line_begin == HIDDEN_LINE || self.line_begin == HIDDEN_LINE_ALT
    }
}

/// A block of line records tied to one source file.
///
/// Invariant: `lines` is sorted by `offset` in non-decreasing order. The DBI parser
/// emits records in producer order, which satisfies this; [`PdbLines::find`] depends
/// on it.
#[derive(Debug, Clone)]
pub struct PdbLines {
    /// The source file all records in this block map into
    pub source: Arc<PdbSource>,
    /// Offset-sorted line records
    pub lines: Vec<PdbLine>,
}

impl PdbLines {
    /// Create an empty block for `source`.
    #[must_use]
    pub fn new(source: Arc<PdbSource>) -> Self {
        PdbLines {
            source,
            lines: Vec::new(),
        }
    }

    /// Find the line record covering `offset`.
    ///
    /// With `exact` set, only a record whose offset equals the query matches.
    /// Otherwise the record with the greatest offset `<= offset` is returned -
    /// `None` when the query lies below the first record's offset.
    ///
    /// When several records share the same offset the first of them wins,
    /// matching producer emission order.
    #[must_use]
    pub fn find(&self, offset: u32, exact: bool) -> Option<&PdbLine> {
        let upper = self.lines.partition_point(|line| line.offset <= offset);
        if upper == 0 {
            return None;
        }

        // Step back over duplicates to the first record at this offset.
        let candidate_offset = self.lines[upper - 1].offset;
        let first = self.lines[..upper - 1]
            .iter()
            .rposition(|line| line.offset != candidate_offset)
            .map_or(0, |i| i + 1);

        let line = &self.lines[first];
        if exact && line.offset != offset {
            return None;
        }

        Some(line)
    }
}
