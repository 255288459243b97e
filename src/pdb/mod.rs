//! PDB info stream and `/names` string table.
//!
//! This module parses the two container-level streams that sit between the raw MSF
//! directory and the DBI module data:
//!
//! - **Stream 1, the PDB info stream** - carries the version, timestamp signature, age
//!   and GUID identifying the symbol file, followed by the serialized name→stream-index
//!   hash table that maps named streams (notably `/names`) to their directory slots.
//! - **The `/names` string stream** - a flat, offset-addressed string heap referenced by
//!   the C13 file-checksum subsection to resolve source file names.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdbscope::pdb::{PdbInfo, NamesStream};
//!
//! let info = PdbInfo::parse(&msf.stream(1)?)?;
//! let names_index = info.named_stream("/names").unwrap();
//! let names = NamesStream::parse(&msf.stream(names_index)?)?;
//! ```
//!
//! # Reference
//!
//! - Microsoft PDB info stream and serialized name-map layout

use std::collections::HashMap;

use uguid::Guid;

use crate::{
    file::{io::read_le_at, parser::Parser},
    Result,
};

/// Magic signature of the `/names` string stream.
const NAMES_SIGNATURE: u32 = 0xEFFE_EFFE;

/// The parsed PDB info stream: identity fields plus the named-stream map.
///
/// The identity triple (signature, age, GUID) is what debuggers use to match a PDB
/// against its binary; it is surfaced on [`crate::PdbReader`] for diagnostics.
#[derive(Debug)]
pub struct PdbInfo {
    /// Info stream version
    pub version: u32,
    /// Timestamp signature
    pub signature: u32,
    /// Incremented on every rebuild that reuses the PDB
    pub age: u32,
    /// Unique identity of this symbol file
    pub guid: Guid,
    /// Named streams (e.g. `/names`, `srcsrv`) to directory indices
    named_streams: HashMap<String, u32>,
}

impl PdbInfo {
    /// Parse the PDB info stream (stream 1 of the container).
    ///
    /// The named-stream map is a serialized hash table: a string buffer, the
    /// occupied/deleted bit sets and one (name offset, stream index) pair per
    /// occupied slot.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream is cut short or
    /// [`crate::Error::Malformed`] if the string buffer offsets are inconsistent.
    pub fn parse(data: &[u8]) -> Result<PdbInfo> {
        let mut offset = 0;
        let version = read_le_at::<u32>(data, &mut offset)?;
        let signature = read_le_at::<u32>(data, &mut offset)?;
        let age = read_le_at::<u32>(data, &mut offset)?;

        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        let guid = parser.read_guid()?;

        let names_size = parser.read_le::<u32>()? as usize;
        let names_start = parser.pos();
        let names_buffer = parser.read_bytes(names_size)?;

        let entry_count = parser.read_le::<u32>()?;
        let _max = parser.read_le::<u32>()?;

        // Present and deleted bit sets; only their sizes matter for walking the pairs.
        for _ in 0..2 {
            let words = parser.read_le::<u32>()?;
            parser.advance_by(words as usize * 4)?;
        }

        let mut named_streams = HashMap::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let name_offset = parser.read_le::<u32>()? as usize;
            let stream = parser.read_le::<u32>()?;

            if name_offset >= names_buffer.len() {
                return Err(malformed_error!(
                    "Named-stream entry points past the string buffer - {} >= {} (buffer at {})",
                    name_offset,
                    names_buffer.len(),
                    names_start
                ));
            }

            let name = cstr_at(names_buffer, name_offset)?;
            named_streams.insert(name.to_string(), stream);
        }

        Ok(PdbInfo {
            version,
            signature,
            age,
            guid,
            named_streams,
        })
    }

    /// Directory index of a named stream, or `None` if the name is absent.
    #[must_use]
    pub fn named_stream(&self, name: &str) -> Option<u32> {
        self.named_streams.get(name).copied()
    }
}

/// The `/names` string stream: an offset-addressed heap of UTF-8 file names.
///
/// The `Names` object provides helper methods to access the data within this stream
/// and resolve the name offsets recorded by the C13 file-checksum subsection.
///
/// # Examples
///
/// ```rust
/// use pdbscope::pdb::NamesStream;
///
/// let mut data = vec![];
/// data.extend_from_slice(&0xEFFEEFFEu32.to_le_bytes());
/// data.extend_from_slice(&1u32.to_le_bytes());
/// data.extend_from_slice(&8u32.to_le_bytes());
/// data.extend_from_slice(b"\0foo.cs\0");
///
/// let names = NamesStream::parse(&data)?;
/// assert_eq!(names.get(1)?, "foo.cs");
/// # Ok::<(), pdbscope::Error>(())
/// ```
#[derive(Debug)]
pub struct NamesStream {
    /// Stream format version (1 or 2)
    pub version: u32,
    buffer: Vec<u8>,
}

impl NamesStream {
    /// Parse the `/names` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature does not match, the
    /// version is unknown, or the declared buffer exceeds the stream.
    pub fn parse(data: &[u8]) -> Result<NamesStream> {
        let mut offset = 0;
        let signature = read_le_at::<u32>(data, &mut offset)?;
        if signature != NAMES_SIGNATURE {
            return Err(malformed_error!(
                "Invalid /names signature - 0x{:08X} (expected 0x{:08X})",
                signature,
                NAMES_SIGNATURE
            ));
        }

        let version = read_le_at::<u32>(data, &mut offset)?;
        if version != 1 && version != 2 {
            return Err(malformed_error!(
                "Unsupported /names version - {}",
                version
            ));
        }

        let buffer_size = read_le_at::<u32>(data, &mut offset)? as usize;
        if offset + buffer_size > data.len() {
            return Err(malformed_error!(
                "/names buffer of {} bytes exceeds stream of {} bytes",
                buffer_size,
                data.len()
            ));
        }

        Ok(NamesStream {
            version,
            buffer: data[offset..offset + buffer_size].to_vec(),
        })
    }

    /// Resolve the string stored at `offset` inside the heap.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an offset outside the buffer and
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn get(&self, offset: u32) -> Result<&str> {
        cstr_at(&self.buffer, offset as usize)
    }
}

/// Zero-terminated UTF-8 string at `offset` inside `buffer`.
fn cstr_at(buffer: &[u8], offset: usize) -> Result<&str> {
    if offset >= buffer.len() {
        return Err(crate::Error::OutOfBounds);
    }

    let tail = &buffer[offset..];
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    std::str::from_utf8(&tail[..end])
        .map_err(|e| malformed_error!("Invalid UTF-8 name at offset {}: {}", offset, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::pdb::{build_info_stream, build_names_stream};

    #[test]
    fn parse_info_stream() {
        let data = build_info_stream(
            20000404,
            0x5F00_0001,
            7,
            [0x11; 16],
            &[("/names", 5), ("srcsrv", 8)],
        );

        let info = PdbInfo::parse(&data).unwrap();
        assert_eq!(info.version, 20000404);
        assert_eq!(info.signature, 0x5F00_0001);
        assert_eq!(info.age, 7);
        assert_eq!(info.guid.to_bytes(), [0x11; 16]);
        assert_eq!(info.named_stream("/names"), Some(5));
        assert_eq!(info.named_stream("srcsrv"), Some(8));
        assert_eq!(info.named_stream("/src/headerblock"), None);
    }

    #[test]
    fn info_stream_truncated() {
        let data = build_info_stream(20000404, 1, 1, [0; 16], &[("/names", 5)]);
        assert!(PdbInfo::parse(&data[..data.len() - 4]).is_err());
    }

    #[test]
    fn parse_names_stream() {
        let (data, offsets) = build_names_stream(&["first.cs", "second.vb"]);
        let names = NamesStream::parse(&data).unwrap();
        assert_eq!(names.get(offsets[0]).unwrap(), "first.cs");
        assert_eq!(names.get(offsets[1]).unwrap(), "second.vb");
        assert!(names.get(0xFFFF).is_err());
    }

    #[test]
    fn names_stream_bad_signature() {
        let mut data = vec![0u8; 12];
        data[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let err = NamesStream::parse(&data).unwrap_err();
        assert!(err.to_string().contains("/names signature"), "{err}");
    }
}
