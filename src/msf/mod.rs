//! MSF (Multi-Stream Format) container reader.
//!
//! This module defines the [`MsfFile`] struct, which validates the MSF 7.00 superblock
//! and exposes the container's streams by index. A PDB file is an MSF container: a
//! page-oriented virtual filesystem in which every logical stream (PDB info, DBI,
//! per-module symbols, `/names`) is scattered across fixed-size pages. The reader
//! resolves the two-level directory indirection and reassembles any stream into a
//! contiguous buffer.
//!
//! # Overview
//!
//! The superblock at offset 0 carries the magic signature, the page size, the page
//! count and the size of the stream directory. The directory itself is paged: the
//! superblock lists the pages of a pointer table, the pointer table lists the pages of
//! the directory, and the directory finally lists every stream's byte size and page
//! numbers.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdbscope::file::File;
//! use pdbscope::msf::MsfFile;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("tests/samples/Example.pdb"))?;
//! let msf = MsfFile::parse(file)?;
//! println!("Container holds {} streams", msf.stream_count());
//! let dbi = msf.stream(3)?;
//! println!("DBI stream is {} bytes", dbi.len());
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! # References
//!
//! - Microsoft MSF 7.00 superblock and stream directory layout

use crate::{
    file::{io::read_le_at, File},
    Error::OutOfBounds,
    Result,
};

/// The 32-byte magic signature that opens every MSF 7.00 container.
pub const MSF_MAGIC: [u8; 32] = *b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";

/// Smallest page size any real producer emits.
const MIN_PAGE_SIZE: u32 = 512;
/// Largest page size the format allows.
const MAX_PAGE_SIZE: u32 = 0x10000;

/// Stream size value marking a stream as absent from the container.
const NIL_STREAM_SIZE: u32 = 0xFFFF_FFFF;

/// The MSF superblock, the fixed header at offset 0 of every PDB.
///
/// The implemented structure is an approximation and not a 1:1 representation, to
/// allow better use within the framework - the directory-pointer page list that
/// follows the fixed fields on disk lives in [`MsfFile`] instead.
#[derive(Debug, Clone)]
pub struct MsfHeader {
    /// Size of one page in bytes; a power of two between 512 and 65536
    pub page_size: u32,
    /// Page number of the active free-page map
    pub free_page_map: u32,
    /// Total number of pages in the container
    pub pages_used: u32,
    /// Byte size of the stream directory
    pub directory_size: u32,
}

/// One stream's placement inside the container: its byte size and the pages holding it.
///
/// Immutable once parsed; the DBI parser only ever borrows reassembled copies.
#[derive(Debug, Clone)]
pub struct MsfStream {
    /// Declared byte size of the stream
    pub size: u32,
    /// Page numbers holding the stream's content, in order
    pub pages: Vec<u32>,
}

/// A parsed MSF container with a fully resolved stream directory.
///
/// Parsing validates the magic signature, the page geometry and every page index the
/// directory mentions; a well-formed `MsfFile` can therefore reassemble any stream
/// without further bounds failures. The reader is strictly read-only - the source
/// bytes are never mutated.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{file::File, msf::MsfFile};
///
/// let file = File::from_mem(std::fs::read("tests/samples/Example.pdb")?)?;
/// let msf = MsfFile::parse(file)?;
/// for index in 0..msf.stream_count() {
///     println!("stream {}: {} bytes", index, msf.stream_size(index).unwrap_or(0));
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct MsfFile {
    file: File,
    header: MsfHeader,
    streams: Vec<MsfStream>,
}

impl MsfFile {
    /// Parse the superblock and stream directory of an MSF container.
    ///
    /// This is the top-level validation point for "is this actually a PDB": a wrong
    /// magic is the most common real-world failure when a DLL or EXE is handed over
    /// instead of its symbol file, so the error names the offending signature bytes
    /// and calls out a PE header explicitly.
    ///
    /// # Arguments
    /// * `file` - The PDB byte source; consumed and owned by the returned reader
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad signature, invalid page geometry
    /// or a directory referencing pages outside the container, and
    /// [`crate::Error::OutOfBounds`] when fixed structures are cut short.
    pub fn parse(file: File) -> Result<MsfFile> {
        let magic = file.data_slice(0, MSF_MAGIC.len())?;
        if magic != MSF_MAGIC {
            if magic.starts_with(b"MZ") {
                return Err(malformed_error!(
                    "Input starts with a PE header (MZ), not an MSF container - \
                     a DLL/EXE was given instead of its PDB"
                ));
            }
            return Err(malformed_error!(
                "Invalid MSF signature at offset 0 - {:02x?}",
                &magic[..8.min(magic.len())]
            ));
        }

        let header_bytes = file.data_slice(MSF_MAGIC.len(), 20)?;
        let mut offset = 0;
        let page_size = read_le_at::<u32>(header_bytes, &mut offset)?;
        let free_page_map = read_le_at::<u32>(header_bytes, &mut offset)?;
        let pages_used = read_le_at::<u32>(header_bytes, &mut offset)?;
        let directory_size = read_le_at::<u32>(header_bytes, &mut offset)?;
        let _reserved = read_le_at::<u32>(header_bytes, &mut offset)?;

        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(malformed_error!(
                "Invalid MSF page size - {} (must be a power of two between {} and {})",
                page_size,
                MIN_PAGE_SIZE,
                MAX_PAGE_SIZE
            ));
        }

        let container_pages = (file.len() / page_size as usize) as u64;
        if u64::from(pages_used) > container_pages {
            return Err(malformed_error!(
                "MSF header declares {} pages but the container only holds {}",
                pages_used,
                container_pages
            ));
        }

        let header = MsfHeader {
            page_size,
            free_page_map,
            pages_used,
            directory_size,
        };

        let streams = Self::parse_directory(&file, &header)?;

        Ok(MsfFile {
            file,
            header,
            streams,
        })
    }

    /// Resolve the two-level directory indirection and parse the stream table.
    fn parse_directory(file: &File, header: &MsfHeader) -> Result<Vec<MsfStream>> {
        let directory_pages = pages_for(header.directory_size, header.page_size);
        let pointer_bytes = directory_pages
            .checked_mul(4)
            .ok_or_else(|| malformed_error!("Directory page count causes integer overflow"))?;
        let pointer_pages = pages_for(pointer_bytes, header.page_size);

        // Pointer-table page list sits right behind the fixed superblock fields.
        let root = file.data_slice(MSF_MAGIC.len() + 20, pointer_pages as usize * 4)?;
        let mut offset = 0;
        let mut pointer_page_list = Vec::with_capacity(pointer_pages as usize);
        for _ in 0..pointer_pages {
            pointer_page_list.push(read_le_at::<u32>(root, &mut offset)?);
        }

        let pointer_table =
            read_pages(file, header, &pointer_page_list, pointer_bytes as usize)?;
        let mut offset = 0;
        let mut directory_page_list = Vec::with_capacity(directory_pages as usize);
        for _ in 0..directory_pages {
            directory_page_list.push(read_le_at::<u32>(
                &pointer_table,
                &mut offset,
            )?);
        }

        let directory = read_pages(
            file,
            header,
            &directory_page_list,
            header.directory_size as usize,
        )?;

        let mut offset = 0;
        let stream_count = read_le_at::<u32>(&directory, &mut offset)?;

        // Directory must at least hold the size table it announces.
        let Some(size_table_end) = (stream_count as usize)
            .checked_mul(4)
            .and_then(|bytes| bytes.checked_add(4))
        else {
            return Err(malformed_error!(
                "Stream count causes integer overflow - {}",
                stream_count
            ));
        };
        if size_table_end > directory.len() {
            return Err(malformed_error!(
                "Directory declares {} streams but is only {} bytes",
                stream_count,
                directory.len()
            ));
        }

        let mut sizes = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            sizes.push(read_le_at::<u32>(&directory, &mut offset)?);
        }

        let mut streams = Vec::with_capacity(stream_count as usize);
        for size in sizes {
            // A nil stream occupies no pages but keeps its directory slot.
            let size = if size == NIL_STREAM_SIZE { 0 } else { size };
            let page_count = pages_for(size, header.page_size);
            let mut pages = Vec::with_capacity(page_count as usize);
            for _ in 0..page_count {
                let page = read_le_at::<u32>(&directory, &mut offset)?;
                if page >= header.pages_used {
                    return Err(malformed_error!(
                        "Stream page {} lies outside the container ({} pages)",
                        page,
                        header.pages_used
                    ));
                }
                pages.push(page);
            }
            streams.push(MsfStream { size, pages });
        }

        Ok(streams)
    }

    /// The parsed superblock fields.
    #[must_use]
    pub fn header(&self) -> &MsfHeader {
        &self.header
    }

    /// Number of streams the directory declares (including nil slots).
    #[must_use]
    pub fn stream_count(&self) -> u32 {
        self.streams.len() as u32
    }

    /// Declared byte size of stream `index`, or `None` for an unknown index.
    #[must_use]
    pub fn stream_size(&self, index: u32) -> Option<u32> {
        self.streams.get(index as usize).map(|s| s.size)
    }

    /// Reassemble stream `index` into a contiguous buffer.
    ///
    /// The result's length always equals the declared stream size; the trailing
    /// partial page is truncated. A nil stream yields an empty buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::StreamNotFound`] for an index outside the directory.
    pub fn stream(&self, index: u32) -> Result<Vec<u8>> {
        let stream = self
            .streams
            .get(index as usize)
            .ok_or(crate::Error::StreamNotFound(index))?;

        read_pages(&self.file, &self.header, &stream.pages, stream.size as usize)
    }

    /// Consume the reader, releasing the underlying byte source.
    #[must_use]
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Number of `page_size` pages needed to hold `bytes`.
fn pages_for(bytes: u32, page_size: u32) -> u32 {
    bytes.div_ceil(page_size)
}

/// Copy `byte_len` bytes out of the listed pages into one contiguous buffer.
fn read_pages(file: &File, header: &MsfHeader, pages: &[u32], byte_len: usize) -> Result<Vec<u8>> {
    let page_size = header.page_size as usize;
    if pages.len() * page_size < byte_len {
        return Err(OutOfBounds);
    }

    let mut out = Vec::with_capacity(byte_len);
    let mut remaining = byte_len;
    for &page in pages {
        let take = remaining.min(page_size);
        let chunk = file.data_slice(page as usize * page_size, take)?;
        out.extend_from_slice(chunk);
        remaining -= take;
        if remaining == 0 {
            break;
        }
    }

    Ok(out)
}
