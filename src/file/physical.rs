//! Physical file backend for memory-mapped I/O.
//!
//! This module provides the [`crate::file::physical::Physical`] backend that implements
//! the [`crate::file::Backend`] trait for accessing PDB files from disk using
//! memory-mapped I/O. This approach provides efficient access to large symbol files
//! without loading the entire content into memory upfront, while still allowing fast
//! random access to any page of the MSF container.
//!
//! # Architecture
//!
//! The physical backend maps files directly into the process's virtual address space:
//!
//! - **Efficient memory usage** - Only touched MSF pages are loaded into physical memory
//! - **Operating system optimization** - Leverages OS-level caching and paging
//! - **Lazy loading** - Pages are loaded on demand as streams are reassembled
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use pdbscope::file::{Physical, Backend};
//! use std::path::Path;
//!
//! let physical = Physical::new(Path::new("assembly.pdb"))?;
//! println!("File size: {} bytes", physical.len());
//!
//! // Read the start of the MSF magic
//! let header = physical.data_slice(0, 9)?;
//! assert_eq!(header, b"Microsoft");
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! # Integration
//!
//! This module integrates with:
//! - [`crate::file`] - Provides the [`crate::file::Backend`] trait implementation
//! - [`crate::file::File`] - Uses the physical backend for file-based parsing
//! - [`crate::msf`] - Reassembles streams out of the mapped pages
//!
//! The physical backend is ideal for production scenarios where PDB files are read
//! from disk; the memory backend covers callers that already hold the bytes.

use super::Backend;
use crate::{
    Error::{Error, FileError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for efficient access to files on disk.
///
/// [`crate::file::physical::Physical`] maps a PDB file directly into the process's
/// virtual address space. The MSF container is page oriented and accessed in a
/// non-sequential pattern while streams are reassembled, which is exactly the access
/// pattern demand paging serves well. All access operations include bounds checking.
///
/// # Examples
///
/// ```rust,ignore
/// use pdbscope::file::{Physical, Backend};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("assembly.pdb"))?;
/// println!("PDB size: {} bytes", physical.len());
/// # Ok::<(), pdbscope::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// The file is mapped read-only and shared; the parser never mutates its input.
    ///
    /// # Arguments
    /// * `path` - Path to the PDB file on disk. Accepts `&Path`, `&str`, `String`, or `PathBuf`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(crate::Error::OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
