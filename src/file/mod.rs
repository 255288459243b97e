//! PDB file abstraction and low-level binary parsing.
//!
//! This module provides support for reading Windows PDB symbol files. It abstracts over
//! different data sources (files, memory) and provides bounds-checked access to the raw
//! bytes of the MSF container, on top of which the [`crate::msf`] reader reassembles
//! individual streams.
//!
//! # Architecture
//!
//! The module is built around a small set of components:
//!
//! - **File abstraction layer** - Unified interface for PDB byte access
//! - **Backend system** - Pluggable data sources (disk files, memory buffers)
//! - **Parsing infrastructure** - Cursor-based decoding of container structures
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - Main byte-source abstraction for a PDB on disk or in memory
//! - [`crate::file::Backend`] - Trait for different data sources
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Cursor-based decoding of MSF/CodeView structures
//! - [`crate::file::io`] - Endian-aware bounds-checked primitive reads
//!
//! ## Backend Implementations
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::memory::Memory`] - In-memory buffer backend
//!
//! # Examples
//!
//! ```rust,no_run
//! use pdbscope::file::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("tests/samples/Example.pdb"))?;
//! println!("Loaded PDB with {} bytes", file.len());
//!
//! // Peek at the MSF magic
//! let magic = file.data_slice(0, 2)?;
//! assert_eq!(magic, b"Mi");
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Backends are `Send + Sync`; a loaded [`File`] can be shared across threads for
//! concurrent read access.

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{Error::Empty, Result};
use memory::Memory;
use physical::Physical;

pub use physical::Physical as PhysicalBackend;

/// Backend trait for PDB data sources.
///
/// This trait abstracts over the source of PDB bytes, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe. It provides a
/// common interface for accessing the container data regardless of whether it's loaded
/// from a file on disk or from a memory buffer.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// Provides bounds-checked access to the underlying data. Used internally by the
    /// `File` struct to safely read portions of the container.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Represents a loaded PDB byte source.
///
/// This struct wraps a [`Backend`] and provides bounds-checked byte access for the MSF
/// reader. It supports loading from both files and memory buffers, and performs only
/// the emptiness check up front - signature validation belongs to [`crate::msf`],
/// which can report the offending bytes in its error.
///
/// # Examples
///
/// ## Loading from a file
///
/// ```rust,no_run
/// use pdbscope::file::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("tests/samples/Example.pdb"))?;
/// println!("Loaded {} bytes", file.len());
/// # Ok::<(), pdbscope::Error>(())
/// ```
///
/// ## Loading from memory
///
/// ```rust,no_run
/// use pdbscope::file::File;
/// use std::fs;
///
/// let data = fs::read("tests/samples/Example.pdb")?;
/// let file = File::from_mem(data)?;
/// println!("PDB size: {} bytes", file.len());
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("len", &self.len()).finish()
    }
}

impl File {
    /// Loads a PDB file from the given path.
    ///
    /// The file is memory-mapped for efficient access.
    ///
    /// # Arguments
    ///
    /// * `file` - Path to the PDB file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or opened, or if it is empty.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(Box::new(input))
    }

    /// Loads a PDB from a memory buffer.
    ///
    /// Useful when the symbol file arrives embedded in an archive or over the network.
    ///
    /// # Arguments
    ///
    /// * `data` - The bytes of the PDB file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if the buffer is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::load(Box::new(Memory::new(data)))
    }

    fn load(backend: Box<dyn Backend>) -> Result<File> {
        if backend.len() == 0 {
            return Err(Empty);
        }

        Ok(File { data: backend })
    }

    /// Returns a bounds-checked slice of the container data.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the file.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Returns the entire container data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns the total size of the container in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the container holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }
}
