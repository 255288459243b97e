// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # pdbscope
//!
//! A cross-platform framework for reading Windows PDB debug symbols of managed
//! .NET assemblies. Built in pure Rust, `pdbscope` parses the MSF container,
//! the DBI module streams and the managed CodeView records inside a PDB and
//! exposes functions, lexical scopes, local slots, constants and IL
//! offset-to-source line mappings without requiring Windows or the .NET
//! runtime.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped file access with minimal allocations
//! - **🔍 Complete symbol model** - Functions, nested scopes, slots, constants, namespaces
//! - **📑 Line information** - C13 subsections resolved down to line and column ranges
//! - **🔧 Cross-platform** - Works on Windows, Linux, macOS, and any Rust-supported platform
//! - **🛡️ Memory safe** - Built in Rust with comprehensive error handling
//! - **🧵 Concurrency ready** - Lock-free lookup structures and a thread-safe intern factory
//!
//! ## Quick Start
//!
//! Add `pdbscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pdbscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust,no_run
//! use pdbscope::prelude::*;
//!
//! // Load and query a program database
//! let reader = PdbReader::from_file("tests/samples/Program.pdb")?;
//! println!("Found {} functions", reader.function_count());
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use pdbscope::{symbols::Token, PdbReader};
//!
//! let reader = PdbReader::from_file("tests/samples/Program.pdb")?;
//!
//! // Map a method token and IL offset to a source location
//! if let Some(location) = reader.resolve_il_offset(Token::new(0x0600_0001), 0x1C, false) {
//!     println!(
//!         "{}:{}:{}",
//!         location.source.name, location.start_line, location.start_column
//!     );
//! }
//!
//! // Walk the lexical scope tree of a method
//! if let Some(function) = reader.function(Token::new(0x0600_0001)) {
//!     for scope in reader.local_scopes(&function) {
//!         println!("scope [{:#x}..{:#x}): {} slots", scope.offset, scope.end(), scope.slots.len());
//!     }
//! }
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `pdbscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`msf`] - The multi-stream container every PDB is wrapped in
//! - [`pdb`] - The info stream (GUID, age, named streams) and the `/names` heap
//! - [`dbi`] - Module streams, managed CodeView records and C13 line sections
//! - [`symbols`] - The in-memory model those records are parsed into
//! - [`PdbReader`] - The high-level query surface over one parsed PDB
//! - [`intern`] - A structural intern factory handing out stable metadata keys
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Reading
//!
//! [`PdbReader`] is the main entry point. Construction parses the container
//! eagerly into an immutable symbol model; every query after that is lock-free
//! or read-only, so a reader can be shared across threads freely.
//!
//! ### Interning
//!
//! The [`intern`] module is independent of the reader: it assigns small, stable
//! keys to structurally-described metadata entities (assemblies, modules,
//! types, methods, fields) so equal descriptions always produce equal keys. It
//! also hosts the enum-size guessing game used when custom-attribute blobs
//! reference enums whose defining assembly is absent.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with detailed error
//! information:
//!
//! ```rust,no_run
//! use pdbscope::{Error, PdbReader};
//!
//! match PdbReader::from_file("tests/samples/Program.pdb") {
//!     Ok(reader) => println!("Loaded {} functions", reader.function_count()),
//!     Err(Error::NotSupported) => println!("Not an MSF 7.00 container"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the pdbscope library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust,no_run
/// use pdbscope::prelude::*;
///
/// let reader = PdbReader::from_file("tests/samples/Program.pdb")?;
/// println!("GUID {} age {}", reader.guid(), reader.age());
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub mod prelude;

/// The MSF (multi-stream format) container layer.
///
/// Every PDB is an MSF 7.00 container: a paged file carrying numbered streams
/// whose pages need not be contiguous. This module validates the superblock,
/// follows the two-level directory indirection and reassembles streams into
/// contiguous buffers.
///
/// # Key Types
///
/// - [`msf::MsfFile`] - A parsed container with stream extraction
/// - [`msf::MsfHeader`] - The validated superblock fields
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{msf::MsfFile, File};
///
/// let msf = MsfFile::parse(File::from_file("tests/samples/Program.pdb".as_ref())?)?;
/// println!("{} streams", msf.stream_count());
/// let info = msf.stream(1)?;
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub mod msf;

/// The PDB info stream and the `/names` string heap.
///
/// Stream 1 of the container identifies the PDB (version, signature, age,
/// GUID) and carries the named-stream table that maps well-known names such as
/// `/names` to stream indices. The `/names` stream itself is a deduplicated
/// C-string heap which C13 file-checksum entries reference by offset.
///
/// # Key Types
///
/// - [`pdb::PdbInfo`] - Identity fields plus named-stream lookup
/// - [`pdb::NamesStream`] - Offset-addressed string heap access
pub mod pdb;

/// The DBI stream, module symbol streams and C13 line sections.
///
/// The DBI stream (stream 3) lists the modules of the program; each module
/// points at its own symbol stream holding managed CodeView records
/// (`S_GMANPROC`, `S_BLOCK32`, `S_MANSLOT`, ...) followed by the C13 line
/// section. [`dbi::parse_functions`] walks all of it and produces the flat
/// function list the reader indexes.
pub mod dbi;

/// The in-memory symbol model: functions, scopes, slots, constants, lines.
///
/// # Key Components
///
/// - [`symbols::PdbFunction`] - One managed procedure with its scope tree,
///   line blocks and producer extensions (iterator and async information)
/// - [`symbols::PdbScope`] - A lexical block holding slots, constants and
///   namespace imports
/// - [`symbols::PdbLines`] - The IL offset-to-line records of one source file
/// - [`symbols::Token`] - A metadata token tying a procedure to its method row
pub mod symbols;

pub(crate) mod reader;

/// Hosting context shared by intern consumers: name table, platform types,
/// token resolution and the optional global lock.
///
/// # Key Types
///
/// - [`host::HostContext`] - Name interning, platform type handles and the
///   critical section guarding non-reentrant hosts
/// - [`host::TokenResolver`] - Callback mapping metadata tokens to host
///   objects, with [`host::MapResolver`] as a ready-made table-backed one
pub mod host;

/// The structural intern factory and the enum-size guessing game.
///
/// # Key Components
///
/// - [`intern::InternFactory`] - Deduplicating key assignment for assemblies,
///   modules, types, methods, fields and type lists
/// - [`intern::TypeDescription`] - The structural description language keys
///   are computed from
/// - [`intern::guess::GuessingGame`] - Bounded backtracking over unknown enum
///   widths in custom-attribute blobs
pub mod intern;

/// `pdbscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. This is used consistently throughout the crate for all
/// fallible operations.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{PdbReader, Result};
///
/// fn load(path: &str) -> Result<PdbReader> {
///     PdbReader::from_file(path)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pdbscope` Error type
///
/// The main error type for all operations in this crate. Provides detailed
/// error information for container parsing, record decoding and symbol
/// resolution.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{Error, PdbReader};
///
/// match PdbReader::from_file("tests/samples/Program.pdb") {
///     Ok(reader) => println!("Loaded successfully"),
///     Err(Error::NotSupported) => println!("File format not supported"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Main entry point for reading a program database.
///
/// See [`PdbReader`] for loading, token and IL-offset resolution, scope
/// queries and source-document access.
///
/// # Example
///
/// ```rust,no_run
/// use pdbscope::PdbReader;
/// let reader = PdbReader::from_file("tests/samples/Program.pdb")?;
/// println!("Found {} functions", reader.function_count());
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub use reader::{
    PdbReader, PrimarySourceLocation, ResolvedSynchronizationInformation,
    ResolvedSynchronizationPoint,
};

/// Provides access to low-level file and memory parsing utilities.
///
/// The [`Parser`] type is used for decoding CodeView records and container
/// streams.
///
/// # Example
///
/// ```rust
/// use pdbscope::Parser;
/// let data = [0x2A, 0x00, 0x00, 0x00];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_le::<u32>()?, 0x2A);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub use file::{parser::Parser, File};
