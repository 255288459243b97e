//! Low-level byte stream parser for MSF and CodeView decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary
//! data parser designed for reading MSF container structures and the CodeView symbol
//! and line records embedded in PDB module streams. It offers bounds-checked access
//! to binary data with support for little-endian primitives, GUIDs, zero-terminated
//! UTF-8 and UTF-16 strings, and 4-byte record alignment.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor model that maintains a position within
//! a byte slice:
//!
//! - **Position tracking** - Maintains current offset for sequential parsing
//! - **Bounds checking** - All operations validate data availability before reading
//! - **Type-safe reading** - Strongly typed methods for the primitives CodeView uses
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by a byte count
//! - [`crate::file::parser::Parser::align`] - Align to a byte boundary
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a raw byte run
//! - [`crate::file::parser::Parser::read_guid`] - Read a 16-byte GUID
//! - [`crate::file::parser::Parser::read_string_utf8`] - Read zero-terminated UTF-8
//! - [`crate::file::parser::Parser::read_string_utf16`] - Read zero-terminated UTF-16
//!
//! # Usage Examples
//!
//! ```rust
//! use pdbscope::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), pdbscope::Error>(())
//! ```

use uguid::Guid;
use widestring::U16String;

use crate::{
    file::io::{read_le_at, PdbIO},
    Error::OutOfBounds,
    Result,
};

/// A generic binary data parser for reading MSF and CodeView structures.
///
/// `Parser` provides a cursor-based interface for reading binary data in
/// little-endian format. It's designed for parsing the record-oriented layouts
/// found inside PDB files: symbol records framed by length/kind words, C13 line
/// subsections, numeric leaves and embedded strings.
///
/// The parser maintains an internal position cursor and provides bounds checking
/// to prevent buffer overruns when reading malformed or truncated data.
///
/// # Examples
///
/// ```rust
/// use pdbscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// let last = parser.read_le::<u16>()?;
/// assert_eq!(last, 0x0807);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is unread data left.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the unread remainder of the underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Move the cursor to an absolute position.
    ///
    /// Seeking to exactly `len()` is valid and leaves the parser with no
    /// remaining data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(next) if next <= self.data.len() => {
                self.position = next;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Align the cursor to the next multiple of `alignment`.
    ///
    /// CodeView custom-metadata items and C13 subsections are 4-byte aligned;
    /// the cursor stays put when already aligned.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if aligning would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        debug_assert!(alignment.is_power_of_two());

        let rem = self.position % alignment;
        if rem == 0 {
            return Ok(());
        }

        self.advance_by(alignment - rem)
    }

    /// Peek at the byte under the cursor without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Read a primitive value in little-endian byte order and advance the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_le<T: PdbIO>(&mut self) -> Result<T> {
        read_le_at(self.data, &mut self.position)
    }

    /// Borrow `count` raw bytes at the cursor and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        match self.position.checked_add(count) {
            Some(end) if end <= self.data.len() => {
                let bytes = &self.data[self.position..end];
                self.position = end;
                Ok(bytes)
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Read a 16-byte GUID in its on-disk (little-endian field) layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 16 bytes remain.
    pub fn read_guid(&mut self) -> Result<Guid> {
        let bytes: [u8; 16] = self
            .read_bytes(16)?
            .try_into()
            .map_err(|_| OutOfBounds)?;
        Ok(Guid::from_bytes(bytes))
    }

    /// Read a zero-terminated UTF-8 string and advance past the terminator.
    ///
    /// A string that runs to the end of the buffer without a terminator is
    /// accepted; symbol records frequently place the name last.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::Parser;
    ///
    /// let data = b"Hello\0World\0";
    /// let mut parser = Parser::new(data);
    ///
    /// assert_eq!(parser.read_string_utf8()?, "Hello");
    /// assert_eq!(parser.read_string_utf8()?, "World");
    /// # Ok::<(), pdbscope::Error>(())
    /// ```
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let mut end = start;

        while end < self.data.len() && self.data[end] != 0 {
            end += 1;
        }

        let string_data = &self.data[start..end];

        if end < self.data.len() {
            self.position = end + 1;
        } else {
            self.position = end;
        }

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                end,
                e.utf8_error()
            )
        })
    }

    /// Read a zero-terminated UTF-16 string and advance past the terminator.
    ///
    /// OEM records (`"MD2"`, the forward-iterator class name, async method info)
    /// carry their names as UTF-16; unpaired surrogates are replaced rather than
    /// rejected, matching how debuggers treat these strings.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string is cut off mid code unit.
    pub fn read_string_utf16(&mut self) -> Result<String> {
        let mut units = Vec::new();

        loop {
            let unit = self.read_le::<u16>()?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }

        Ok(U16String::from_vec(units).to_string_lossy())
    }
}
