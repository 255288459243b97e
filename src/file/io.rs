//! Low-level byte order and safe reading utilities for MSF and CodeView parsing.
//!
//! This module provides endian-aware binary data reading functionality for parsing
//! PDB containers and the CodeView records embedded in them. It implements safe,
//! bounds-checked operations for reading primitive types from byte buffers,
//! preventing buffer overruns while walking untrusted debug data.
//!
//! # Architecture
//!
//! The module is built around the [`crate::file::io::PdbIO`] trait which provides a
//! unified interface for converting primitive types from raw bytes in a type-safe
//! manner. On top of it sit free functions for positional reads:
//!
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset, advancing the offset
//! - [`crate::file::io::write_le_at`] - Write a value at an offset, advancing the offset
//!
//! Everything in a PDB is little-endian; no big-endian readers exist here. The write
//! half is only exercised by the synthetic container builders in the test support
//! module, since the library itself is a strictly read-only consumer.
//!
//! # Examples
//!
//! ```rust,ignore
//! use pdbscope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00];
//! let mut offset = 0;
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! assert_eq!(first, 1);
//! assert_eq!(offset, 2);
//! # Ok::<(), pdbscope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Conversion between primitive types and their little-endian byte representation.
///
/// Implemented for the fixed-width integer types that occur in MSF headers, the DBI
/// stream and CodeView records. All implementations are pure conversions without
/// shared state, so they are safe to use concurrently.
pub trait PdbIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_pdb_io {
    ($($t:ty => $len:literal),* $(,)?) => {
        $(
            impl PdbIO for $t {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$t>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_pdb_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer holds fewer bytes than the type needs.
pub fn read_le<T: PdbIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// Reads from the specified offset and advances the offset by the number of bytes
/// read. Supports all types implementing [`crate::file::io::PdbIO`].
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (advanced after reading)
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes at `offset`.
pub fn read_le_at<T: PdbIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(OutOfBounds);
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Safely writes a value of type `T` in little-endian byte order at a specific offset.
///
/// Only used by the synthetic container builders in tests; the parsing paths never
/// mutate their input.
///
/// # Arguments
///
/// * `data` - The byte buffer to write into
/// * `offset` - Mutable reference to the offset position (advanced after writing)
/// * `value` - The value to encode
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there is insufficient room at `offset`.
pub fn write_le_at<T: PdbIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()>
where
    T::Bytes: AsRef<[u8]>,
{
    let bytes = value.to_le_bytes();
    let type_len = bytes.as_ref().len();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..*offset + type_len].copy_from_slice(bytes.as_ref());
    *offset += type_len;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_le_u16() {
        let data = [0x01, 0x00, 0x02, 0x00];
        let mut offset = 0;

        let first: u16 = read_le_at(&data, &mut offset).unwrap();
        assert_eq!(first, 1);
        assert_eq!(offset, 2);

        let second: u16 = read_le_at(&data, &mut offset).unwrap();
        assert_eq!(second, 2);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_u32_and_u64() {
        let data = [
            0x78, 0x56, 0x34, 0x12, 0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01,
        ];
        let mut offset = 0;

        let word: u32 = read_le_at(&data, &mut offset).unwrap();
        assert_eq!(word, 0x1234_5678);

        let quad: u64 = read_le_at(&data, &mut offset).unwrap();
        assert_eq!(quad, 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn read_le_signed() {
        let data = [0xFF, 0xFF];
        let value: i16 = read_le(&data).unwrap();
        assert_eq!(value, -1);
    }

    #[test]
    fn read_le_out_of_bounds() {
        let data = [0x01, 0x02];
        let mut offset = 1;
        assert!(read_le_at::<u32>(&data, &mut offset).is_err());
        // Offset untouched on failure
        assert_eq!(offset, 1);
    }

    #[test]
    fn write_then_read_round_trip() {
        let mut data = [0u8; 8];
        let mut offset = 0;
        write_le_at(&mut data, &mut offset, 0xDEAD_BEEF_u32).unwrap();
        write_le_at(&mut data, &mut offset, 0x1234_u16).unwrap();

        let mut read_offset = 0;
        assert_eq!(
            read_le_at::<u32>(&data, &mut read_offset).unwrap(),
            0xDEAD_BEEF
        );
        assert_eq!(read_le_at::<u16>(&data, &mut read_offset).unwrap(), 0x1234);
    }

    #[test]
    fn write_out_of_bounds() {
        let mut data = [0u8; 2];
        let mut offset = 0;
        assert!(write_le_at(&mut data, &mut offset, 0xFFFF_FFFF_u32).is_err());
    }
}
