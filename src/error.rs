use thiserror::Error;

use crate::symbols::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while parsing the MSF
/// container, the DBI module streams and the embedded CodeView records of a PDB file,
/// as well as failures of the intern factory. Each variant provides specific context
/// about the failure mode to enable appropriate error handling.
///
/// Recoverable "not found" outcomes (unknown token, missing source file, no line
/// covering an IL offset) are deliberately **not** errors - they are represented as
/// `Option`/empty results by the query APIs, because they are routine while debugging
/// partially optimized or stripped code.
///
/// # Error Categories
///
/// ## Container Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid MSF/DBI/CodeView structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond stream boundaries
/// - [`Error::NotSupported`] - Unsupported container version or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Resolution and Concurrency Errors
/// - [`Error::StreamNotFound`] - A named or indexed stream is absent from the container
/// - [`Error::TokenNotResolved`] - The metadata host could not resolve a token
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{Error, PdbReader};
/// use std::path::Path;
///
/// match PdbReader::from_file(Path::new("assembly.pdb")) {
///     Ok(reader) => {
///         println!("Parsed {} functions", reader.functions().len());
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed PDB: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => {
///         eprintln!("I/O error: {}", io_err);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the container structure is corrupted or doesn't
    /// conform to the MSF/DBI/CodeView layouts. The error includes the source
    /// location where the malformation was detected for debugging purposes, and
    /// the message carries the offending raw values (signature bytes, offsets)
    /// so that "wrong file given" can be told apart from "corrupt PDB".
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    ///
    /// This error occurs when trying to read data beyond the end of a stream
    /// or page. It's a safety check to prevent buffer overruns during parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type or container version is not supported.
    ///
    /// Indicates that the input is not an MSF 7.00 container, or uses DBI/CodeView
    /// features that are not implemented in this library.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    ///
    /// This error occurs when an empty file or buffer is provided where
    /// actual PDB data was expected.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A stream required by the parse is absent from the container.
    ///
    /// The MSF directory declares a fixed set of streams; the PDB info stream,
    /// the DBI stream and the `/names` stream must all be present for managed
    /// debug info to be extracted. The associated value is the missing stream's
    /// index, or the index recorded for a named stream.
    #[error("Stream {0} is not present in the MSF directory")]
    StreamNotFound(u32),

    /// A referenced entity could not be resolved by the metadata host.
    ///
    /// The associated [`Token`] identifies the definition that could not be
    /// resolved. Raised only by host-backed resolution paths; plain model
    /// queries report absence through `Option` instead.
    #[error("Failed to resolve metadata token - {0}")]
    TokenNotResolved(Token),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for
    /// wrapping external failures with additional context.
    #[error("{0}")]
    Error(String),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when trying to acquire a mutex that is in an invalid state.
    #[error("Failed to lock target")]
    LockError,
}
