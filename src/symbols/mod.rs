//! In-memory model of the debug information a managed PDB carries.
//!
//! Everything in this module is plain owned data: the DBI parser builds these values
//! while walking module streams, and the [`crate::reader::PdbReader`] hands them out.
//! No type here touches the container format, so the model can be constructed by hand
//! in tests and consumed without a live file.
//!
//! # Architecture
//!
//! A [`function::PdbFunction`] is the unit of the model, keyed by its MethodDef
//! [`token::Token`]. Each function owns:
//!
//! - a tree of [`scope::PdbScope`] lexical regions, holding
//!   [`slot::PdbSlot`] locals and [`constant::PdbConstant`] literals,
//! - [`lines::PdbLines`] blocks mapping IL offsets to source lines, each tied to
//!   an `Arc<`[`lines::PdbSource`]`>`,
//! - iterator and async metadata decoded from OEM records.
//!
//! [`document::PdbSourceDocument`] wraps a source reference with lazy access to the
//! on-disk file, when present.

pub mod constant;
pub mod document;
pub mod function;
pub mod lines;
pub mod scope;
pub mod slot;
pub mod token;

pub use constant::{PdbConstant, PdbValue};
pub use document::PdbSourceDocument;
pub use function::{
    PdbFunction, PdbIteratorScope, PdbSynchronizationInformation, PdbSynchronizationPoint,
    ProcFlags,
};
pub use lines::{ChecksumKind, PdbLine, PdbLines, PdbSource, HIDDEN_LINE, HIDDEN_LINE_ALT};
pub use scope::PdbScope;
pub use slot::{PdbSlot, SlotFlags};
pub use token::Token;
