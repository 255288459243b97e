//! # pdbscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the pdbscope library. Import this module to get quick access
//! to the essential types for reading managed PDB debug symbols.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pdbscope operations
pub use crate::Error;

/// The result type used throughout pdbscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for reading a program database
pub use crate::PdbReader;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Reader Results
// ================================================================================================

/// Resolved source locations and async resumption metadata
pub use crate::{
    PrimarySourceLocation, ResolvedSynchronizationInformation, ResolvedSynchronizationPoint,
};

// ================================================================================================
// Symbol Model
// ================================================================================================

/// Metadata token type for referencing method rows
pub use crate::symbols::Token;

/// Functions and their producer extensions
pub use crate::symbols::{
    PdbFunction, PdbIteratorScope, PdbSynchronizationInformation, PdbSynchronizationPoint,
    ProcFlags,
};

/// Lexical scopes and their contents
pub use crate::symbols::{PdbConstant, PdbScope, PdbSlot, PdbValue, SlotFlags};

/// Line information and source files
pub use crate::symbols::{ChecksumKind, PdbLine, PdbLines, PdbSource, PdbSourceDocument};

// ================================================================================================
// Container Layer
// ================================================================================================

/// The multi-stream container
pub use crate::msf::MsfFile;

/// The info stream and the `/names` heap
pub use crate::pdb::{NamesStream, PdbInfo};

// ================================================================================================
// Interning
// ================================================================================================

/// Structural intern factory and its key types
pub use crate::intern::{
    AssemblyIdentity, AssemblyKey, FieldKey, FieldShape, InternFactory, ListKey, MethodKey,
    MethodOwner, MethodShape, ModuleKey, TypeDescription, TypeKey,
};

/// The enum-size guessing game
pub use crate::intern::guess::GuessingGame;

/// Host context and token resolution
pub use crate::host::{HostContext, MapResolver, Name, ObjectHandle, TokenResolver};
