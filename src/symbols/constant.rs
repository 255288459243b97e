//! Constants decoded from `S_MANCONSTANT` records.

use crate::symbols::token::Token;

/// A literal constant value decoded from a CodeView numeric leaf.
///
/// Numeric leaves encode small integers inline and larger or typed values behind an
/// `LF_*` marker; this enum is the decoded, owned form. Decimal and variable-length
/// string leaves are carried as raw bytes - converting them is the consumer's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum PdbValue {
    /// Signed integer up to 64 bits (LF_CHAR, LF_SHORT, LF_LONG, LF_QUADWORD or inline)
    Int(i64),
    /// Unsigned integer up to 64 bits (LF_USHORT, LF_ULONG, LF_UQUADWORD)
    UInt(u64),
    /// 32-bit float (LF_REAL32)
    Real32(f32),
    /// 64-bit float (LF_REAL64)
    Real64(f64),
    /// Variable-length string leaf (LF_VARSTRING), raw bytes
    String(Vec<u8>),
    /// Decimal leaf (LF_DECIMAL), raw 16-byte representation
    Decimal([u8; 16]),
}

/// A named constant visible within a lexical scope (`S_MANCONSTANT` / `S_CONSTANT`).
#[derive(Debug, Clone, PartialEq)]
pub struct PdbConstant {
    /// Constant name
    pub name: String,
    /// Token of the defining type
    pub token: Token,
    /// Decoded literal value
    pub value: PdbValue,
}
