//! Local variable slots (`S_MANSLOT`).

use bitflags::bitflags;

use crate::symbols::token::Token;

bitflags! {
    /// Attribute bits carried by a managed slot record (`S_MANSLOT`).
    ///
    /// Only two bits matter to consumers: bit 0 hides the slot from variable
    /// enumeration, bit 2 marks compiler-generated state. The remaining bits are
    /// preserved as-is for round-tripping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u16 {
        /// Exclude this slot when enumerating a scope's variables
        const HIDDEN = 0x0001;
        /// Address field is a register number
        const REGISTER = 0x0002;
        /// Slot was synthesized by the compiler (closure captures, state machine fields)
        const COMPILER_GENERATED = 0x0004;
    }
}

/// One local variable slot within a lexical scope.
///
/// The slot index ties the record back to the method's local-variable signature;
/// variable names surface positionally through that index, with the `$VB*` hoisted
/// slots as the documented exception (matched by name instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbSlot {
    /// Index into the method's local-variable signature
    pub index: u32,
    /// Token of the local's type
    pub type_token: Token,
    /// Attribute bits
    pub flags: SlotFlags,
    /// Variable name as recorded by the producer
    pub name: String,
}

impl PdbSlot {
    /// True if this slot must not appear in variable enumeration.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(SlotFlags::HIDDEN)
    }

    /// True for compiler-synthesized slots.
    #[must_use]
    pub fn is_compiler_generated(&self) -> bool {
        self.flags.contains(SlotFlags::COMPILER_GENERATED)
    }
}
