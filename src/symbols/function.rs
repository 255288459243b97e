//! Managed functions and their producer extensions (iterator and async metadata).

use bitflags::bitflags;

use crate::symbols::{lines::PdbLines, scope::PdbScope, token::Token};

bitflags! {
    /// Procedure flags from a managed procedure record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcFlags: u8 {
        /// Frame pointer present
        const FPO = 0x01;
        /// Interrupt return
        const INTERRUPT = 0x02;
        /// Far return
        const FAR_RETURN = 0x04;
        /// Function never returns
        const NEVER_RETURN = 0x08;
        /// Function not reachable
        const NOT_REACHED = 0x10;
        /// Custom calling convention
        const CUSTOM_CALL = 0x20;
        /// Marked as noinline
        const NO_INLINE = 0x40;
        /// Has debug information for optimized code
        const OPTIMIZED_DEBUG_INFO = 0x80;
    }
}

/// An IL range of an iterator (state machine) local, recorded by the compiler so the
/// debugger can map hoisted state back to the user's variable lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdbIteratorScope {
    /// IL offset where the hoisted local becomes live
    pub offset: u32,
    /// Byte length of the live range
    pub length: u32,
}

/// One await/yield site inside an async method.
///
/// The continuation token references the method the runtime resumes into; it may name
/// a method that is not loaded while the PDB is parsed, which is why resolution is
/// deferred to query time (see `PdbReader::synchronization_information`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdbSynchronizationPoint {
    /// IL offset of the synchronization point
    pub synchronize_offset: u32,
    /// MethodDef token of the continuation method
    pub continuation_token: Token,
    /// IL offset inside the continuation method where execution resumes
    pub continuation_offset: u32,
}

/// Async-method metadata from the async OEM record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbSynchronizationInformation {
    /// MethodDef token of the kickoff method (the user-visible async method)
    pub kickoff_token: Token,
    /// IL offset of the generated catch handler, `u32::MAX` when absent
    pub generated_catch_handler_offset: u32,
    /// Await/yield sites in IL order
    pub synchronization_points: Vec<PdbSynchronizationPoint>,
}

/// Debug information for one managed method.
///
/// Functions are keyed by their MethodDef token; the token is never 0 for a real
/// function (records with a null token are dropped during parsing). The line blocks
/// are kept in producer declaration order, which is also the tie-break order when
/// several blocks could cover the same IL offset.
#[derive(Debug, Clone, Default)]
pub struct PdbFunction {
    /// MethodDef token, the unique key of this function within the PDB
    pub token: Token,
    /// Procedure name as recorded by the producer
    pub name: String,
    /// Byte length of the method's IL stream
    pub length: u32,
    /// Section-relative address of the procedure (segment, offset)
    pub segment: u16,
    /// Offset within `segment`
    pub address: u32,
    /// Procedure flags
    pub flags: ProcFlags,
    /// Line blocks in declaration order, each tied to one source file
    pub lines: Vec<PdbLines>,
    /// Root lexical scope spanning the whole body
    pub root_scope: PdbScope,
    /// Number of `using`/`Imports` directives per scope level (MD2 record)
    pub using_counts: Vec<u16>,
    /// Token of the method whose using directives apply here, for compiler-shared
    /// closure methods; null token when the usings are this method's own
    pub token_of_method_whose_using_info_applies: Token,
    /// Hoisted-local live ranges for iterator methods
    pub iterator_scopes: Vec<PdbIteratorScope>,
    /// Name of the compiler-generated iterator class, empty for non-iterators
    pub iterator_class: String,
    /// Async metadata, present only for async state-machine methods
    pub synchronization_information: Option<PdbSynchronizationInformation>,
}

impl PdbFunction {
    /// True iff the function carries iterator-class metadata.
    #[must_use]
    pub fn is_iterator(&self) -> bool {
        !self.iterator_class.is_empty()
    }

    /// True iff the function carries async synchronization metadata.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.synchronization_information.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterator_detection() {
        let mut function = PdbFunction::default();
        assert!(!function.is_iterator());
        function.iterator_class = "<GetNumbers>d__0".into();
        assert!(function.is_iterator());
    }

    #[test]
    fn async_detection() {
        let mut function = PdbFunction::default();
        assert!(!function.is_async());
        function.synchronization_information = Some(PdbSynchronizationInformation {
            kickoff_token: Token::new(0x0600_0010),
            generated_catch_handler_offset: u32::MAX,
            synchronization_points: vec![],
        });
        assert!(function.is_async());
    }
}
