//! The lexical scope tree built from block records.

use crate::symbols::{constant::PdbConstant, slot::PdbSlot};

/// A lexical region within a function body, defined by an IL byte range.
///
/// Scopes form a strict tree: the function's root scope spans the whole body, block
/// records open children, and each child's `[offset, offset + length)` range is
/// assumed to lie within its parent's range. That containment is a producer guarantee
/// that is **not** validated here - the reference toolchain trusts it too, and
/// rejecting it would fail files that debuggers accept.
///
/// A scope owns its local slots, named constants and the namespaces imported over its
/// range.
#[derive(Debug, Clone, Default)]
pub struct PdbScope {
    /// IL offset where the scope opens, relative to the function start
    pub offset: u32,
    /// Byte length of the scope's IL range
    pub length: u32,
    /// Local variable slots declared in this scope
    pub slots: Vec<PdbSlot>,
    /// Named constants visible in this scope
    pub constants: Vec<PdbConstant>,
    /// Namespaces imported (`using`/`Imports`) over this scope
    pub used_namespaces: Vec<String>,
    /// Nested child scopes, in declaration order
    pub scopes: Vec<PdbScope>,
}

impl PdbScope {
    /// Create an empty scope covering `[offset, offset + length)`.
    #[must_use]
    pub fn new(offset: u32, length: u32) -> Self {
        PdbScope {
            offset,
            length,
            ..Default::default()
        }
    }

    /// Exclusive end offset of the scope's range.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.length)
    }

    /// Flatten this scope and all descendants into pre-order (parent before children).
    ///
    /// The flat list preserves nesting implicitly through the ranges; callers
    /// reconstruct block structure from offset containment.
    #[must_use]
    pub fn flatten(&self) -> Vec<&PdbScope> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a PdbScope>) {
        out.push(self);
        for child in &self.scopes {
            child.collect(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_flatten() {
        let mut root = PdbScope::new(0, 100);
        let mut outer = PdbScope::new(4, 80);
        outer.scopes.push(PdbScope::new(10, 20));
        outer.scopes.push(PdbScope::new(40, 30));
        root.scopes.push(outer);
        root.scopes.push(PdbScope::new(90, 8));

        let flat = root.flatten();
        let offsets: Vec<u32> = flat.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 4, 10, 40, 90]);
    }

    #[test]
    fn end_saturates() {
        let scope = PdbScope::new(u32::MAX, 16);
        assert_eq!(scope.end(), u32::MAX);
    }
}
