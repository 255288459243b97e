//! The `PdbReader` facade: parse once, query per location.
//!
//! This module ties the container layers together: [`crate::file::File`] supplies the
//! bytes, [`crate::msf::MsfFile`] the streams, [`crate::pdb::PdbInfo`] the identity
//! and the `/names` heap, and [`crate::dbi`] the function model. The reader owns the
//! result and answers the queries a symbol consumer needs while converting or
//! debugging: IL-offset to source line, token to source lines, scope flattening,
//! variable matching and iterator/async metadata.
//!
//! # Architecture
//!
//! - **Function map** - a lock-free ordered map keyed by MethodDef token. Duplicate
//!   tokens in the raw streams overwrite (last write wins), a tolerance for
//!   multiply-emitted records that real producers exhibit.
//! - **Token index** - the token→lines index for token-only resolution is built
//!   lazily on first use and cached for the reader's lifetime.
//! - **Document cache** - [`PdbSourceDocument`] instances are created on first
//!   request per source file and held until [`PdbReader::close`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use pdbscope::{PdbReader, symbols::Token};
//!
//! let reader = PdbReader::from_file("tests/samples/Example.pdb")?;
//! if let Some(location) = reader.resolve_il_offset(Token::new(0x0600_0001), 0x1A, false) {
//!     println!("{}:{}", location.source.name, location.start_line);
//! }
//! reader.close();
//! # Ok::<(), pdbscope::Error>(())
//! ```

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, OnceLock},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use uguid::Guid;

use crate::{
    dbi,
    file::File,
    host::{ObjectHandle, TokenResolver},
    msf::MsfFile,
    pdb::{NamesStream, PdbInfo},
    symbols::{
        PdbFunction, PdbScope, PdbSlot, PdbSource, PdbSourceDocument, Token,
    },
    Result,
};

/// A resolved source location: file plus start/end line and column.
#[derive(Debug, Clone)]
pub struct PrimarySourceLocation {
    /// The source file the location falls in
    pub source: Arc<PdbSource>,
    /// Starting line
    pub start_line: u32,
    /// Starting column
    pub start_column: u16,
    /// Ending line
    pub end_line: u32,
    /// Ending column
    pub end_column: u16,
}

/// [`crate::symbols::PdbSynchronizationInformation`] with its tokens resolved
/// through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSynchronizationPoint {
    /// IL offset of the await/yield site
    pub synchronize_offset: u32,
    /// The continuation method, resolved by the host
    pub continuation: ObjectHandle,
    /// IL offset inside the continuation where execution resumes
    pub continuation_offset: u32,
}

/// Async-method metadata with kickoff and continuation methods resolved.
#[derive(Debug, Clone)]
pub struct ResolvedSynchronizationInformation {
    /// The user-visible async method, resolved by the host
    pub kickoff: ObjectHandle,
    /// IL offset of the generated catch handler, `u32::MAX` when absent
    pub generated_catch_handler_offset: u32,
    /// Await/yield sites in IL order
    pub synchronization_points: Vec<ResolvedSynchronizationPoint>,
}

/// A parsed PDB with the queryable function model.
///
/// Parsing is atomic: either the whole container parses and every module's
/// functions are available, or the constructor fails and nothing is retained.
/// The reader owns the document cache; handles stay open until [`close`]
/// (or process exit when the caller never closes - the documented contract
/// for a short-lived conversion tool).
///
/// [`close`]: PdbReader::close
#[derive(Debug)]
pub struct PdbReader {
    info: PdbInfo,
    functions: SkipMap<Token, Arc<PdbFunction>>,
    token_index: OnceLock<HashMap<Token, Vec<PrimarySourceLocation>>>,
    documents: DashMap<String, Arc<PdbSourceDocument>>,
}

impl PdbReader {
    /// Open and parse a PDB from disk (memory-mapped).
    ///
    /// # Errors
    /// Any fatal parse failure from the container layers; see [`PdbReader::from_mem`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PdbReader> {
        Self::build(File::from_file(path.as_ref())?)
    }

    /// Parse a PDB already held in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for signature/structure violations in
    /// any layer (MSF, info stream, `/names`, DBI, symbol records) and
    /// [`crate::Error::OutOfBounds`] for truncation. No partial model survives a
    /// failure.
    pub fn from_mem(data: Vec<u8>) -> Result<PdbReader> {
        Self::build(File::from_mem(data)?)
    }

    fn build(file: File) -> Result<PdbReader> {
        let msf = MsfFile::parse(file)?;

        let info = PdbInfo::parse(&msf.stream(1)?)?;
        let names_index = info
            .named_stream("/names")
            .ok_or_else(|| malformed_error!("PDB has no /names stream"))?;
        let names = NamesStream::parse(&msf.stream(names_index)?)?;

        let functions = SkipMap::new();
        for function in dbi::parse_functions(&msf, &names)? {
            // Last write wins on duplicate tokens.
            functions.insert(function.token, Arc::new(function));
        }

        Ok(PdbReader {
            info,
            functions,
            token_index: OnceLock::new(),
            documents: DashMap::new(),
        })
    }

    /// Identity GUID of the symbol file.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.info.guid
    }

    /// PDB age, incremented by rebuilds reusing the file.
    #[must_use]
    pub fn age(&self) -> u32 {
        self.info.age
    }

    /// Timestamp signature from the info stream.
    #[must_use]
    pub fn signature(&self) -> u32 {
        self.info.signature
    }

    /// Number of functions in the model.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Look up a function by its MethodDef token.
    #[must_use]
    pub fn function(&self, token: Token) -> Option<Arc<PdbFunction>> {
        self.functions.get(&token).map(|entry| Arc::clone(entry.value()))
    }

    /// All functions in token order.
    #[must_use]
    pub fn functions(&self) -> Vec<Arc<PdbFunction>> {
        self.functions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Map an IL offset within a method to its source location.
    ///
    /// With `exact` set, only a line record at precisely `il_offset` matches;
    /// otherwise the record with the greatest offset at or below the query wins.
    /// An unknown token, an offset below every record, or a function without
    /// line information all yield `None` - routine outcomes for optimized or
    /// stripped code, never errors.
    ///
    /// When several line blocks could match, the first block in declaration
    /// order wins.
    #[must_use]
    pub fn resolve_il_offset(
        &self,
        token: Token,
        il_offset: u32,
        exact: bool,
    ) -> Option<PrimarySourceLocation> {
        let function = self.function(token)?;

        for block in &function.lines {
            if let Some(line) = block.find(il_offset, exact) {
                return Some(PrimarySourceLocation {
                    source: Arc::clone(&block.source),
                    start_line: line.line_begin,
                    start_column: line.col_begin,
                    end_line: line.line_end,
                    end_column: line.col_end,
                });
            }
        }

        None
    }

    /// All source locations a token maps to, in chain order.
    ///
    /// Uses the token→lines index, built lazily on first call and cached. A
    /// token with several line blocks (compiler-generated fan-out over multiple
    /// files) yields one location per block, in declaration order. Unknown
    /// tokens yield an empty list.
    #[must_use]
    pub fn resolve_token(&self, token: Token) -> Vec<PrimarySourceLocation> {
        let index = self.token_index.get_or_init(|| self.build_token_index());
        index.get(&token).cloned().unwrap_or_default()
    }

    /// One location per line block: the block's first record.
    fn build_token_index(&self) -> HashMap<Token, Vec<PrimarySourceLocation>> {
        let mut index = HashMap::new();
        for entry in self.functions.iter() {
            let function = entry.value();
            let mut locations = Vec::with_capacity(function.lines.len());
            for block in &function.lines {
                if let Some(line) = block.lines.first() {
                    locations.push(PrimarySourceLocation {
                        source: Arc::clone(&block.source),
                        start_line: line.line_begin,
                        start_column: line.col_begin,
                        end_line: line.line_end,
                        end_column: line.col_end,
                    });
                }
            }
            if !locations.is_empty() {
                index.insert(function.token, locations);
            }
        }
        index
    }

    /// The function's scope tree flattened in pre-order (parent before children).
    #[must_use]
    pub fn local_scopes<'a>(&self, function: &'a PdbFunction) -> Vec<&'a PdbScope> {
        function.root_scope.flatten()
    }

    /// The slots of `scope` that surface as user-visible variables.
    ///
    /// `declared` is the method's local-variable list from its signature,
    /// indexed by slot. Slots match positionally by index; hidden slots are
    /// skipped; `$VB*` hoisted slots have no positional counterpart and match
    /// by name instead.
    #[must_use]
    pub fn variables_in_scope<'a>(
        &self,
        scope: &'a PdbScope,
        declared: &[&str],
    ) -> Vec<&'a PdbSlot> {
        scope
            .slots
            .iter()
            .filter(|slot| !slot.is_hidden())
            .filter(|slot| {
                if slot.name.starts_with("$VB") {
                    declared.iter().any(|name| *name == slot.name)
                } else {
                    (slot.index as usize) < declared.len()
                }
            })
            .collect()
    }

    /// True iff the function carries iterator-class metadata.
    #[must_use]
    pub fn is_iterator(&self, function: &PdbFunction) -> bool {
        function.is_iterator()
    }

    /// Resolve a function's async metadata through the host.
    ///
    /// Kickoff and continuation tokens may reference methods that were not
    /// loaded when the PDB was parsed, so resolution happens at query time via
    /// the supplied `resolver`. Returns `Ok(None)` for non-async functions.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotResolved`] naming the first token the
    /// host could not resolve.
    pub fn synchronization_information(
        &self,
        function: &PdbFunction,
        resolver: &dyn TokenResolver,
    ) -> Result<Option<ResolvedSynchronizationInformation>> {
        let Some(info) = &function.synchronization_information else {
            return Ok(None);
        };

        let kickoff = resolver
            .object_for_token(info.kickoff_token)
            .ok_or(crate::Error::TokenNotResolved(info.kickoff_token))?;

        let mut synchronization_points = Vec::with_capacity(info.synchronization_points.len());
        for point in &info.synchronization_points {
            let continuation = resolver
                .object_for_token(point.continuation_token)
                .ok_or(crate::Error::TokenNotResolved(point.continuation_token))?;
            synchronization_points.push(ResolvedSynchronizationPoint {
                synchronize_offset: point.synchronize_offset,
                continuation,
                continuation_offset: point.continuation_offset,
            });
        }

        Ok(Some(ResolvedSynchronizationInformation {
            kickoff,
            generated_catch_handler_offset: info.generated_catch_handler_offset,
            synchronization_points,
        }))
    }

    /// The document for `source`, created on first request and cached.
    #[must_use]
    pub fn document(&self, source: &Arc<PdbSource>) -> Arc<PdbSourceDocument> {
        self.documents
            .entry(source.name.clone())
            .or_insert_with(|| Arc::new(PdbSourceDocument::new(Arc::clone(source))))
            .clone()
    }

    /// Release every cached document and its file handle.
    ///
    /// The reader stays queryable afterwards; only source-text access degrades
    /// (documents recreated later probe the filesystem again).
    pub fn close(&self) {
        for entry in self.documents.iter() {
            entry.value().close();
        }
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::pdb::PdbBuilder;

    fn two_scope_pdb() -> Vec<u8> {
        let mut builder = PdbBuilder::new();
        builder.symbols().open_proc(0x0600_0001, "Program.Main", 0x40, 1, 0x1000);
        builder.symbols().slot(0, 0x0200_0004, 0, "x");
        builder.symbols().open_block(0x1008, 0x20);
        builder.symbols().close();
        builder.symbols().close();

        let file = builder.file("C:\\src\\Program.cs");
        builder.lines(1, 0x1000, file, &[(0, 10), (4, 11), (0x20, 15)]);
        builder.build()
    }

    #[test]
    fn scenario_two_nested_scopes_and_slot_x() {
        let reader = PdbReader::from_mem(two_scope_pdb()).unwrap();
        let function = reader.function(Token::new(0x0600_0001)).unwrap();

        let scopes = reader.local_scopes(&function);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].offset, 0); // outer before inner
        assert_eq!(scopes[1].offset, 8);

        let variables = reader.variables_in_scope(scopes[0], &["x"]);
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name, "x");
    }

    #[test]
    fn line_round_trip() {
        let reader = PdbReader::from_mem(two_scope_pdb()).unwrap();
        let token = Token::new(0x0600_0001);
        let function = reader.function(token).unwrap();

        for block in &function.lines {
            for line in &block.lines {
                let location = reader.resolve_il_offset(token, line.offset, true).unwrap();
                assert_eq!(location.start_line, line.line_begin);
                assert_eq!(location.start_column, line.col_begin);
            }
        }
    }

    #[test]
    fn nearest_and_below_first() {
        let reader = PdbReader::from_mem(two_scope_pdb()).unwrap();
        let token = Token::new(0x0600_0001);

        let location = reader.resolve_il_offset(token, 6, false).unwrap();
        assert_eq!(location.start_line, 11);
        assert!(reader.resolve_il_offset(token, 6, true).is_none());
    }

    #[test]
    fn unknown_token_is_absence() {
        let reader = PdbReader::from_mem(two_scope_pdb()).unwrap();
        assert!(reader
            .resolve_il_offset(Token::new(0x0600_0099), 0, false)
            .is_none());
        assert!(reader.resolve_token(Token::new(0x0600_0099)).is_empty());
    }

    #[test]
    fn token_index_in_chain_order() {
        let mut builder = PdbBuilder::new();
        builder.symbols().open_proc(0x0600_0002, "M", 0x20, 1, 0x2000);
        builder.symbols().close();
        let file_a = builder.file("a.cs");
        let file_b = builder.file("b.cs");
        builder.lines(1, 0x2000, file_a, &[(0, 5)]);
        builder.lines(1, 0x2000, file_b, &[(0x10, 30)]);

        let reader = PdbReader::from_mem(builder.build()).unwrap();
        let locations = reader.resolve_token(Token::new(0x0600_0002));
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].source.name, "a.cs");
        assert_eq!(locations[0].start_line, 5);
        assert_eq!(locations[1].source.name, "b.cs");
    }

    #[test]
    fn duplicate_tokens_last_write_wins() {
        let mut builder = PdbBuilder::new();
        builder.symbols().open_proc(0x0600_0003, "First", 0x10, 1, 0x1000);
        builder.symbols().close();
        builder.symbols().open_proc(0x0600_0003, "Second", 0x10, 1, 0x1100);
        builder.symbols().close();

        let reader = PdbReader::from_mem(builder.build()).unwrap();
        assert_eq!(reader.function_count(), 1);
        assert_eq!(reader.function(Token::new(0x0600_0003)).unwrap().name, "Second");
    }

    #[test]
    fn hidden_and_vb_slots() {
        let mut builder = PdbBuilder::new();
        builder.symbols().open_proc(0x0600_0004, "M", 0x10, 1, 0x1000);
        builder.symbols().slot(0, 0x0200_0004, 0, "visible");
        builder.symbols().slot(1, 0x0200_0004, 0x0001, "hidden");
        builder.symbols().slot(7, 0x0200_0004, 0, "$VB$Me");
        builder.symbols().close();

        let reader = PdbReader::from_mem(builder.build()).unwrap();
        let function = reader.function(Token::new(0x0600_0004)).unwrap();

        let variables =
            reader.variables_in_scope(&function.root_scope, &["visible", "$VB$Me"]);
        let names: Vec<&str> = variables.iter().map(|slot| slot.name.as_str()).collect();
        assert_eq!(names, vec!["visible", "$VB$Me"]);
    }

    #[test]
    fn async_resolution_through_host() {
        use crate::host::MapResolver;

        let mut builder = PdbBuilder::new();
        builder.symbols().open_proc(0x0600_0005, "MoveNext", 0x40, 1, 0x1000);
        builder
            .symbols()
            .oem_async(0x0600_0010, u32::MAX, &[(8, 0x0600_0005, 16)]);
        builder.symbols().close();

        let reader = PdbReader::from_mem(builder.build()).unwrap();
        let function = reader.function(Token::new(0x0600_0005)).unwrap();

        let mut resolver = MapResolver::new();
        resolver.insert(Token::new(0x0600_0010), ObjectHandle(1));
        resolver.insert(Token::new(0x0600_0005), ObjectHandle(2));

        let info = reader
            .synchronization_information(&function, &resolver)
            .unwrap()
            .unwrap();
        assert_eq!(info.kickoff, ObjectHandle(1));
        assert_eq!(info.synchronization_points[0].continuation, ObjectHandle(2));

        // An empty host cannot resolve the kickoff token.
        let empty = MapResolver::new();
        assert!(matches!(
            reader.synchronization_information(&function, &empty),
            Err(crate::Error::TokenNotResolved(_))
        ));
    }

    #[test]
    fn documents_are_cached_and_closeable() {
        let reader = PdbReader::from_mem(two_scope_pdb()).unwrap();
        let function = reader.function(Token::new(0x0600_0001)).unwrap();
        let source = Arc::clone(&function.lines[0].source);

        let first = reader.document(&source);
        let second = reader.document(&source);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.text(), ""); // path does not exist on this machine

        reader.close();
        assert_eq!(first.text(), "");
    }

    #[test]
    fn zeroed_signature_fails_without_model() {
        let err = PdbReader::from_mem(vec![0u8; 4096]).unwrap_err();
        assert!(err.to_string().contains("Invalid MSF signature"), "{err}");
    }
}
