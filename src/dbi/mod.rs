//! DBI (Debug Information) stream and per-module symbol parsing.
//!
//! The DBI stream (stream 3 of the container) is the directory of everything
//! module-scoped: its header pins down substream sizes, and the module-info
//! substream lists every compiland together with the stream number holding that
//! module's symbol records and line information. This module walks that directory
//! and drives the per-module parsers to build the function model.
//!
//! # Architecture
//!
//! - [`DbiStream`] - parses the DBI header and module-info substream
//! - [`symbols`] - CodeView symbol records (`S_GMANPROC`, `S_BLOCK32`, `S_MANSLOT`, ...)
//! - [`lines`] - C13 line subsections (`DEBUG_S_LINES`, `DEBUG_S_FILECHKSMS`)
//!
//! A module stream is laid out as a 4-byte CodeView signature, the symbol records
//! (`symbols_size` bytes including the signature), a legacy line section that is
//! skipped, and finally the C13 line section. [`parse_functions`] stitches the two
//! parsers together per module, attaching line blocks to their functions by the
//! procedure's (segment, offset) address.

pub mod lines;
pub mod symbols;

use crate::{
    file::{io::read_le_at, parser::Parser},
    msf::MsfFile,
    pdb::NamesStream,
    symbols::PdbFunction,
    Result,
};

/// Stream index the DBI stream always occupies.
pub const DBI_STREAM_INDEX: u32 = 3;

/// CodeView signature every managed module stream starts with (C13 format).
const CV_SIGNATURE_C13: u32 = 4;

/// The fixed 64-byte DBI header.
///
/// Only the fields this crate acts on are broken out; the rest of the header is
/// validated as present and skipped.
#[derive(Debug, Clone)]
pub struct DbiHeader {
    /// Header version
    pub version: u32,
    /// PDB age, must agree with the info stream for a matched pair
    pub age: u32,
    /// Byte size of the module-info substream that follows the header
    pub module_info_size: u32,
}

/// One compiland entry from the module-info substream.
#[derive(Debug, Clone)]
pub struct DbiModuleInfo {
    /// Stream number holding the module's symbols and lines, `u16::MAX` when absent
    pub stream: u16,
    /// Byte size of the symbol-record section, including the 4-byte signature
    pub symbols_size: u32,
    /// Byte size of the legacy (pre-C13) line section, always skipped
    pub old_lines_size: u32,
    /// Byte size of the C13 line section
    pub lines_size: u32,
    /// Module name, usually the object file path
    pub name: String,
    /// Object name, differs from `name` for archive members
    pub object_name: String,
}

impl DbiModuleInfo {
    /// True when the module has a symbol stream to parse.
    #[must_use]
    pub fn has_symbols(&self) -> bool {
        self.stream != u16::MAX && self.symbols_size > 4
    }
}

/// A parsed DBI stream: the header plus the module list.
#[derive(Debug, Clone)]
pub struct DbiStream {
    /// Parsed header fields
    pub header: DbiHeader,
    /// Modules in substream order
    pub modules: Vec<DbiModuleInfo>,
}

impl DbiStream {
    /// Parse the DBI header and module-info substream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad signature or a module-info
    /// substream that overruns its declared size, and [`crate::Error::OutOfBounds`]
    /// when the stream is cut short.
    pub fn parse(data: &[u8]) -> Result<DbiStream> {
        let mut offset = 0;
        let signature = read_le_at::<i32>(data, &mut offset)?;
        if signature != -1 {
            return Err(malformed_error!(
                "Invalid DBI signature - {:#x} (expected -1)",
                signature
            ));
        }

        let version = read_le_at::<u32>(data, &mut offset)?;
        let age = read_le_at::<u32>(data, &mut offset)?;
        let _gs_symbols_stream = read_le_at::<u16>(data, &mut offset)?;
        let _internal_version = read_le_at::<u16>(data, &mut offset)?;
        let _ps_symbols_stream = read_le_at::<u16>(data, &mut offset)?;
        let _pdb_dll_version = read_le_at::<u16>(data, &mut offset)?;
        let _symbol_records_stream = read_le_at::<u16>(data, &mut offset)?;
        let _rbld = read_le_at::<u16>(data, &mut offset)?;
        let module_info_size = read_le_at::<u32>(data, &mut offset)?;

        // Remaining substream sizes and trailing header fields are not acted on.
        offset = 64;

        let header = DbiHeader {
            version,
            age,
            module_info_size,
        };

        let Some(substream_end) = (module_info_size as usize).checked_add(64) else {
            return Err(malformed_error!(
                "DBI module-info size causes integer overflow - {}",
                module_info_size
            ));
        };
        if substream_end > data.len() {
            return Err(malformed_error!(
                "DBI module-info substream ({} bytes) overruns the stream ({} bytes)",
                module_info_size,
                data.len()
            ));
        }

        let mut parser = Parser::new(&data[offset..substream_end]);
        let mut modules = Vec::new();
        while parser.has_more_data() {
            modules.push(Self::parse_module_info(&mut parser)?);
        }

        Ok(DbiStream { header, modules })
    }

    /// Parse one module-info record and leave the parser aligned on the next.
    fn parse_module_info(parser: &mut Parser) -> Result<DbiModuleInfo> {
        let _opened = parser.read_le::<u32>()?;

        // Section contribution, 28 bytes, not acted on.
        parser.advance_by(28)?;

        let _flags = parser.read_le::<u16>()?;
        let stream = parser.read_le::<u16>()?;
        let symbols_size = parser.read_le::<u32>()?;
        let old_lines_size = parser.read_le::<u32>()?;
        let lines_size = parser.read_le::<u32>()?;
        let _files = parser.read_le::<u16>()?;
        let _pad = parser.read_le::<u16>()?;
        let _offsets = parser.read_le::<u32>()?;
        let _source_index = parser.read_le::<u32>()?;
        let _compiler_index = parser.read_le::<u32>()?;
        let name = parser.read_string_utf8()?;
        let object_name = parser.read_string_utf8()?;
        parser.align(4)?;

        Ok(DbiModuleInfo {
            stream,
            symbols_size,
            old_lines_size,
            lines_size,
            name,
            object_name,
        })
    }
}

/// Parse every module's symbols and lines into the function model.
///
/// Functions come back in per-module record order. Line blocks are attached to
/// their function by the (segment, offset) address both record kinds carry; a
/// lines subsection addressing no known function is skipped, matching the
/// reference toolchain's tolerance.
///
/// # Errors
/// Fails on a malformed DBI stream, an unreadable module stream, or structurally
/// broken symbol records. Modules without symbols are skipped, not errors.
pub fn parse_functions(msf: &MsfFile, names: &NamesStream) -> Result<Vec<PdbFunction>> {
    let dbi_data = msf.stream(DBI_STREAM_INDEX)?;
    let dbi = DbiStream::parse(&dbi_data)?;

    let mut functions = Vec::new();
    for module in &dbi.modules {
        if !module.has_symbols() {
            continue;
        }

        let stream = msf.stream(u32::from(module.stream))?;

        let symbols_end = module.symbols_size as usize;
        if symbols_end > stream.len() {
            return Err(malformed_error!(
                "Module '{}' declares {} symbol bytes but its stream holds {}",
                module.name,
                symbols_end,
                stream.len()
            ));
        }

        let mut offset = 0;
        let signature = read_le_at::<u32>(&stream, &mut offset)?;
        if signature != CV_SIGNATURE_C13 {
            return Err(malformed_error!(
                "Module '{}' has unsupported CodeView signature - {}",
                module.name,
                signature
            ));
        }

        let mut module_functions = symbols::parse_symbols(&stream[4..symbols_end])?;

        let lines_start = symbols_end + module.old_lines_size as usize;
        let lines_end = lines_start + module.lines_size as usize;
        if module.lines_size > 0 && lines_end <= stream.len() {
            lines::attach_lines(&stream[lines_start..lines_end], names, &mut module_functions)?;
        }

        functions.append(&mut module_functions);
    }

    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_signature() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(&0u32.to_le_bytes());
        let err = DbiStream::parse(&data).unwrap_err();
        assert!(err.to_string().contains("DBI signature"), "{err}");
    }

    #[test]
    fn empty_module_substream() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(&(-1i32).to_le_bytes());
        data[24..28].copy_from_slice(&0u32.to_le_bytes()); // module_info_size
        let dbi = DbiStream::parse(&data).unwrap();
        assert!(dbi.modules.is_empty());
    }

    #[test]
    fn rejects_overlong_module_substream() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(&(-1i32).to_le_bytes());
        data[24..28].copy_from_slice(&4096u32.to_le_bytes());
        let err = DbiStream::parse(&data).unwrap_err();
        assert!(err.to_string().contains("overruns"), "{err}");
    }

    #[test]
    fn parses_module_record() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&19990903u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]); // six u16 stream/version fields
        // module_info_size patched below
        let size_at = data.len();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.resize(64, 0);

        let record_start = data.len();
        data.extend_from_slice(&0u32.to_le_bytes()); // opened
        data.extend_from_slice(&[0u8; 28]); // section contribution
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&9u16.to_le_bytes()); // stream
        data.extend_from_slice(&100u32.to_le_bytes()); // symbols_size
        data.extend_from_slice(&0u32.to_le_bytes()); // old_lines_size
        data.extend_from_slice(&48u32.to_le_bytes()); // lines_size
        data.extend_from_slice(&1u16.to_le_bytes()); // files
        data.extend_from_slice(&0u16.to_le_bytes()); // pad
        data.extend_from_slice(&[0u8; 12]); // offsets + name indices
        data.extend_from_slice(b"Example.obj\0");
        data.extend_from_slice(b"Example.obj\0");
        while (data.len() - record_start) % 4 != 0 {
            data.push(0);
        }
        let record_len = (data.len() - record_start) as u32;
        data[size_at..size_at + 4].copy_from_slice(&record_len.to_le_bytes());

        let dbi = DbiStream::parse(&data).unwrap();
        assert_eq!(dbi.modules.len(), 1);
        let module = &dbi.modules[0];
        assert_eq!(module.stream, 9);
        assert_eq!(module.symbols_size, 100);
        assert_eq!(module.lines_size, 48);
        assert_eq!(module.name, "Example.obj");
        assert!(module.has_symbols());
    }

    #[test]
    fn absent_stream_has_no_symbols() {
        let module = DbiModuleInfo {
            stream: u16::MAX,
            symbols_size: 100,
            old_lines_size: 0,
            lines_size: 0,
            name: String::new(),
            object_name: String::new(),
        };
        assert!(!module.has_symbols());
    }
}
