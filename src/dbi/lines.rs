//! C13 line-information subsections.
//!
//! The line section of a module stream is a run of `{u32 kind, u32 size}` framed
//! subsections, 4-byte aligned. Managed producers emit two kinds this crate acts
//! on: `DEBUG_S_FILECHKSMS` (one per module, the table of source files with their
//! checksums) and `DEBUG_S_LINES` (one per contributing procedure, the IL
//! offset-to-line records). File names live in the `/names` stream; the checksum
//! table references them by offset, and lines subsections reference checksum
//! entries by *their* offset - two levels of indirection resolved here.
//!
//! Lines subsections address their procedure by (segment, offset); a subsection
//! addressing no parsed function is skipped rather than rejected, since native
//! contributions can share a module with managed code.

use std::{collections::HashMap, sync::Arc};

use uguid::Guid;

use crate::{
    file::parser::Parser,
    pdb::NamesStream,
    symbols::{
        lines::{ChecksumKind, PdbLine, PdbLines, PdbSource},
        PdbFunction,
    },
    Result,
};

/// Subsection kind: line records for one procedure.
const DEBUG_S_LINES: u32 = 0xF2;
/// Subsection kind: the module's source-file checksum table.
const DEBUG_S_FILECHKSMS: u32 = 0xF4;
/// Kind flag marking a subsection the producer wants skipped.
const DEBUG_S_IGNORE: u32 = 0x8000_0000;

/// Lines-subsection flag: every line record is followed by a column pair.
const CV_LINES_HAVE_COLUMNS: u16 = 0x0001;

/// Parse a module's C13 line section and attach line blocks to `functions`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a subsection overrunning the section,
/// a checksum entry naming an offset outside the `/names` stream, or a lines
/// block referencing a checksum entry that does not exist.
pub fn attach_lines(
    data: &[u8],
    names: &NamesStream,
    functions: &mut [PdbFunction],
) -> Result<()> {
    let sources = parse_checksum_table(data, names)?;

    let mut by_address: HashMap<(u16, u32), usize> = HashMap::new();
    for (index, function) in functions.iter().enumerate() {
        by_address.insert((function.segment, function.address), index);
    }

    for_each_subsection(data, |kind, subsection| {
        if kind != DEBUG_S_LINES {
            return Ok(());
        }

        let mut parser = Parser::new(subsection);
        let address_offset = parser.read_le::<u32>()?;
        let address_segment = parser.read_le::<u16>()?;
        let flags = parser.read_le::<u16>()?;
        let _code_length = parser.read_le::<u32>()?;
        let have_columns = flags & CV_LINES_HAVE_COLUMNS != 0;

        let Some(&function_index) = by_address.get(&(address_segment, address_offset)) else {
            return Ok(()); // native or stripped contribution
        };

        while parser.has_more_data() {
            let block = parse_lines_block(&mut parser, have_columns, &sources)?;
            functions[function_index].lines.push(block);
        }

        Ok(())
    })
}

/// Walk the subsection framing, handing each payload to `visit`.
fn for_each_subsection(
    data: &[u8],
    mut visit: impl FnMut(u32, &[u8]) -> Result<()>,
) -> Result<()> {
    let mut parser = Parser::new(data);
    while parser.has_more_data() {
        let kind = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()? as usize;
        let payload = parser.read_bytes(size).map_err(|_| {
            malformed_error!(
                "C13 subsection {:#x} declares {} bytes but the section ends first",
                kind,
                size
            )
        })?;

        if kind & DEBUG_S_IGNORE == 0 {
            visit(kind, payload)?;
        }

        // The last subsection may omit its trailing pad.
        if parser.align(4).is_err() {
            break;
        }
    }

    Ok(())
}

/// Collect the module's `DEBUG_S_FILECHKSMS` table, keyed by entry offset.
///
/// Several lines subsections referencing the same file share one
/// `Arc<PdbSource>`.
fn parse_checksum_table(
    data: &[u8],
    names: &NamesStream,
) -> Result<HashMap<u32, Arc<PdbSource>>> {
    let mut sources = HashMap::new();

    for_each_subsection(data, |kind, subsection| {
        if kind != DEBUG_S_FILECHKSMS {
            return Ok(());
        }

        let mut parser = Parser::new(subsection);
        while parser.has_more_data() {
            let entry_offset = parser.pos() as u32;
            let name_offset = parser.read_le::<u32>()?;
            let checksum_len = parser.read_le::<u8>()? as usize;
            let checksum_kind = ChecksumKind::from_raw(parser.read_le::<u8>()?);
            let checksum = parser.read_bytes(checksum_len)?.to_vec();
            parser.align(4)?;

            let name = names.get(name_offset)?.to_string();
            sources.insert(
                entry_offset,
                Arc::new(PdbSource {
                    name,
                    language: Guid::ZERO,
                    vendor: Guid::ZERO,
                    doc_type: Guid::ZERO,
                    checksum_kind,
                    checksum,
                }),
            );
        }

        Ok(())
    })?;

    Ok(sources)
}

/// Parse one file block of a lines subsection into a [`PdbLines`].
fn parse_lines_block(
    parser: &mut Parser,
    have_columns: bool,
    sources: &HashMap<u32, Arc<PdbSource>>,
) -> Result<PdbLines> {
    let file_id = parser.read_le::<u32>()?;
    let line_count = parser.read_le::<u32>()?;
    let _block_size = parser.read_le::<u32>()?;

    let source = sources.get(&file_id).ok_or_else(|| {
        malformed_error!(
            "Lines block references checksum entry {:#x} which does not exist",
            file_id
        )
    })?;

    let mut lines = PdbLines::new(Arc::clone(source));
    lines.lines.reserve(line_count as usize);

    for _ in 0..line_count {
        let offset = parser.read_le::<u32>()?;
        let packed = parser.read_le::<u32>()?;
        let line_begin = packed & 0x00FF_FFFF;
        let delta_line_end = (packed >> 24) & 0x7F;
        lines.lines.push(PdbLine {
            offset,
            line_begin,
            col_begin: 0,
            line_end: line_begin + delta_line_end,
            col_end: 0,
        });
    }

    if have_columns {
        for line in &mut lines.lines {
            line.col_begin = parser.read_le::<u16>()?;
            line.col_end = parser.read_le::<u16>()?;
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        symbols::Token,
        test::pdb::{build_names_stream, C13Builder},
    };

    fn function_at(segment: u16, address: u32) -> PdbFunction {
        PdbFunction {
            token: Token::new(0x0600_0001),
            segment,
            address,
            length: 0x100,
            ..Default::default()
        }
    }

    fn names_with(files: &[&str]) -> (NamesStream, Vec<u32>) {
        let (data, offsets) = build_names_stream(files);
        (NamesStream::parse(&data).unwrap(), offsets)
    }

    #[test]
    fn lines_attach_to_matching_function() {
        let (names, offsets) = names_with(&["C:\\src\\Program.cs"]);

        let mut builder = C13Builder::new();
        let file = builder.checksum(offsets[0], 1, &[0xAB; 16]);
        builder.lines(0x1000, 1, file, &[(0, 10, 0), (4, 11, 0), (12, 12, 1)]);

        let mut functions = vec![function_at(1, 0x1000)];
        attach_lines(&builder.build(), &names, &mut functions).unwrap();

        assert_eq!(functions[0].lines.len(), 1);
        let block = &functions[0].lines[0];
        assert_eq!(block.source.name, "C:\\src\\Program.cs");
        assert_eq!(block.source.checksum_kind, ChecksumKind::Md5);
        assert_eq!(block.lines.len(), 3);
        assert_eq!(block.lines[1].offset, 4);
        assert_eq!(block.lines[1].line_begin, 11);
        assert_eq!(block.lines[2].line_end, 13);
    }

    #[test]
    fn unmatched_subsection_is_skipped() {
        let (names, offsets) = names_with(&["a.cs"]);

        let mut builder = C13Builder::new();
        let file = builder.checksum(offsets[0], 1, &[0u8; 16]);
        builder.lines(0x9000, 7, file, &[(0, 1, 0)]);

        let mut functions = vec![function_at(1, 0x1000)];
        attach_lines(&builder.build(), &names, &mut functions).unwrap();
        assert!(functions[0].lines.is_empty());
    }

    #[test]
    fn missing_checksum_entry_is_fatal() {
        let (names, offsets) = names_with(&["a.cs"]);

        let mut builder = C13Builder::new();
        let _file = builder.checksum(offsets[0], 1, &[0u8; 16]);
        builder.lines(0x1000, 1, 0xDEAD, &[(0, 1, 0)]);

        let mut functions = vec![function_at(1, 0x1000)];
        let err = attach_lines(&builder.build(), &names, &mut functions).unwrap_err();
        assert!(err.to_string().contains("checksum entry"), "{err}");
    }

    #[test]
    fn two_files_share_sources_across_blocks() {
        let (names, offsets) = names_with(&["a.cs", "b.cs"]);

        let mut builder = C13Builder::new();
        let (file_a, file_b) = {
            let a = builder.checksum(offsets[0], 1, &[1u8; 16]);
            let b = builder.checksum(offsets[1], 2, &[2u8; 20]);
            (a, b)
        };
        builder.lines_blocks(
            0x1000,
            1,
            &[(file_a, vec![(0, 5, 0)]), (file_b, vec![(8, 30, 0)])],
        );

        let mut functions = vec![function_at(1, 0x1000)];
        attach_lines(&builder.build(), &names, &mut functions).unwrap();

        let blocks = &functions[0].lines;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].source.name, "a.cs");
        assert_eq!(blocks[1].source.name, "b.cs");
        assert_eq!(blocks[1].source.checksum_kind, ChecksumKind::Sha1);
    }

    #[test]
    fn columns_are_decoded_when_flagged() {
        let (names, offsets) = names_with(&["a.cs"]);

        let mut builder = C13Builder::new();
        let file = builder.checksum(offsets[0], 1, &[0u8; 16]);
        builder.lines_with_columns(0x1000, 1, file, &[(0, 10, 0, 5, 20)]);

        let mut functions = vec![function_at(1, 0x1000)];
        attach_lines(&builder.build(), &names, &mut functions).unwrap();

        let line = &functions[0].lines[0].lines[0];
        assert_eq!(line.col_begin, 5);
        assert_eq!(line.col_end, 20);
    }

    #[test]
    fn truncated_subsection_is_fatal() {
        let (names, _) = names_with(&["a.cs"]);
        // Frame declares 64 payload bytes, section holds 4.
        let mut data = Vec::new();
        data.extend_from_slice(&DEBUG_S_LINES.to_le_bytes());
        data.extend_from_slice(&64u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);

        let mut functions = vec![function_at(1, 0)];
        assert!(attach_lines(&data, &names, &mut functions).is_err());
    }
}
