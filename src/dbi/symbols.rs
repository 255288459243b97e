//! CodeView symbol-record parsing for managed module streams.
//!
//! Symbol records are framed as a `u16` byte length followed by a `u16` kind; the
//! length covers the kind word and the payload, and records are 4-byte aligned.
//! Managed producers emit a small, stable subset of the CodeView vocabulary, modeled
//! by [`SymbolKind`]. Unknown kinds are skipped by their declared length - that is
//! how new record types stay backward compatible - but a record whose payload
//! overruns its frame is a structural error and fails the whole module.
//!
//! # Architecture
//!
//! Parsing is a single forward pass with a scope stack. A managed-procedure record
//! opens a function and its root scope, `S_BLOCK32` pushes a child scope, `S_END`
//! pops the innermost open scope (closing the function when the root pops). Slots,
//! constants and namespace imports attach to whichever scope is open.
//!
//! OEM records carry the producer extensions: the MSIL metadata GUID followed by a
//! UTF-16 name selects between `"MD2"` custom-metadata items (using counts, forward
//! info, iterator locals, iterator class) and `"asyncMethodInfo"` (kickoff method,
//! catch handler, await sites).

use strum::FromRepr;

use crate::{
    file::parser::Parser,
    symbols::{
        constant::{PdbConstant, PdbValue},
        function::{
            PdbFunction, PdbIteratorScope, PdbSynchronizationInformation,
            PdbSynchronizationPoint, ProcFlags,
        },
        scope::PdbScope,
        slot::{PdbSlot, SlotFlags},
        token::Token,
    },
    Result,
};

/// OEM GUID selecting the MSIL producer extensions ({c6ea3fc9-59b3-49d6-bc25-0902bbabb460}).
const MSIL_METADATA_GUID: [u8; 16] = [
    0xC9, 0x3F, 0xEA, 0xC6, 0xB3, 0x59, 0xD6, 0x49, 0xBC, 0x25, 0x09, 0x02, 0xBB, 0xAB, 0xB4,
    0x60,
];

/// Version byte every `"MD2"` custom-metadata blob starts with.
const MD2_VERSION: u8 = 4;

/// The CodeView record kinds a managed producer emits.
///
/// Values match the on-disk `u16` kind word. Anything not listed here is skipped
/// by record length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u16)]
pub enum SymbolKind {
    /// Closes the innermost open scope or procedure
    End = 0x0006,
    /// Producer extension record, selected by GUID
    Oem = 0x0404,
    /// Named constant (native leaf encoding)
    Constant = 0x1107,
    /// Lexical block within a procedure
    Block32 = 0x1103,
    /// Managed local slot
    ManSlot = 0x1120,
    /// Namespace import over the enclosing scope
    UNamespace = 0x1124,
    /// Global managed procedure
    GManProc = 0x112A,
    /// Local (module-private) managed procedure
    LManProc = 0x112B,
    /// Named constant with a metadata token
    ManConstant = 0x112D,
}

/// Parse a module's symbol-record section into functions.
///
/// `data` is the record stream without the leading 4-byte CodeView signature.
/// Records with a null MethodDef token are dropped; everything else comes back
/// in emission order.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] when a record payload overruns its frame,
/// a numeric leaf is unknown, or the nesting structure is broken (an `S_END`
/// without an open procedure).
pub fn parse_symbols(data: &[u8]) -> Result<Vec<PdbFunction>> {
    let mut functions = Vec::new();
    let mut builder: Option<FunctionBuilder> = None;

    let mut offset = 0;
    while offset + 4 <= data.len() {
        let mut header = Parser::new(&data[offset..]);
        let record_len = header.read_le::<u16>()? as usize;
        let kind_raw = header.read_le::<u16>()?;
        if record_len < 2 {
            return Err(malformed_error!(
                "Symbol record at offset {} declares length {} (minimum 2)",
                offset,
                record_len
            ));
        }

        let payload_end = offset + 2 + record_len;
        if payload_end > data.len() {
            return Err(malformed_error!(
                "Symbol record at offset {} overruns the symbol section ({} > {})",
                offset,
                payload_end,
                data.len()
            ));
        }

        let mut payload = Parser::new(&data[offset + 4..payload_end]);
        match SymbolKind::from_repr(kind_raw) {
            Some(SymbolKind::GManProc | SymbolKind::LManProc) => {
                if builder.is_some() {
                    return Err(malformed_error!(
                        "Nested procedure record at offset {} - previous procedure not closed",
                        offset
                    ));
                }
                builder = Some(parse_proc(&mut payload)?);
            }
            Some(SymbolKind::Block32) => {
                if let Some(builder) = builder.as_mut() {
                    let scope = parse_block(&mut payload, builder.function.address)?;
                    builder.open.push(scope);
                }
            }
            Some(SymbolKind::End) => {
                let Some(current) = builder.as_mut() else {
                    return Err(malformed_error!(
                        "S_END at offset {} without an open procedure",
                        offset
                    ));
                };
                if let Some(child) = current.open.pop() {
                    current.current_scope().scopes.push(child);
                } else if let Some(finished) = builder.take() {
                    if !finished.function.token.is_null() {
                        functions.push(finished.function);
                    }
                }
            }
            Some(SymbolKind::ManSlot) => {
                if let Some(builder) = builder.as_mut() {
                    let slot = parse_slot(&mut payload)?;
                    builder.current_scope().slots.push(slot);
                }
            }
            Some(SymbolKind::Constant | SymbolKind::ManConstant) => {
                if let Some(builder) = builder.as_mut() {
                    let constant = parse_constant(&mut payload)?;
                    builder.current_scope().constants.push(constant);
                }
            }
            Some(SymbolKind::UNamespace) => {
                if let Some(builder) = builder.as_mut() {
                    let namespace = payload.read_string_utf8()?;
                    builder.current_scope().used_namespaces.push(namespace);
                }
            }
            Some(SymbolKind::Oem) => {
                if let Some(builder) = builder.as_mut() {
                    parse_oem(&mut payload, &mut builder.function)?;
                }
            }
            None => {} // forward compatibility: unknown kinds are skipped by length
        }

        offset = payload_end;
    }

    if builder.is_some() {
        return Err(malformed_error!(
            "Symbol section ended with an unclosed procedure"
        ));
    }

    Ok(functions)
}

/// A procedure being assembled: the function plus its stack of open block scopes.
///
/// The root scope lives in `function.root_scope`; `open` holds only `S_BLOCK32`
/// scopes that have not seen their `S_END` yet.
struct FunctionBuilder {
    function: PdbFunction,
    open: Vec<PdbScope>,
}

impl FunctionBuilder {
    /// The innermost scope records currently attach to.
    fn current_scope(&mut self) -> &mut PdbScope {
        self.open.last_mut().unwrap_or(&mut self.function.root_scope)
    }
}

/// Parse a managed-procedure payload (`S_GMANPROC` / `S_LMANPROC`).
fn parse_proc(parser: &mut Parser) -> Result<FunctionBuilder> {
    let _parent = parser.read_le::<u32>()?;
    let _end = parser.read_le::<u32>()?;
    let _next = parser.read_le::<u32>()?;
    let length = parser.read_le::<u32>()?;
    let _dbg_start = parser.read_le::<u32>()?;
    let _dbg_end = parser.read_le::<u32>()?;
    let token = Token::new(parser.read_le::<u32>()?);
    let address = parser.read_le::<u32>()?;
    let segment = parser.read_le::<u16>()?;
    let flags = ProcFlags::from_bits_retain(parser.read_le::<u8>()?);
    let _return_register = parser.read_le::<u16>()?;
    let name = parser.read_string_utf8()?;

    let function = PdbFunction {
        token,
        name,
        length,
        segment,
        address,
        flags,
        root_scope: PdbScope::new(0, length),
        ..Default::default()
    };

    Ok(FunctionBuilder {
        function,
        open: Vec::new(),
    })
}

/// Parse a lexical block (`S_BLOCK32`), rebasing its offset onto the function.
fn parse_block(parser: &mut Parser, function_address: u32) -> Result<PdbScope> {
    let _parent = parser.read_le::<u32>()?;
    let _end = parser.read_le::<u32>()?;
    let length = parser.read_le::<u32>()?;
    let address = parser.read_le::<u32>()?;
    let _segment = parser.read_le::<u16>()?;
    let _name = parser.read_string_utf8()?;

    // Block addresses are section-relative; scopes are IL-relative.
    Ok(PdbScope::new(
        address.wrapping_sub(function_address),
        length,
    ))
}

/// Parse a managed slot record (`S_MANSLOT`).
fn parse_slot(parser: &mut Parser) -> Result<PdbSlot> {
    let index = parser.read_le::<u32>()?;
    let type_token = Token::new(parser.read_le::<u32>()?);
    let _address = parser.read_le::<u32>()?;
    let _segment = parser.read_le::<u16>()?;
    let flags = SlotFlags::from_bits_retain(parser.read_le::<u16>()?);
    let name = parser.read_string_utf8()?;

    Ok(PdbSlot {
        index,
        type_token,
        flags,
        name,
    })
}

/// Parse a named constant (`S_MANCONSTANT` / `S_CONSTANT`).
fn parse_constant(parser: &mut Parser) -> Result<PdbConstant> {
    let token = Token::new(parser.read_le::<u32>()?);
    let value = read_numeric_leaf(parser)?;
    let name = parser.read_string_utf8()?;

    Ok(PdbConstant { name, token, value })
}

/// Decode a CodeView numeric leaf into an owned value.
///
/// Values below `0x8000` are the value itself; everything else is an `LF_*`
/// marker announcing the typed payload that follows.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for an unknown leaf marker - skipping one
/// is impossible since its payload size is unknown.
pub fn read_numeric_leaf(parser: &mut Parser) -> Result<PdbValue> {
    let leaf = parser.read_le::<u16>()?;
    if leaf < 0x8000 {
        return Ok(PdbValue::UInt(u64::from(leaf)));
    }

    match leaf {
        0x8000 => Ok(PdbValue::Int(i64::from(parser.read_le::<i8>()?))), // LF_CHAR
        0x8001 => Ok(PdbValue::Int(i64::from(parser.read_le::<i16>()?))), // LF_SHORT
        0x8002 => Ok(PdbValue::UInt(u64::from(parser.read_le::<u16>()?))), // LF_USHORT
        0x8003 => Ok(PdbValue::Int(i64::from(parser.read_le::<i32>()?))), // LF_LONG
        0x8004 => Ok(PdbValue::UInt(u64::from(parser.read_le::<u32>()?))), // LF_ULONG
        0x8005 => Ok(PdbValue::Real32(parser.read_le::<f32>()?)),        // LF_REAL32
        0x8006 => Ok(PdbValue::Real64(parser.read_le::<f64>()?)),        // LF_REAL64
        0x8009 => Ok(PdbValue::Int(parser.read_le::<i64>()?)),           // LF_QUADWORD
        0x800A => Ok(PdbValue::UInt(parser.read_le::<u64>()?)),          // LF_UQUADWORD
        0x8010 => {
            // LF_VARSTRING: u16 length + raw bytes
            let len = parser.read_le::<u16>()? as usize;
            Ok(PdbValue::String(parser.read_bytes(len)?.to_vec()))
        }
        0x8019 => {
            // LF_DECIMAL: raw 16-byte .NET decimal
            let bytes: [u8; 16] = parser
                .read_bytes(16)?
                .try_into()
                .map_err(|_| crate::Error::OutOfBounds)?;
            Ok(PdbValue::Decimal(bytes))
        }
        _ => Err(malformed_error!("Unknown numeric leaf - {:#06x}", leaf)),
    }
}

/// Parse an OEM record (`S_OEM`) and apply any recognized extension to `function`.
///
/// Records with a foreign GUID or an unrecognized name are ignored wholesale.
fn parse_oem(parser: &mut Parser, function: &mut PdbFunction) -> Result<()> {
    let guid = parser.read_guid()?;
    if guid.to_bytes() != MSIL_METADATA_GUID {
        return Ok(());
    }

    let _type_index = parser.read_le::<u32>()?;
    let name = parser.read_string_utf16()?;
    match name.as_str() {
        "MD2" => parse_md2(parser, function),
        "asyncMethodInfo" => parse_async_info(parser, function),
        _ => Ok(()),
    }
}

/// Parse the `"MD2"` custom-metadata items following the OEM name.
fn parse_md2(parser: &mut Parser, function: &mut PdbFunction) -> Result<()> {
    let version = parser.read_le::<u8>()?;
    if version != MD2_VERSION {
        return Ok(()); // older producers; nothing to salvage
    }
    let count = parser.read_le::<u8>()?;
    parser.align(4)?;

    for _ in 0..count {
        let item_start = parser.pos();
        let _item_version = parser.read_le::<u8>()?;
        let item_kind = parser.read_le::<u8>()?;
        parser.align(4)?;
        let item_size = parser.read_le::<u32>()? as usize;

        match item_kind {
            0 => {
                // using counts per scope level
                let entries = parser.read_le::<u16>()?;
                for _ in 0..entries {
                    function.using_counts.push(parser.read_le::<u16>()?);
                }
            }
            1 => {
                // forward info: usings live on another method
                function.token_of_method_whose_using_info_applies =
                    Token::new(parser.read_le::<u32>()?);
            }
            3 => {
                // iterator locals: hoisted live ranges
                let entries = parser.read_le::<u32>()?;
                for _ in 0..entries {
                    let start = parser.read_le::<u32>()?;
                    let end = parser.read_le::<u32>()?;
                    function.iterator_scopes.push(PdbIteratorScope {
                        offset: start,
                        length: end.saturating_sub(start),
                    });
                }
            }
            4 => {
                // forward iterator: the state-machine class name
                function.iterator_class = parser.read_string_utf16()?;
            }
            _ => {} // kind 2 (forwarded-to-module) and unknown kinds: skip by size
        }

        // Item size is measured from the item start and covers padding.
        let Some(item_end) = item_start.checked_add(item_size) else {
            return Err(malformed_error!(
                "Custom-metadata item size causes integer overflow - {}",
                item_size
            ));
        };
        parser.seek(item_end)?;
    }

    Ok(())
}

/// Parse the `"asyncMethodInfo"` payload following the OEM name.
fn parse_async_info(parser: &mut Parser, function: &mut PdbFunction) -> Result<()> {
    let kickoff_token = Token::new(parser.read_le::<u32>()?);
    let generated_catch_handler_offset = parser.read_le::<u32>()?;
    let count = parser.read_le::<u32>()?;

    let mut synchronization_points = Vec::with_capacity(count as usize);
    for _ in 0..count {
        synchronization_points.push(PdbSynchronizationPoint {
            synchronize_offset: parser.read_le::<u32>()?,
            continuation_token: Token::new(parser.read_le::<u32>()?),
            continuation_offset: parser.read_le::<u32>()?,
        });
    }

    function.synchronization_information = Some(PdbSynchronizationInformation {
        kickoff_token,
        generated_catch_handler_offset,
        synchronization_points,
    });

    Ok(())
}
