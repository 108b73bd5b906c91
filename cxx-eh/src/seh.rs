//! Windows SEH unwind-code tables and the MSVC C++ `FuncInfo` structure
//! (`__CxxFrameHandler3`'s frame descriptor, magic `0x19930522`).

use cxx_ast::Symbol;
use cxx_codegen::{EhMarker, EhMarkerEntry, FrameLayout, ProloguKind};

pub const FUNC_INFO_MAGIC: u32 = 0x1993_0522;

/// One row of the unwind-code table keyed by prologue shape and operand
/// count, used instead of an ordered `>=` comparison chain so a new
/// prologue variant is one more row, not a reordering of existing ones.
pub struct FuncInfoLayout {
    pub kind: ProloguKind,
    pub prologue_len_bytes: u8,
}

pub const FUNC_INFO_LAYOUTS: &[FuncInfoLayout] = &[
    FuncInfoLayout { kind: ProloguKind::NonEh, prologue_len_bytes: 11 },
    FuncInfoLayout { kind: ProloguKind::CppEh, prologue_len_bytes: 16 },
];

pub fn layout_for(kind: ProloguKind) -> &'static FuncInfoLayout {
    FUNC_INFO_LAYOUTS
        .iter()
        .find(|l| l.kind == kind)
        .unwrap_or_else(|| FUNC_INFO_LAYOUTS.first().unwrap_or_else(|| unreachable!("layout table is never empty")))
}

/// `UNWIND_CODE`-equivalent `FrameOffset`: the number of 16-byte chunks the
/// frame allocates, capped at 15 (the field is a 4-bit nibble); larger
/// frames use the `UWOP_ALLOC_LARGE` opcode instead, which this model
/// represents as a `FrameOffset` of 15 plus an explicit large-alloc flag.
pub fn frame_offset_nibble(frame_size: i32) -> u8 {
    ((frame_size / 16).min(15)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryBlockMapEntry {
    pub try_low: i32,
    pub try_high: i32,
    pub catch_high: i32,
    pub num_catches: u32,
    pub handler_array_rva: u32,
}

impl TryBlockMapEntry {
    pub fn to_bytes(self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out[0..4].copy_from_slice(&self.try_low.to_le_bytes());
        out[4..8].copy_from_slice(&self.try_high.to_le_bytes());
        out[8..12].copy_from_slice(&self.catch_high.to_le_bytes());
        out[12..16].copy_from_slice(&self.num_catches.to_le_bytes());
        out[16..20].copy_from_slice(&self.handler_array_rva.to_le_bytes());
        out
    }
}

/// Concatenates a function's `TryBlockMapEntry` table into the byte layout
/// `__CxxFrameHandler3` expects at `FuncInfo::try_block_map_rva`.
pub fn encode_try_block_map(entries: &[TryBlockMapEntry]) -> Vec<u8> {
    entries.iter().flat_map(|e| e.to_bytes()).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct HandlerEntry {
    pub adjectives: u32,
    pub type_descriptor_rva: u32,
    pub catch_obj_disp: i32,
    pub handler_entry_rva: u32,
    /// This is the
    /// *prologue's* frame displacement, not a universal constant — it must
    /// be recomputed whenever the enclosing function's prologue shape
    /// changes, rather than hardcoded once.
    pub disp_frame: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct IpToStateEntry {
    pub ip_offset: u32,
    pub state: i32,
}

impl IpToStateEntry {
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&self.ip_offset.to_le_bytes());
        out[4..8].copy_from_slice(&self.state.to_le_bytes());
        out
    }
}

pub fn encode_ip_to_state_map(entries: &[IpToStateEntry]) -> Vec<u8> {
    entries.iter().flat_map(|e| e.to_bytes()).collect()
}

#[derive(Debug, Clone)]
pub struct FuncInfo {
    pub magic: u32,
    pub max_state: i32,
    pub unwind_map_rva: u32,
    pub try_block_map_rva: u32,
    pub try_block_count: u32,
    pub ip_to_state_map_rva: u32,
    pub ip_to_state_count: u32,
    pub disp_unwind_help: i32,
    pub exception_spec_rva: u32,
    pub eh_flags: u32,
}

impl FuncInfo {
    pub fn new(frame: &FrameLayout, try_block_count: u32, ip_to_state_count: u32) -> Self {
        Self {
            magic: FUNC_INFO_MAGIC,
            max_state: try_block_count as i32,
            unwind_map_rva: 0,
            try_block_map_rva: 0,
            try_block_count,
            ip_to_state_map_rva: 0,
            ip_to_state_count,
            disp_unwind_help: frame.effective_frame_size() - 8,
            exception_spec_rva: 0,
            eh_flags: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; 40] {
        let mut out = [0u8; 40];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.max_state.to_le_bytes());
        out[8..12].copy_from_slice(&self.unwind_map_rva.to_le_bytes());
        out[12..16].copy_from_slice(&self.try_block_map_rva.to_le_bytes());
        out[16..20].copy_from_slice(&self.try_block_count.to_le_bytes());
        out[20..24].copy_from_slice(&self.ip_to_state_map_rva.to_le_bytes());
        out[24..28].copy_from_slice(&self.ip_to_state_count.to_le_bytes());
        out[28..32].copy_from_slice(&self.disp_unwind_help.to_le_bytes());
        out[32..36].copy_from_slice(&self.exception_spec_rva.to_le_bytes());
        out[36..40].copy_from_slice(&self.eh_flags.to_le_bytes());
        out
    }
}

#[derive(Debug, Clone)]
struct TryScope {
    try_low: i32,
    catches: Vec<HandlerEntry>,
    start_offset: u64,
}

/// Assigns unwind states to a function's `try`/`catch` nesting and builds
/// its `TryBlockMapEntry`/`IpToStateEntry` tables from the EH markers
/// `cxx-codegen` recorded while encoding. States are assigned innermost
/// scope first, as `__CxxFrameHandler3` expects (a `try`'s own state must
/// be numerically deeper than any scope it nests inside).
pub struct SehStateBuilder {
    next_state: i32,
    open: Vec<TryScope>,
    try_blocks: Vec<TryBlockMapEntry>,
    ip_to_state: Vec<IpToStateEntry>,
    current_state: i32,
}

impl SehStateBuilder {
    pub fn new() -> Self {
        Self { next_state: 0, open: Vec::new(), try_blocks: Vec::new(), ip_to_state: Vec::new(), current_state: -1 }
    }

    pub fn build(mut self, markers: &[EhMarkerEntry]) -> (Vec<TryBlockMapEntry>, Vec<IpToStateEntry>) {
        self.ip_to_state.push(IpToStateEntry { ip_offset: 0, state: -1 });
        for entry in markers {
            match &entry.marker {
                EhMarker::SehTryBegin | EhMarker::TryBegin => {
                    let state = self.next_state;
                    self.next_state += 1;
                    self.open.push(TryScope { try_low: state, catches: Vec::new(), start_offset: entry.code_offset });
                    self.set_state(entry.code_offset, state);
                }
                EhMarker::SehTryEnd | EhMarker::TryEnd => {
                    if let Some(scope) = self.open.pop() {
                        let entry_rec = TryBlockMapEntry {
                            try_low: scope.try_low,
                            try_high: scope.try_low,
                            catch_high: self.next_state - 1,
                            num_catches: scope.catches.len() as u32,
                            handler_array_rva: 0,
                        };
                        self.try_blocks.push(entry_rec);
                    }
                    let parent_state = self.open.last().map(|s| s.try_low).unwrap_or(-1);
                    self.set_state(entry.code_offset, parent_state);
                }
                EhMarker::CatchBegin { .. } | EhMarker::SehExceptBegin => {
                    if let Some(scope) = self.open.last_mut() {
                        scope.catches.push(HandlerEntry {
                            adjectives: 0,
                            type_descriptor_rva: 0,
                            catch_obj_disp: 0,
                            handler_entry_rva: entry.code_offset as u32,
                            disp_frame: 0,
                        });
                    }
                }
                EhMarker::CatchEnd | EhMarker::SehExceptEnd => {}
                EhMarker::ScopeBegin | EhMarker::ScopeEnd | EhMarker::SehFinallyBegin | EhMarker::SehFinallyEnd => {}
            }
        }
        // Collapse consecutive duplicate states, keeping the later entry —
        // the unwinder only needs the state at each IP-range boundary.
        self.ip_to_state.dedup_by(|a, b| a.state == b.state && { b.ip_offset = a.ip_offset.min(b.ip_offset); true });
        (self.try_blocks, self.ip_to_state)
    }

    fn set_state(&mut self, offset: u64, state: i32) {
        if state != self.current_state {
            self.current_state = state;
            self.ip_to_state.push(IpToStateEntry { ip_offset: offset as u32, state });
        }
    }
}

impl Default for SehStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `__try`/`__except`/`__finally` scope-table entry consumed by the
/// non-C++ SEH runtime path (plain `__try`, no C++ objects involved).
#[derive(Debug, Clone, Copy)]
pub struct ScopeTableEntry {
    pub begin_address: u32,
    pub end_address: u32,
    pub handler_address: u32,
    pub jump_target: u32,
}

/// `??_R0<name>@8`-style type descriptor, built once per exception type
/// and cached by the object writer so repeated `catch (T&)` clauses for
/// the same `T` share one descriptor.
pub fn type_descriptor_symbol(type_name: &str, interner: &cxx_ast::Interner) -> Symbol {
    interner.intern(&format!("??_R0{type_name}@8"))
}

/// `$flash$ti$<mangled>`-style throw-info symbol, built once per thrown
/// type for the same reason.
pub fn throw_info_symbol(mangled: &str, interner: &cxx_ast::Interner) -> Symbol {
    interner.intern(&format!("$flash$ti${mangled}"))
}
