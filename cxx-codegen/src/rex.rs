//! REX prefix computation, ModRM/SIB byte assembly, and the disp8/rel32
//! encoding choices used throughout instruction selection.

use crate::abi::Reg;

bitflags::bitflags! {
    /// `0100WRXB`. W selects the 64-bit operand size; R/X/B extend the
    /// ModRM reg field, the SIB index field, and the ModRM rm/SIB base
    /// field respectively into registers R8-R15.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RexFlags: u8 {
        const W = 0b1000;
        const R = 0b0100;
        const X = 0b0010;
        const B = 0b0001;
    }
}

pub const REX_BASE: u8 = 0x40;

pub fn rex_byte(flags: RexFlags) -> u8 {
    REX_BASE | flags.bits()
}

/// Whether a REX prefix must be emitted even with an all-zero payload —
/// true whenever any operand register is R8-R15.
pub fn needs_rex(flags: RexFlags) -> bool {
    !flags.is_empty()
}

pub fn rex_for_operands(reg_field: Reg, rm_field: Reg, operand_size_64: bool) -> RexFlags {
    let mut flags = RexFlags::empty();
    if operand_size_64 {
        flags |= RexFlags::W;
    }
    if reg_field.needs_rex_extension() {
        flags |= RexFlags::R;
    }
    if rm_field.needs_rex_extension() {
        flags |= RexFlags::B;
    }
    flags
}

/// ModRM byte for a direct register-to-register operand: `mod=11`.
pub fn modrm_direct(reg_field: Reg, rm_field: Reg) -> u8 {
    0b1100_0000 | (reg_field.low3() << 3) | rm_field.low3()
}

/// ModRM byte for `[rm_field + disp]`, choosing the disp8 (`mod=01`) or
/// disp32 (`mod=10`) form based on whether `disp` fits in a signed byte.
/// Returns the ModRM byte and the encoded displacement bytes.
pub fn modrm_indirect_disp(reg_field: Reg, rm_field: Reg, disp: i32) -> (u8, Vec<u8>) {
    if disp == 0 && rm_field.low3() != Reg::Rbp.low3() {
        return (0b0000_0000 | (reg_field.low3() << 3) | rm_field.low3(), Vec::new());
    }
    if let Ok(d8) = i8::try_from(disp) {
        (0b0100_0000 | (reg_field.low3() << 3) | rm_field.low3(), vec![d8 as u8])
    } else {
        (0b1000_0000 | (reg_field.low3() << 3) | rm_field.low3(), disp.to_le_bytes().to_vec())
    }
}

/// Disp8 vs. rel32 choice for a branch to a not-yet-placed label: callers
/// lay out short form speculatively and widen on a second pass if the
/// measured distance overflows `i8`, recorded via the label patch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchForm {
    Short,
    Near,
}

pub fn fits_disp8(distance: i64) -> bool {
    (-128..=127).contains(&distance)
}
