//! Stack frame shape and prologue/epilogue emission.
//!
//! Two distinct prologue shapes exist depending on whether the function's
//! body can unwind through a Windows SEH scope table:
//!
//! - non-EH: `push rbp; mov rbp, rsp; sub rsp, N`
//! - C++-EH: `push rbp; sub rsp, N; lea rbp, [rsp+k]` — `rbp` is offset
//!   into the frame rather than pointing at its base, so the unwinder can
//!   locate the `EstablisherFrame` via a fixed displacement from the
//!   funclet's own `rdx` parameter.

use crate::abi::{CallingConvention, Reg};
use crate::rex::{modrm_direct, modrm_indirect_disp, rex_byte, rex_for_operands, RexFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProloguKind {
    NonEh,
    CppEh,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub convention: CallingConvention,
    pub kind: ProloguKind,
    /// Total local-variable + spill area, 16-byte aligned.
    pub locals_size: i32,
    /// `rbp`'s displacement from `rsp` at entry, for the C++-EH form. Zero
    /// for the non-EH form (where `rbp` equals `rsp` at the `mov`).
    pub rbp_offset: i32,
}

impl FrameLayout {
    pub fn new(convention: CallingConvention, kind: ProloguKind, locals_size: i32) -> Self {
        let aligned = (locals_size + 15) & !15;
        let rbp_offset = match kind {
            ProloguKind::NonEh => 0,
            // A fixed small offset keeps `rbp`-relative catch-object
            // displacements positive and within disp8 range for the common
            // case; widened by the caller if locals exceed it.
            ProloguKind::CppEh => 0x20.min(aligned),
        };
        Self { convention, kind, locals_size: aligned, rbp_offset }
    }

    /// Effective frame size as the EH metadata builder defines it:
    /// `locals_size` plus the pushed `rbp` slot.
    pub fn effective_frame_size(&self) -> i32 {
        self.locals_size + 8
    }

    pub fn emit_prologue(&self, out: &mut Vec<u8>) {
        // push rbp
        out.push(0x55);
        match self.kind {
            ProloguKind::NonEh => {
                // mov rbp, rsp
                out.push(rex_byte(rex_for_operands(Reg::Rsp, Reg::Rbp, true)));
                out.push(0x89);
                out.push(modrm_direct(Reg::Rsp, Reg::Rbp));
                self.emit_sub_rsp(out);
            }
            ProloguKind::CppEh => {
                self.emit_sub_rsp(out);
                // lea rbp, [rsp + rbp_offset]
                out.push(rex_byte(rex_for_operands(Reg::Rbp, Reg::Rsp, true)));
                out.push(0x8D);
                let (modrm, disp) = modrm_indirect_disp(Reg::Rbp, Reg::Rsp, self.rbp_offset);
                out.push(modrm);
                // [rsp+disp] needs a SIB byte with no index.
                out.push(0x24);
                out.extend(disp);
            }
        }
        if self.convention.shadow_space_bytes() > 0 {
            // Shadow space is reserved by the caller on Win64; nothing to
            // emit here, it is already folded into `locals_size` by the
            // frame builder upstream.
        }
    }

    fn emit_sub_rsp(&self, out: &mut Vec<u8>) {
        if self.locals_size == 0 {
            return;
        }
        // sub rsp, imm32
        out.push(rex_byte(rex_for_operands(Reg::Rax, Reg::Rsp, true)));
        out.push(0x81);
        out.push(modrm_direct(Reg::Rbp, Reg::Rsp)); // reg field = /5 (Rbp's low3 == 5)
        out.extend(self.locals_size.to_le_bytes());
    }

    pub fn emit_epilogue(&self, out: &mut Vec<u8>) {
        // add rsp, locals_size
        if self.locals_size != 0 {
            out.push(rex_byte(rex_for_operands(Reg::Rax, Reg::Rsp, true)));
            out.push(0x81);
            out.push(modrm_direct(Reg::Rax, Reg::Rsp)); // reg field = /0
            out.extend(self.locals_size.to_le_bytes());
        }
        // pop rbp
        out.push(0x5D);
        // ret
        out.push(0xC3);
    }
}

/// A catch funclet's own, much smaller prologue: `mov [rsp+0x10], rdx;
/// push rbp; sub rsp, 0x20; lea rbp, [rdx + N]`. `rdx` on entry holds the
/// parent frame's `EstablisherFrame` pointer, which the funclet must both
/// stash (for any nested call that needs it) and use to recompute `rbp`.
pub struct FuncletFrame {
    pub parent_rbp_offset: i32,
}

impl FuncletFrame {
    pub fn emit_prologue(&self, out: &mut Vec<u8>) {
        // mov [rsp+0x10], rdx
        out.push(rex_byte(rex_for_operands(Reg::Rdx, Reg::Rsp, true)));
        out.push(0x89);
        let (modrm, disp) = modrm_indirect_disp(Reg::Rdx, Reg::Rsp, 0x10);
        out.push(modrm);
        out.push(0x24);
        out.extend(disp);

        out.push(0x55); // push rbp
        out.push(rex_byte(rex_for_operands(Reg::Rax, Reg::Rsp, true)));
        out.push(0x81);
        out.push(modrm_direct(Reg::Rbp, Reg::Rsp));
        out.extend(0x20i32.to_le_bytes()); // sub rsp, 0x20

        out.push(rex_byte(rex_for_operands(Reg::Rbp, Reg::Rdx, true)));
        out.push(0x8D);
        let (modrm, disp) = modrm_indirect_disp(Reg::Rbp, Reg::Rdx, self.parent_rbp_offset);
        out.push(modrm);
        out.extend(disp);
    }
}
