//! Relocation records produced alongside code bytes. `cxx-objwriter`
//! translates these into the target object format's own relocation types.

use cxx_ast::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// COFF `IMAGE_REL_AMD64_REL32`: call/jmp to a symbol, PC-relative.
    Rel32Coff,
    /// ELF `R_X86_64_PC32`: call/jmp to a symbol, PC-relative.
    Pc32Elf,
    /// Absolute 64-bit pointer, used for vtable slots and `.rdata` entries
    /// that must survive ASLR-unaware consumers (COFF `ADDR64` / ELF
    /// `R_X86_64_64`).
    Addr64,
    /// COFF `ADDR32NB`: RVA-relative 32-bit pointer into `.pdata`/`.xdata`.
    Addr32Nb,
}

#[derive(Debug, Clone)]
pub struct Relocation {
    /// Byte offset within the owning section at which the relocation applies.
    pub offset: u64,
    pub symbol: Symbol,
    pub kind: RelocKind,
    pub addend: i64,
}
