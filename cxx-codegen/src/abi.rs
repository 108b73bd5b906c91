//! Calling-convention tables. No register allocator exists downstream of
//! this module: argument slots are resolved once here and the instruction
//! selector always spills through RAX/RCX/RDX or XMM0/XMM1 at point of use.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    /// Windows x64: RCX, RDX, R8, R9 for the first four integer/pointer
    /// args, XMM0-3 for float args in parallel argument slots, 32-byte
    /// shadow space reserved by the caller.
    Win64,
    /// System V AMD64 (ELF targets): RDI, RSI, RDX, RCX, R8, R9 for integer
    /// args, XMM0-7 for float args, no shadow space.
    SysV,
}

pub const WIN64_SHADOW_SPACE_BYTES: i32 = 32;

impl CallingConvention {
    pub const fn int_arg_registers(self) -> &'static [Reg] {
        match self {
            CallingConvention::Win64 => &[Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9],
            CallingConvention::SysV => &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9],
        }
    }

    pub const fn float_arg_registers(self) -> &'static [Xmm] {
        match self {
            CallingConvention::Win64 => &[Xmm::Xmm0, Xmm::Xmm1, Xmm::Xmm2, Xmm::Xmm3],
            CallingConvention::SysV => {
                &[Xmm::Xmm0, Xmm::Xmm1, Xmm::Xmm2, Xmm::Xmm3, Xmm::Xmm4, Xmm::Xmm5, Xmm::Xmm6, Xmm::Xmm7]
            }
        }
    }

    /// Windows x64 shares one counter between integer and float argument
    /// slots (argument N always lands in the Nth slot of whichever bank
    /// matches its type); System V keeps independent counters per bank.
    pub fn shares_argument_slot_counter(self) -> bool {
        matches!(self, CallingConvention::Win64)
    }

    pub fn shadow_space_bytes(self) -> i32 {
        match self {
            CallingConvention::Win64 => WIN64_SHADOW_SPACE_BYTES,
            CallingConvention::SysV => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    /// Low 3 bits of the register number, encoded in the ModRM/SIB/opcode
    /// field; the high bit goes into the REX prefix.
    pub fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    pub fn needs_rex_extension(self) -> bool {
        (self as u8) & 0x8 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Xmm {
    Xmm0 = 0,
    Xmm1 = 1,
    Xmm2 = 2,
    Xmm3 = 3,
    Xmm4 = 4,
    Xmm5 = 5,
    Xmm6 = 6,
    Xmm7 = 7,
}
