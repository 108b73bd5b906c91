//! Operands and the temporary-numbering side table. `TempVar` carries no
//! metadata itself; value category, backing type, and size are read from
//! `TempVarMeta` in the owning `IrFunction`, a side table written once when
//! the temp is first defined and read-only afterward.

use cxx_ast::{ConstValue, Symbol};

/// Dense, 1-based, per-function. `TempVar(0)` is the "no result" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempVar(pub u32);

impl TempVar {
    pub const NONE: TempVar = TempVar(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    PRValue,
    LValue,
    XValue,
}

#[derive(Debug, Clone)]
pub enum Operand {
    Immediate(ConstValue),
    Temp(TempVar),
    /// A named local or parameter, resolved to a frame slot by the encoder.
    Named(Symbol),
    /// A global symbol reference (function or global variable).
    Global(Symbol),
}

/// Metadata attached to a `TempVar` on first definition; read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct TempVarMeta {
    pub category: ValueCategory,
    /// The backing type's spelling, used by the encoder to pick a register
    /// class and by the EH builder for catch-object typing. Kept as an
    /// interned name rather than a full `TypeSpec` — by the time IR is
    /// built the type has already been checked, so only its ABI shape
    /// (size, float-ness) and a display name are needed downstream.
    pub type_name: Symbol,
    pub size_bits: u32,
    pub is_float: bool,
}
