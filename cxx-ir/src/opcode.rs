//! The closed opcode set a function's IR is built from, grouped by family.
//! One variant per opcode, flat payloads only — no inheritance between
//! variants.

use crate::value::{LabelId, Operand, TempVar};
use cxx_ast::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinArith {
    AddInt,
    AddUInt,
    AddFloat,
    SubInt,
    SubUInt,
    SubFloat,
    MulInt,
    MulUInt,
    MulFloat,
    DivInt,
    DivUInt,
    DivFloat,
    ModInt,
    ModUInt,
    Shl,
    ShrArith,
    ShrLogical,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    EqInt,
    NeInt,
    LtInt,
    LeInt,
    GtInt,
    GeInt,
    LtUInt,
    LeUInt,
    GtUInt,
    GeUInt,
    EqFloatOrdered,
    NeFloatUnordered,
    LtFloatOrdered,
    LeFloatOrdered,
    GtFloatOrdered,
    GeFloatOrdered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convert {
    SignExtend,
    ZeroExtend,
    Truncate,
    IntToFloat,
    FloatToInt,
    FloatWiden,
    FloatNarrow,
    BitcastPointer,
}

/// One step of a chained `a[i].m.n` address computation.
#[derive(Debug, Clone)]
pub enum AddressStep {
    FieldOffset { field: Symbol, offset_bits: u32 },
    ArrayIndex { elem_size_bits: u32, index: Operand },
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SehFilterKind {
    /// A constant filter value, e.g. `EXCEPTION_EXECUTE_HANDLER`.
    Constant(i32),
    /// A non-constant filter expression, lowered to its own funclet.
    Expression,
}

/// Every instruction the builder can emit, as one enum whose variants
/// carry their own typed fields directly rather than a separate struct
/// per opcode plus a discriminant.
#[derive(Debug, Clone)]
pub enum Op {
    // ---- Arithmetic / bitwise / comparison / logical ----
    BinaryOp { kind: BinArith, lhs: Operand, rhs: Operand },
    Compare { kind: Cmp, lhs: Operand, rhs: Operand },
    LogicalOp { kind: Logical, lhs: Operand, rhs: Option<Operand> },
    Negate { operand: Operand },
    BitNot { operand: Operand },
    Convert { kind: Convert, operand: Operand },

    // ---- Memory ----
    StackAlloc { size_bits: u32, align_bits: u32 },
    Store { address: Operand, value: Operand },
    Load { address: Operand },
    Dereference { pointer: Operand },
    AddressOf { value: Operand },
    ComputeAddress { base: Operand, chain: Vec<AddressStep> },

    // ---- Control flow ----
    Branch { target: LabelId },
    ConditionalBranch { cond: Operand, if_true: LabelId, if_false: LabelId },
    Label { id: LabelId },
    ScopeBegin,
    ScopeEnd,
    LoopBegin { start: LabelId, end: LabelId, continue_label: LabelId },
    LoopEnd,
    Break,
    Continue,
    Return { value: Option<Operand> },

    // ---- Function abstractions ----
    FunctionCall { callee: Symbol, args: Vec<Operand>, return_slot: Option<TempVar> },
    IndirectCall { callee: Operand, args: Vec<Operand> },
    VirtualCall { vtable_slot: u32, object: Operand, args: Vec<Operand> },
    FunctionAddress { function: Symbol },

    // ---- Struct / class ----
    MemberAccess { object: Operand, field: Symbol, offset_bits: u32 },
    MemberStore { object: Operand, field: Symbol, offset_bits: u32, value: Operand },
    ConstructorCall { ty: Symbol, object: Operand, args: Vec<Operand> },
    DestructorCall { ty: Symbol, object: Operand },

    // ---- Heap lifecycle ----
    HeapAlloc { size_bits: u32 },
    HeapAllocArray { elem_size_bits: u32, count: Operand },
    HeapFree { pointer: Operand },
    HeapFreeArray { pointer: Operand },
    PlacementNew { address: Operand, ty: Symbol, args: Vec<Operand> },

    // ---- RTTI ----
    Typeid { ty: Symbol },
    DynamicCast { object: Operand, target_ty: Symbol },

    // ---- Globals ----
    GlobalVariableDecl { name: Symbol, size_bits: u32, init: Option<Operand> },
    GlobalLoad { name: Symbol },
    GlobalStore { name: Symbol, value: Operand },

    // ---- Itanium-style exceptions ----
    TryBegin,
    TryEnd,
    CatchBegin { exception_ty: Option<Symbol> },
    CatchEnd,
    Throw { value: Option<Operand> },
    Rethrow,

    // ---- Windows SEH ----
    SehTryBegin,
    SehTryEnd,
    SehExceptBegin { filter: SehFilterKind },
    SehExceptEnd,
    SehFinallyBegin,
    SehFinallyEnd,
    SehFinallyCall,
    SehFilterBegin,
    SehFilterEnd,
    SehLeave,
    SehGetExceptionCode,
    SehGetExceptionInfo,
    SehSaveExceptionCode,
    SehGetExceptionCodeBody,
    SehAbnormalTermination,
}

/// One IR instruction: the opcode's payload plus the `dst` temp it defines
/// (if any) and the source token used for diagnostics during codegen.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Op,
    pub dst: Option<TempVar>,
    pub line: u32,
    pub column: u32,
}
