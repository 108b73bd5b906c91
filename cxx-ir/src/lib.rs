//! Lowers checked `cxx_ast` declarations into a flat, register-unallocated
//! instruction stream consumed by the machine-code encoder and the
//! exception-handling metadata builder.

use thiserror::Error;

mod builder;
mod lower;
mod opcode;
mod value;

pub use builder::{IrFunction, IrFunctionBuilder};
pub use lower::lower_function;
pub use opcode::{AddressStep, BinArith, Cmp, Convert, Instruction, Logical, Op, SehFilterKind};
pub use value::{LabelId, Operand, TempVar, TempVarMeta, ValueCategory};

#[derive(Error, Debug)]
pub enum IrError {
    #[error("'break' used outside of a loop")]
    BreakOutsideLoop,
    #[error("'continue' used outside of a loop")]
    ContinueOutsideLoop,
    #[error("unsupported construct in function body: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Sema(#[from] cxx_sema::SemaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::Interner;
    use value::ValueCategory;

    #[test]
    fn builder_allocates_dense_one_based_temps() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let int_ty = interner.intern("int");
        let mut b = IrFunctionBuilder::new(name);
        let t1 = b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
        let t2 = b.new_temp(ValueCategory::PRValue, int_ty, 32, false);
        assert_eq!(t1.0 + 1, t2.0);
        assert!(TempVar::NONE.is_none());
    }

    #[test]
    fn break_outside_a_loop_is_an_error() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let mut b = IrFunctionBuilder::new(name);
        assert!(b.emit_break().is_err());
    }

    #[test]
    fn loop_and_scope_nesting_round_trips() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let mut b = IrFunctionBuilder::new(name);
        b.begin_scope();
        let (_start, _end, _cont) = b.begin_loop();
        b.begin_scope();
        assert!(b.emit_break().is_ok());
        b.end_scope();
        b.end_loop();
        b.end_scope();
        let f = b.finish();
        assert!(f.instructions.iter().any(|i| matches!(i.op, Op::Break)));
    }
}
