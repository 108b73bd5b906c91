//! Structural x86-64 instruction selection: turns one `cxx_ir::IrFunction`
//! into code bytes, relocations, and EH state markers. No register
//! allocator runs here; every IR temp gets its own stack slot and values
//! are always routed through RAX/RCX/RDX at the point of use.

use thiserror::Error;

pub mod abi;
pub mod frame;
pub mod function;
pub mod relocation;
pub mod rex;

pub use abi::{CallingConvention, Reg, Xmm};
pub use frame::{FrameLayout, FuncletFrame, ProloguKind};
pub use function::{EhMarker, EhMarkerEntry, FunctionEncoder, MachineFunction, RuntimeSymbols};
pub use relocation::{RelocKind, Relocation};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("branch target label {0} was never bound")]
    UnresolvedLabel(u32),
    #[error("unsupported construct reached codegen: {0}")]
    Unsupported(String),
}

pub fn encode_function(
    ir: &cxx_ir::IrFunction,
    interner: &cxx_ast::Interner,
    runtime: &RuntimeSymbols,
    convention: CallingConvention,
    prologue: ProloguKind,
) -> Result<MachineFunction, EncodeError> {
    FunctionEncoder::new(ir, interner, runtime, convention, prologue).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::Interner;
    use cxx_ir::IrFunctionBuilder;

    #[test]
    fn encodes_a_trivial_return_zero() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let mut b = IrFunctionBuilder::new(name);
        b.emit_return(Some(cxx_ir::Operand::Immediate(cxx_ast::ConstValue::Int(0))));
        let ir = b.finish();
        let runtime = RuntimeSymbols::new(&interner);
        let mf = encode_function(&ir, &interner, &runtime, CallingConvention::SysV, ProloguKind::NonEh).unwrap();
        // push rbp; mov rbp, rsp; mov rax, 0; pop rbp; ret
        assert_eq!(mf.code[0], 0x55);
        assert_eq!(*mf.code.last().unwrap(), 0xC3);
    }

    #[test]
    fn unresolved_label_is_reported() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let mut b = IrFunctionBuilder::new(name);
        let stray = b.new_label();
        b.emit(cxx_ir::Op::Branch { target: stray });
        let ir = b.finish();
        let runtime = RuntimeSymbols::new(&interner);
        let err = encode_function(&ir, &interner, &runtime, CallingConvention::Win64, ProloguKind::NonEh).unwrap_err();
        assert!(matches!(err, EncodeError::UnresolvedLabel(_)));
    }
}
