//! Relocatable object-file assembly: takes the `MachineFunction`s and EH
//! tables produced upstream and writes a COFF (`.obj`) or ELF (`.o`) file
//! via `object::write::Object`.

use std::collections::HashMap;

use thiserror::Error;

pub mod rtti;
pub mod sections;
pub mod vtable;

pub use rtti::RttiCache;
pub use vtable::{VtableCache, VtableLayout};

use object::write::{Object, SectionId};
use object::{Architecture, BinaryFormat, Endianness};

use cxx_ast::{Interner, Symbol};
use cxx_codegen::MachineFunction;
use cxx_eh::ItaniumTypeInfoKind;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to record a relocation: {0}")]
    Relocation(String),
    #[error("failed to serialize the object file: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTarget {
    /// `x86_64-pc-windows-msvc`.
    CoffWin64,
    /// `x86_64-unknown-linux-gnu` and similar ELF targets.
    ElfSysV,
}

impl ObjectTarget {
    fn format(self) -> BinaryFormat {
        match self {
            ObjectTarget::CoffWin64 => BinaryFormat::Coff,
            ObjectTarget::ElfSysV => BinaryFormat::Elf,
        }
    }
}

/// Runtime support symbols every translation unit declares as undefined
/// externs, resolved by the linker against the C++ runtime/CRT.
pub const RUNTIME_EXTERNS_MSVC: &[&str] =
    &["__CxxFrameHandler3", "_CxxThrowException", "operator new", "operator delete"];

pub const RUNTIME_EXTERNS_ITANIUM: &[&str] =
    &["__gxx_personality_v0", "__cxa_throw", "__cxa_begin_catch", "__cxa_end_catch", "_Znwm", "_ZdlPv"];

pub struct ObjectWriter<'a> {
    target: ObjectTarget,
    interner: &'a Interner,
    object: Object<'a>,
    pub vtables: VtableCache,
    pub rtti: RttiCache,
    named_sections: HashMap<String, SectionId>,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(target: ObjectTarget, interner: &'a Interner) -> Self {
        let object = Object::new(target.format(), Architecture::X86_64, Endianness::Little);
        let mut writer = Self {
            target,
            interner,
            object,
            vtables: VtableCache::new(),
            rtti: RttiCache::new(),
            named_sections: HashMap::new(),
        };
        let externs = match target {
            ObjectTarget::CoffWin64 => RUNTIME_EXTERNS_MSVC,
            ObjectTarget::ElfSysV => RUNTIME_EXTERNS_ITANIUM,
        };
        for name in externs {
            sections::declare_undefined(&mut writer.object, name);
        }
        writer
    }

    pub fn add_function(&mut self, function: &MachineFunction) -> Result<(), WriteError> {
        sections::add_function(&mut self.object, self.interner, function)
    }

    /// Emits (or reuses) `layout`'s vtable blob and applies its per-slot
    /// relocations against the already-mangled member-function symbols.
    pub fn add_vtable(&mut self, layout: &VtableLayout) -> Result<Symbol, WriteError> {
        let mut relocations = Vec::new();
        let symbol = self.vtables.get_or_build(&mut self.object, self.interner, layout, &mut relocations);
        sections::apply_rodata_relocations(&mut self.object, self.interner, &relocations)?;
        Ok(symbol)
    }

    pub fn add_rtti_msvc(&mut self, ty: Symbol) -> Symbol {
        self.rtti.get_or_build_msvc(&mut self.object, self.interner, ty)
    }

    pub fn add_rtti_itanium(&mut self, ty: Symbol, kind: ItaniumTypeInfoKind, base_symbols: &[Symbol]) -> Symbol {
        self.rtti.get_or_build_itanium(&mut self.object, self.interner, ty, kind, base_symbols)
    }

    /// Writes one EH-metadata blob (`FuncInfo` + tables for MSVC, a CIE/FDE
    /// DWARF stream for Itanium) into a custom named section, declaring a
    /// symbol at its offset so other tables can reference it by name.
    pub fn add_eh_blob(&mut self, section_name: &str, symbol_name: &str, bytes: &[u8]) -> Result<(), WriteError> {
        let kind = sections::section_kind_for(section_name);
        let section = sections::get_or_add_named_section(&mut self.object, &mut self.named_sections, section_name, kind);
        let offset = sections::append_named_section_data(&mut self.object, section, bytes);
        sections::add_named_section_symbol(&mut self.object, section, symbol_name.as_bytes(), offset, bytes.len() as u64);
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, WriteError> {
        self.object.write().map_err(|e| WriteError::Serialize(e.to_string()))
    }

    pub fn target(&self) -> ObjectTarget {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_codegen::{CallingConvention, ProloguKind};
    use cxx_ir::IrFunctionBuilder;

    #[test]
    fn writes_an_empty_translation_unit_with_runtime_externs_declared() {
        let interner = Interner::new();
        let writer = ObjectWriter::new(ObjectTarget::ElfSysV, &interner);
        let bytes = writer.finish().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn adds_one_function_and_serializes() {
        let interner = Interner::new();
        let name = interner.intern("add");
        let mut b = IrFunctionBuilder::new(name);
        b.emit_return(Some(cxx_ir::Operand::Immediate(cxx_ast::ConstValue::Int(0))));
        let ir = b.finish();
        let runtime = cxx_codegen::RuntimeSymbols::new(&interner);
        let mf = cxx_codegen::encode_function(&ir, &interner, &runtime, CallingConvention::SysV, ProloguKind::NonEh).unwrap();

        let mut writer = ObjectWriter::new(ObjectTarget::ElfSysV, &interner);
        writer.add_function(&mf).unwrap();
        let bytes = writer.finish().unwrap();
        assert!(!bytes.is_empty());
    }
}
