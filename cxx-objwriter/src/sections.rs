//! Assembles `cxx-codegen`'s per-function `MachineFunction`s and `cxx-eh`'s
//! unwind tables into sections of a COFF or ELF relocatable object, via
//! `object::write::Object`.

use std::collections::HashMap;

use object::write::{Object, Relocation as ObjRelocation, SectionId, StandardSection, Symbol as ObjSymbol, SymbolId, SymbolSection};
use object::{RelocationEncoding, RelocationFlags, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

use cxx_ast::{Interner, Symbol};
use cxx_codegen::{MachineFunction, RelocKind};

use crate::WriteError;

/// Appends one function's code to `.text`, declares its symbol, and
/// records its relocations against whatever symbols the object already
/// knows or will come to know (forward references resolve once every
/// function in the translation unit has been added).
pub fn add_function(
    object: &mut Object,
    interner: &Interner,
    function: &MachineFunction,
) -> Result<(), WriteError> {
    let text = object.section_id(StandardSection::Text);
    let offset = object.append_section_data(text, &function.code, 16);

    let name = interner.resolve(function.name).as_bytes().to_vec();
    let symbol_id = object.add_symbol(ObjSymbol {
        name,
        value: offset,
        size: function.code.len() as u64,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    for reloc in &function.relocations {
        let target_name = interner.resolve(reloc.symbol).as_bytes().to_vec();
        let target_symbol = object.symbol_id(&target_name).unwrap_or_else(|| {
            object.add_symbol(ObjSymbol {
                name: target_name,
                value: 0,
                size: 0,
                kind: SymbolKind::Text,
                scope: SymbolScope::Linkage,
                weak: false,
                section: SymbolSection::Undefined,
                flags: SymbolFlags::None,
            })
        });
        let (encoding, size) = match reloc.kind {
            RelocKind::Rel32Coff | RelocKind::Pc32Elf => (RelocationEncoding::X86Branch, 32),
            RelocKind::Addr64 => (RelocationEncoding::Generic, 64),
            RelocKind::Addr32Nb => (RelocationEncoding::Generic, 32),
        };
        object
            .add_relocation(
                text,
                ObjRelocation {
                    offset: offset + reloc.offset,
                    symbol: target_symbol,
                    addend: reloc.addend,
                    flags: RelocationFlags::Generic { kind: reloc_kind_generic(reloc.kind), encoding, size },
                },
            )
            .map_err(|e| WriteError::Relocation(e.to_string()))?;
    }

    let _ = symbol_id;
    Ok(())
}

fn reloc_kind_generic(kind: RelocKind) -> object::RelocationKind {
    match kind {
        RelocKind::Rel32Coff | RelocKind::Pc32Elf => object::RelocationKind::PltRelative,
        RelocKind::Addr64 | RelocKind::Addr32Nb => object::RelocationKind::Absolute,
    }
}

/// Declares the runtime support symbols (`operator new`/`delete`,
/// `__CxxFrameHandler3`, `_CxxThrowException`, `__cxa_throw`,
/// `__gxx_personality_v0`, ...) as undefined externs so the linker can
/// resolve them against the C++ runtime.
pub fn declare_undefined(object: &mut Object, name: &str) {
    if object.symbol_id(name.as_bytes()).is_some() {
        return;
    }
    object.add_symbol(ObjSymbol {
        name: name.as_bytes().to_vec(),
        value: 0,
        size: 0,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Undefined,
        flags: SymbolFlags::None,
    });
}

/// Appends a read-only data blob (vtable, RTTI descriptor, throw-info) to
/// `.rdata`/`.data.rel.ro` and declares a symbol pointing at it.
pub fn add_rodata(object: &mut Object, name: &[u8], bytes: &[u8]) -> u64 {
    let section = object.section_id(StandardSection::ReadOnlyData);
    let offset = object.append_section_data(section, bytes, 8);
    object.add_symbol(ObjSymbol {
        name: name.to_vec(),
        value: offset,
        size: bytes.len() as u64,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(section),
        flags: SymbolFlags::None,
    });
    offset
}

pub fn section_kind_for(name: &str) -> SectionKind {
    match name {
        ".pdata" | ".xdata" => SectionKind::ReadOnlyData,
        _ => SectionKind::Data,
    }
}

/// Resolves `name` against the object's existing symbol table, declaring it
/// undefined if this is the first reference — the same fallback
/// [`add_function`] uses inline for its own call-target relocations.
fn resolve_or_declare_symbol(object: &mut Object, name: &[u8]) -> SymbolId {
    object.symbol_id(name).unwrap_or_else(|| {
        object.add_symbol(ObjSymbol {
            name: name.to_vec(),
            value: 0,
            size: 0,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Undefined,
            flags: SymbolFlags::None,
        })
    })
}

/// Gets or creates a custom named section (`.pdata`, `.xdata`, `.eh_frame`),
/// caching the id in `sections` so repeated calls for the same name append
/// to one section instead of fragmenting across many.
pub fn get_or_add_named_section(
    object: &mut Object,
    sections: &mut HashMap<String, SectionId>,
    name: &str,
    kind: SectionKind,
) -> SectionId {
    if let Some(&id) = sections.get(name) {
        return id;
    }
    let id = object.add_section(Vec::new(), name.as_bytes().to_vec(), kind);
    sections.insert(name.to_string(), id);
    id
}

/// Appends `bytes` to an already-created named section, returning the
/// offset the data landed at.
pub fn append_named_section_data(object: &mut Object, section: SectionId, bytes: &[u8]) -> u64 {
    object.append_section_data(section, bytes, 8)
}

/// Declares a data symbol pointing at an offset inside a named section, so
/// other sections (or the next EH table entry) can reference it.
pub fn add_named_section_symbol(object: &mut Object, section: SectionId, name: &[u8], offset: u64, size: u64) -> SymbolId {
    object.add_symbol(ObjSymbol {
        name: name.to_vec(),
        value: offset,
        size,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(section),
        flags: SymbolFlags::None,
    })
}

fn add_relocation_in(object: &mut Object, section: SectionId, offset: u64, target: SymbolId, kind: RelocKind) -> Result<(), WriteError> {
    let (encoding, size) = match kind {
        RelocKind::Rel32Coff | RelocKind::Pc32Elf => (RelocationEncoding::X86Branch, 32),
        RelocKind::Addr64 => (RelocationEncoding::Generic, 64),
        RelocKind::Addr32Nb => (RelocationEncoding::Generic, 32),
    };
    object
        .add_relocation(
            section,
            ObjRelocation {
                offset,
                symbol: target,
                addend: 0,
                flags: RelocationFlags::Generic { kind: reloc_kind_generic(kind), encoding, size },
            },
        )
        .map_err(|e| WriteError::Relocation(e.to_string()))
}

/// Applies the slot relocations a vtable (or RTTI base-class list) recorded
/// against the read-only-data section those blobs were written into.
pub fn apply_rodata_relocations(object: &mut Object, interner: &Interner, relocations: &[(u64, Symbol, RelocKind)]) -> Result<(), WriteError> {
    let section = object.section_id(StandardSection::ReadOnlyData);
    for (offset, target, kind) in relocations {
        let target_name = interner.resolve(*target).as_bytes().to_vec();
        let symbol = resolve_or_declare_symbol(object, &target_name);
        add_relocation_in(object, section, *offset, symbol, *kind)?;
    }
    Ok(())
}
