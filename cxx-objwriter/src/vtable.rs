//! Virtual table layout: one pointer-sized slot per virtual function in
//! declaration order (overriding members reuse their base's slot), emitted
//! as an `.rdata`/`.data.rel.ro` blob with one `ADDR64` relocation per slot.

use dashmap::DashMap;
use object::write::Object;

use cxx_ast::{DeclId, Interner, Symbol};
use cxx_codegen::RelocKind;

use crate::sections::add_rodata;

#[derive(Debug, Clone)]
pub struct VtableLayout {
    pub class: DeclId,
    pub class_name: Symbol,
    /// Slot `i` holds the mangled name of the function bound there.
    pub slots: Vec<Symbol>,
}

/// Memoizes one vtable per class, mirroring the template-instantiation
/// cache's "build once, key by identity" discipline.
pub struct VtableCache {
    built: DashMap<DeclId, Symbol>,
}

impl VtableCache {
    pub fn new() -> Self {
        Self { built: DashMap::new() }
    }

    /// Emits `layout`'s vtable blob if it hasn't been built yet, returning
    /// the symbol naming it either way.
    pub fn get_or_build(&self, object: &mut Object, interner: &Interner, layout: &VtableLayout, relocations: &mut Vec<(u64, Symbol, RelocKind)>) -> Symbol {
        if let Some(existing) = self.built.get(&layout.class) {
            return *existing;
        }
        let class_name = interner.resolve(layout.class_name);
        let vtable_name = interner.intern(&format!("??_7{class_name}@@6B@"));
        let bytes = vec![0u8; layout.slots.len() * 8];
        let base_offset = add_rodata(object, interner.resolve(vtable_name).as_bytes(), &bytes);
        for (i, slot) in layout.slots.iter().enumerate() {
            relocations.push((base_offset + (i as u64 * 8), *slot, RelocKind::Addr64));
        }
        self.built.insert(layout.class, vtable_name);
        vtable_name
    }
}

impl Default for VtableCache {
    fn default() -> Self {
        Self::new()
    }
}
