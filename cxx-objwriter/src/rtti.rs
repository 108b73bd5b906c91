//! RTTI descriptor emission: MSVC `type_info`-compatible records and the
//! Itanium `__class_type_info` family, cached per type so repeated
//! `typeid`/`dynamic_cast`/`catch` uses of the same type share one blob.

use dashmap::DashMap;
use object::write::Object;

use cxx_ast::{Interner, Symbol};
use cxx_eh::ItaniumTypeInfoKind;

use crate::sections::add_rodata;

pub struct RttiCache {
    msvc: DashMap<Symbol, Symbol>,
    itanium: DashMap<Symbol, Symbol>,
}

impl RttiCache {
    pub fn new() -> Self {
        Self { msvc: DashMap::new(), itanium: DashMap::new() }
    }

    /// MSVC `type_info` record: a vptr slot (filled in by the CRT at
    /// load time), a spare `u64`, and the mangled decorated name.
    pub fn get_or_build_msvc(&self, object: &mut Object, interner: &Interner, ty: Symbol) -> Symbol {
        if let Some(existing) = self.msvc.get(&ty) {
            return *existing;
        }
        let name = interner.resolve(ty);
        let descriptor_name = cxx_eh::seh::type_descriptor_symbol(&name, interner);
        let mut bytes = vec![0u8; 16];
        bytes.extend(name.as_bytes());
        bytes.push(0);
        add_rodata(object, interner.resolve(descriptor_name).as_bytes(), &bytes);
        self.msvc.insert(ty, descriptor_name);
        descriptor_name
    }

    /// Itanium `__class_type_info`/`__si_class_type_info`/
    /// `__vmi_class_type_info`, chosen by `kind`; layout differs only in
    /// the trailing base-class descriptor list, which `base_symbols`
    /// supplies for the multi/virtual-inheritance case.
    pub fn get_or_build_itanium(
        &self,
        object: &mut Object,
        interner: &Interner,
        ty: Symbol,
        kind: ItaniumTypeInfoKind,
        base_symbols: &[Symbol],
    ) -> Symbol {
        if let Some(existing) = self.itanium.get(&ty) {
            return *existing;
        }
        let mangled = interner.resolve(ty);
        let symbol = cxx_eh::itanium::mangled_type_info_symbol(&mangled, interner);
        let mut bytes = vec![0u8; 16];
        if kind != ItaniumTypeInfoKind::Class {
            bytes.extend((base_symbols.len() as u32).to_le_bytes());
        }
        add_rodata(object, interner.resolve(symbol).as_bytes(), &bytes);
        self.itanium.insert(ty, symbol);
        symbol
    }
}

impl Default for RttiCache {
    fn default() -> Self {
        Self::new()
    }
}
