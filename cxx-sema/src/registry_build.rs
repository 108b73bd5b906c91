//! Populates a [`TypeRegistry`] from parsed declarations. Two passes: the
//! first reserves a `TypeIndex` for every class so base-class references
//! resolve regardless of declaration order (forward references are
//! ordinary in C++ member lists), the second fills in each class's fields,
//! bases, and vtable slots now that every name in scope has an index.
//!
//! Layout is deliberately simple: bases are laid out sequentially in
//! declaration order (no empty-base optimization, no virtual-inheritance
//! shared subobjects), and a virtual method gets a fresh vtable slot unless
//! its name+signature already occupies one inherited from the first base
//! (single-inheritance override reuse only — a class overriding a method
//! from its second or later base gets a second slot rather than sharing
//! the base's, which a real Itanium/MSVC layout would not do).

use crate::types::{
    BaseClassEntry, FieldEntry, InstantiationPhase, MemberFunctionEntry, PrimitiveKind,
    StructTypeInfo, TypeIndex, TypeInfo, TypeKind, TypeRegistry,
};
use cxx_ast::{AstArena, BaseTypeRef, Decl, DeclId, Interner, Symbol, TypeSpec};

const PRIMITIVES: &[(&str, PrimitiveKind)] = &[
    ("void", PrimitiveKind::Void),
    ("bool", PrimitiveKind::Bool),
    ("char", PrimitiveKind::Char),
    ("signed char", PrimitiveKind::SChar),
    ("unsigned char", PrimitiveKind::UChar),
    ("short", PrimitiveKind::Short),
    ("unsigned short", PrimitiveKind::UShort),
    ("int", PrimitiveKind::Int),
    ("unsigned int", PrimitiveKind::UInt),
    ("long", PrimitiveKind::Long),
    ("unsigned long", PrimitiveKind::ULong),
    ("long long", PrimitiveKind::LongLong),
    ("unsigned long long", PrimitiveKind::ULongLong),
    ("float", PrimitiveKind::Float),
    ("double", PrimitiveKind::Double),
    ("long double", PrimitiveKind::LongDouble),
];

/// Walks every `Decl::Class` reachable from `root` (through namespaces and
/// nested classes) and builds a fully-populated registry: struct layout,
/// base offsets, and vtable slots for every class in the translation unit.
pub fn populate_from_ast(arena: &AstArena, interner: &Interner, root: DeclId, long_is_64: bool) -> TypeRegistry {
    let mut reg = TypeRegistry::new();
    for (name, kind) in PRIMITIVES {
        let (size_bits, align_bits) = kind.size_align_bits(long_is_64);
        reg.push(
            Some(interner.intern(name)),
            TypeInfo { kind: TypeKind::Primitive(*kind), size_bits, align_bits, origin: None },
        );
    }

    let mut class_ids = Vec::new();
    collect_classes(arena, root, &mut class_ids);

    for &id in &class_ids {
        let class = arena.get(id).as_class().unwrap_or_else(|| unreachable!("collect_classes only yields classes"));
        reg.push(Some(class.name), TypeInfo {
            kind: TypeKind::Struct(StructTypeInfo::default()),
            size_bits: 0,
            align_bits: 8,
            origin: Some(id),
        });
    }

    for &id in &class_ids {
        build_class_layout(arena, interner, &mut reg, id);
    }

    reg
}

fn collect_classes(arena: &AstArena, id: DeclId, out: &mut Vec<DeclId>) {
    match arena.get(id) {
        Decl::Namespace(ns) => {
            for &child in ns.items.borrow().iter() {
                collect_classes(arena, child, out);
            }
        }
        Decl::Class(class) => {
            out.push(id);
            for &child in class.nested.borrow().iter() {
                collect_classes(arena, child, out);
            }
        }
        _ => {}
    }
}

fn type_size_align(reg: &TypeRegistry, ty: &TypeSpec) -> (u32, u32) {
    if !ty.pointer_levels.is_empty() || ty.reference.is_some() {
        return (64, 64);
    }
    match &ty.base {
        BaseTypeRef::Named(sym) => match reg.resolve_by_name(*sym) {
            Some(idx) => {
                let info = reg.get(idx);
                (info.size_bits, info.align_bits.max(8))
            }
            // Forward-referenced or unresolved name: a conservative
            // pointer-sized placeholder rather than a hard error, matching
            // this pass's best-effort layout stance.
            None => (64, 64),
        },
        BaseTypeRef::Qualified(_) => (64, 64),
        _ => (32, 32),
    }
}

fn build_class_layout(arena: &AstArena, interner: &Interner, reg: &mut TypeRegistry, id: DeclId) {
    let class = arena.get(id).as_class().unwrap_or_else(|| unreachable!("collect_classes only yields classes"));
    let self_idx = reg.resolve_by_name(class.name).unwrap_or_else(|| unreachable!("class registered in the first pass"));

    let mut bases = Vec::new();
    let mut cursor_bits: u32 = 0;
    let mut align_bits: u32 = 8;
    // A class with any virtual method carries a vtable pointer as its
    // first word, per the Itanium/MSVC primary-vtable-pointer convention.
    let has_own_virtual = class_has_virtual_method(arena, class);
    let base_has_vtable = class
        .bases
        .iter()
        .filter_map(|b| reg.resolve_by_name(b.name))
        .any(|idx| reg.get(idx).as_struct().map(|s| !s.vtable.is_empty()).unwrap_or(false));
    if has_own_virtual && !base_has_vtable {
        cursor_bits += 64;
        align_bits = align_bits.max(64);
    }

    let mut slot_of: std::collections::HashMap<Symbol, u32> = std::collections::HashMap::new();
    let mut vtable: Vec<DeclId> = Vec::new();

    for base_spec in &class.bases {
        let Some(base_idx) = reg.resolve_by_name(base_spec.name) else { continue };
        let (base_size, base_align) = {
            let info = reg.get(base_idx);
            (info.size_bits, info.align_bits.max(8))
        };
        let offset = align_up(cursor_bits, base_align);
        bases.push(BaseClassEntry { base: base_idx, access: base_spec.access, offset_bits: offset, is_virtual: base_spec.is_virtual });
        cursor_bits = offset + base_size;
        align_bits = align_bits.max(base_align);

        if let Some(base_struct) = reg.get(base_idx).as_struct() {
            for (i, &method_id) in base_struct.vtable.iter().enumerate() {
                if let Some(name) = arena.get(method_id).as_function().map(|f| f.name) {
                    slot_of.insert(name, i as u32);
                }
            }
            vtable = base_struct.vtable.clone();
        }
    }

    let mut fields = Vec::new();
    for field in class.fields.borrow().iter() {
        let (size_bits, field_align) = type_size_align(reg, &field.ty);
        let offset = align_up(cursor_bits, field_align.max(8));
        fields.push(FieldEntry { name: field.name, ty: reg.resolve_by_name(field_base_name(&field.ty, interner)).unwrap_or(self_idx), offset_bits: offset });
        cursor_bits = offset + size_bits.max(8);
        align_bits = align_bits.max(field_align);
    }

    let mut methods = Vec::new();
    for &method_id in class.methods.borrow().iter() {
        let Some(func) = arena.get(method_id).as_function() else { continue };
        let vtable_slot = if func.is_virtual || func.is_override {
            let slot = *slot_of.entry(func.name).or_insert_with(|| {
                let next = vtable.len() as u32;
                vtable.push(method_id);
                next
            });
            // An override replaces the base's entry at its inherited slot.
            if let Some(entry) = vtable.get_mut(slot as usize) {
                *entry = method_id;
            }
            Some(slot)
        } else {
            None
        };
        methods.push(MemberFunctionEntry { decl: method_id, vtable_slot });
    }

    let size_bits = align_up(cursor_bits, align_bits).max(8);
    let info = reg.get_mut(self_idx);
    info.size_bits = size_bits;
    info.align_bits = align_bits;
    if let TypeKind::Struct(s) = &mut info.kind {
        s.bases = bases;
        s.fields = fields;
        s.methods = methods;
        s.vtable = vtable;
        s.phase = Some(InstantiationPhase::Full);
    }
}

fn class_has_virtual_method(arena: &AstArena, class: &cxx_ast::ClassDecl) -> bool {
    class.methods.borrow().iter().any(|&id| {
        arena.get(id).as_function().map(|f| f.is_virtual || f.is_override).unwrap_or(false)
    })
}

fn field_base_name(ty: &TypeSpec, interner: &Interner) -> Symbol {
    match &ty.base {
        BaseTypeRef::Named(sym) => *sym,
        BaseTypeRef::Qualified(path) => *path.last().unwrap_or(&interner.intern("auto")),
        _ => interner.intern("auto"),
    }
}

fn align_up(offset: u32, align_bits: u32) -> u32 {
    if align_bits == 0 {
        return offset;
    }
    (offset + align_bits - 1) / align_bits * align_bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::{Access, ClassDecl, FieldDecl, FunctionDeclBuilder, NamespaceDecl, TypeSpec};
    use std::cell::RefCell;

    fn class_decl(interner: &Interner, name: &str, bases: Vec<cxx_ast::BaseSpec>) -> ClassDecl {
        ClassDecl {
            name: interner.intern(name),
            owner_namespace: vec![],
            bases,
            fields: RefCell::new(vec![]),
            methods: RefCell::new(vec![]),
            nested: RefCell::new(vec![]),
            static_data: RefCell::new(vec![]),
            template_params: vec![],
            constraint: None,
            is_polymorphic_hint: std::cell::Cell::new(false),
            specialization_of: None,
            specialization_args: vec![],
        }
    }

    #[test]
    fn class_with_an_int_field_gets_a_nonzero_size() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let mut class = class_decl(&interner, "Point", vec![]);
        class.fields.borrow_mut().push(FieldDecl {
            name: interner.intern("x"),
            ty: TypeSpec { base: BaseTypeRef::Int, ..TypeSpec::named(interner.intern("int")) },
            access: Access::Public,
            bit_width: None,
            init: None,
        });
        let (class_id, _) = arena.alloc_decl(Decl::Class(class));
        let (root_id, _) = arena.alloc_decl(Decl::Namespace(NamespaceDecl { name: None, items: RefCell::new(vec![class_id]) }));

        let reg = populate_from_ast(&arena, &interner, root_id, true);
        let idx = reg.resolve_by_name(interner.intern("Point")).unwrap();
        assert!(reg.get(idx).size_bits >= 32);
    }

    #[test]
    fn a_virtual_override_reuses_its_base_slot() {
        let interner = Interner::new();
        let arena = AstArena::new();

        let mut base = class_decl(&interner, "Base", vec![]);
        let base_method = FunctionDeclBuilder {
            name: interner.intern("speak"),
            params: vec![],
            return_type: TypeSpec::named(interner.intern("void")),
            is_variadic: false,
            is_virtual: true,
            is_pure_virtual: false,
            is_override: false,
            is_const: false,
            is_static: false,
            is_explicit: false,
            is_noexcept: false,
            ref_qualifier: None,
            access: Access::Public,
            owner_class: None,
            owner_namespace: vec![],
            template_params: vec![],
            constraint: None,
            body_tokens: None,
            body: None,
        }
        .build();
        let (base_method_id, _) = arena.alloc_decl(Decl::Function(base_method));
        base.methods.borrow_mut().push(base_method_id);
        let (base_id, _) = arena.alloc_decl(Decl::Class(base));

        let mut derived = class_decl(&interner, "Derived", vec![cxx_ast::BaseSpec { name: interner.intern("Base"), access: Access::Public, is_virtual: false }]);
        let derived_method = FunctionDeclBuilder {
            name: interner.intern("speak"),
            params: vec![],
            return_type: TypeSpec::named(interner.intern("void")),
            is_variadic: false,
            is_virtual: false,
            is_pure_virtual: false,
            is_override: true,
            is_const: false,
            is_static: false,
            is_explicit: false,
            is_noexcept: false,
            ref_qualifier: None,
            access: Access::Public,
            owner_class: None,
            owner_namespace: vec![],
            template_params: vec![],
            constraint: None,
            body_tokens: None,
            body: None,
        }
        .build();
        let (derived_method_id, _) = arena.alloc_decl(Decl::Function(derived_method));
        derived.methods.borrow_mut().push(derived_method_id);
        let (derived_id, _) = arena.alloc_decl(Decl::Class(derived));

        let (root_id, _) = arena.alloc_decl(Decl::Namespace(NamespaceDecl { name: None, items: RefCell::new(vec![base_id, derived_id]) }));
        let reg = populate_from_ast(&arena, &interner, root_id, true);

        let derived_idx = reg.resolve_by_name(interner.intern("Derived")).unwrap();
        let derived_struct = reg.get(derived_idx).as_struct().unwrap();
        assert_eq!(derived_struct.vtable.len(), 1);
        assert_eq!(derived_struct.vtable[0], derived_method_id);
    }
}
