//! The type registry: an append-only `TypeInfo[]` keyed by [`TypeIndex`],
//! plus a name -> `TypeIndex` lookup. Generalizes `vex-compiler`'s
//! `type_registry.rs` (a `HashSet` of builtin names for O(1) "is this a
//! type" checks) and `types/interner.rs` (a `DashMap`-backed `TypeInterner`)
//! into the richer model the type registry requires: struct layout, base
//! classes with access and offset, vtable slots, and lazy-member
//! descriptors. The `DashMap` for name lookup is kept even though the
//! surrounding pipeline is single-threaded, for consistency with the rest
//! of this codebase's concurrent data structures rather than downgrading
//! to a plain `HashMap`.

use cxx_ast::{Access, DeclId, Symbol, TemplateArg};
use dashmap::DashMap;

/// Index into [`TypeRegistry`]'s entry vector. Never reassigned; new
/// instantiations always append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
}

impl PrimitiveKind {
    /// `(size_bits, align_bits)` under the LP64/LLP64 split this core
    /// targets (`long` is 32 bits wide on Windows x64, 64 on System V; the
    /// registry is built per-target by [`TypeRegistry::new`]).
    pub fn size_align_bits(self, long_is_64: bool) -> (u32, u32) {
        match self {
            PrimitiveKind::Void => (0, 8),
            PrimitiveKind::Bool | PrimitiveKind::Char | PrimitiveKind::SChar | PrimitiveKind::UChar => {
                (8, 8)
            }
            PrimitiveKind::Short | PrimitiveKind::UShort => (16, 16),
            PrimitiveKind::Int | PrimitiveKind::UInt | PrimitiveKind::Float => (32, 32),
            PrimitiveKind::Long | PrimitiveKind::ULong => {
                if long_is_64 {
                    (64, 64)
                } else {
                    (32, 32)
                }
            }
            PrimitiveKind::LongLong | PrimitiveKind::ULongLong | PrimitiveKind::Double => (64, 64),
            PrimitiveKind::LongDouble => (128, 16),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaseClassEntry {
    pub base: TypeIndex,
    pub access: Access,
    pub offset_bits: u32,
    pub is_virtual: bool,
}

#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub name: Symbol,
    pub ty: TypeIndex,
    pub offset_bits: u32,
}

#[derive(Debug, Clone)]
pub struct MemberFunctionEntry {
    pub decl: DeclId,
    /// `Some(n)` for virtual functions: their slot in the primary vtable.
    pub vtable_slot: Option<u32>,
}

/// Phased class-template instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstantiationPhase {
    Forward,
    Layout,
    Full,
}

/// A member template or static data member, instantiated only on first use.
#[derive(Debug, Clone)]
pub struct LazyMemberEntry {
    pub member: DeclId,
    pub instantiated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StructTypeInfo {
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MemberFunctionEntry>,
    pub bases: Vec<BaseClassEntry>,
    pub vtable: Vec<DeclId>,
    pub lazy_members: Vec<LazyMemberEntry>,
    pub phase: Option<InstantiationPhase>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Struct(StructTypeInfo),
    Enum {
        underlying: TypeIndex,
        variants: Vec<(Symbol, i64)>,
    },
    Pointer(TypeIndex),
    FunctionPointer {
        params: Vec<TypeIndex>,
        is_variadic: bool,
        return_type: TypeIndex,
    },
    /// A concrete class/function/variable/alias template instantiation.
    /// `base_template` and `args` let the mangler and the instantiation
    /// cache reconstruct the originating template.
    TemplateInstantiation {
        base_template: DeclId,
        args: Vec<TemplateArg>,
    },
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub size_bits: u32,
    pub align_bits: u32,
    /// The AST declaration this type was created from, if any (primitives
    /// have none).
    pub origin: Option<DeclId>,
}

impl TypeInfo {
    pub fn as_struct(&self) -> Option<&StructTypeInfo> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructTypeInfo> {
        match &mut self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }
}

pub struct TypeRegistry {
    entries: Vec<TypeInfo>,
    by_name: DashMap<Symbol, TypeIndex>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_name: DashMap::new(),
        }
    }

    /// Append a new entry, optionally associating it with a name for later
    /// lookup. The returned index is stable for the registry's lifetime.
    pub fn push(&mut self, name: Option<Symbol>, info: TypeInfo) -> TypeIndex {
        let idx = TypeIndex(self.entries.len() as u32);
        self.entries.push(info);
        if let Some(name) = name {
            self.by_name.insert(name, idx);
        }
        idx
    }

    pub fn get(&self, idx: TypeIndex) -> &TypeInfo {
        &self.entries[idx.0 as usize]
    }

    pub fn get_mut(&mut self, idx: TypeIndex) -> &mut TypeInfo {
        &mut self.entries[idx.0 as usize]
    }

    pub fn resolve_by_name(&self, name: Symbol) -> Option<TypeIndex> {
        self.by_name.get(&name).map(|r| *r)
    }

    /// Look up the entry built from a given AST declaration. Used by the
    /// lowering pass to recover a `this`-typed call's static class from
    /// the enclosing member function's `owner_class`, where only the
    /// `DeclId` (not the mangled type name) is in hand.
    pub fn resolve_by_origin(&self, origin: DeclId) -> Option<TypeIndex> {
        self.entries
            .iter()
            .position(|e| e.origin == Some(origin))
            .map(|i| TypeIndex(i as u32))
    }

    /// Iterates every registered entry alongside its index, used by the
    /// driver to emit a vtable/RTTI descriptor for each polymorphic class
    /// once layout has been built.
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &TypeInfo)> {
        self.entries.iter().enumerate().map(|(i, info)| (TypeIndex(i as u32), info))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_phase(&mut self, idx: TypeIndex, phase: InstantiationPhase) {
        if let Some(s) = self.get_mut(idx).as_struct_mut() {
            s.phase = Some(phase);
        }
    }

    /// Walk the base-class list (including transitively, depth-first) to
    /// decide whether `derived` publicly-or-otherwise derives from `base`.
    /// Used by the overload engine's derived-to-base pointer conversion and
    /// by `__is_base_of`.
    pub fn is_base_of(&self, base: TypeIndex, derived: TypeIndex) -> bool {
        if base == derived {
            return false;
        }
        let mut stack = vec![derived];
        let mut seen = std::collections::HashSet::new();
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if let Some(s) = self.get(cur).as_struct() {
                for b in &s.bases {
                    if b.base == base {
                        return true;
                    }
                    stack.push(b.base);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::Interner;

    #[test]
    fn instantiations_append_without_reassigning_existing_indices() {
        let interner = Interner::new();
        let mut reg = TypeRegistry::new();
        let int_name = interner.intern("int");
        let int_idx = reg.push(
            Some(int_name),
            TypeInfo {
                kind: TypeKind::Primitive(PrimitiveKind::Int),
                size_bits: 32,
                align_bits: 32,
                origin: None,
            },
        );
        assert_eq!(int_idx, TypeIndex(0));
        assert_eq!(reg.resolve_by_name(int_name), Some(int_idx));

        let vec_int = interner.intern("Vec<int>");
        let vec_idx = reg.push(
            Some(vec_int),
            TypeInfo {
                kind: TypeKind::TemplateInstantiation {
                    base_template: DeclId(7),
                    args: vec![],
                },
                size_bits: 192,
                align_bits: 64,
                origin: None,
            },
        );
        assert_eq!(vec_idx, TypeIndex(1));
        assert_eq!(reg.get(int_idx).size_bits, 32);
    }

    #[test]
    fn is_base_of_walks_transitive_bases() {
        let mut reg = TypeRegistry::new();
        let base = reg.push(
            None,
            TypeInfo {
                kind: TypeKind::Struct(StructTypeInfo::default()),
                size_bits: 0,
                align_bits: 8,
                origin: None,
            },
        );
        let mid = reg.push(
            None,
            TypeInfo {
                kind: TypeKind::Struct(StructTypeInfo {
                    bases: vec![BaseClassEntry {
                        base,
                        access: Access::Public,
                        offset_bits: 0,
                        is_virtual: false,
                    }],
                    ..Default::default()
                }),
                size_bits: 0,
                align_bits: 8,
                origin: None,
            },
        );
        let derived = reg.push(
            None,
            TypeInfo {
                kind: TypeKind::Struct(StructTypeInfo {
                    bases: vec![BaseClassEntry {
                        base: mid,
                        access: Access::Public,
                        offset_bits: 0,
                        is_virtual: false,
                    }],
                    ..Default::default()
                }),
                size_bits: 0,
                align_bits: 8,
                origin: None,
            },
        );
        assert!(reg.is_base_of(base, derived));
        assert!(!reg.is_base_of(derived, base));
    }
}
