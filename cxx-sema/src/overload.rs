//! Overload resolution (`select_overload`): name
//! lookup (plus ADL through argument types' enclosing namespaces), then
//! ranking by the six ordered criteria.

use crate::symtab::SymbolTable;
use crate::types::{TypeIndex, TypeKind, TypeRegistry};
use cxx_ast::{DeclId, FunctionDecl, Symbol};
use cxx_diagnostics::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionRank {
    Exact,
    Standard,
    UserDefined,
}

/// A reasonable subset of C++ implicit conversions: identity, arithmetic
/// promotion/conversion between any two primitives, and derived-to-base
/// pointer conversion. User-defined (converting-constructor) conversions
/// are intentionally not modeled — standard-library specifics are out of
/// scope, and converting constructors are vanishingly rare on the kind of
/// templates that exercise the partial-ordering/constraint machinery this
/// engine targets.
pub fn classify_conversion(types: &TypeRegistry, from: TypeIndex, to: TypeIndex) -> Option<ConversionRank> {
    if from == to {
        return Some(ConversionRank::Exact);
    }
    let from_info = types.get(from);
    let to_info = types.get(to);
    match (&from_info.kind, &to_info.kind) {
        (TypeKind::Primitive(_), TypeKind::Primitive(_)) => Some(ConversionRank::Standard),
        (TypeKind::Pointer(from_pointee), TypeKind::Pointer(to_pointee)) => {
            if from_pointee == to_pointee {
                Some(ConversionRank::Exact)
            } else if types.is_base_of(*to_pointee, *from_pointee) {
                Some(ConversionRank::Standard)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub struct OverloadCandidate<'a> {
    pub decl_id: DeclId,
    pub decl: &'a FunctionDecl,
    /// `0` for an ordinary function; for a template candidate, lower values
    /// mean "more specialized" per [`crate::templates::compare_specificity`].
    pub template_rank: Option<u32>,
}

/// Name lookup into a candidate set, including ADL through each argument
/// type's originating namespace.
pub fn collect_candidates<'a>(
    symtab: &SymbolTable,
    name: Symbol,
    adl_namespaces: &[Vec<Symbol>],
    resolve: impl Fn(DeclId) -> &'a FunctionDecl,
) -> Vec<OverloadCandidate<'a>> {
    let mut ids = symtab.lookup(name);
    for ns in adl_namespaces {
        for id in symtab.lookup_qualified(ns, name) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids.into_iter()
        .map(|id| OverloadCandidate {
            decl_id: id,
            decl: resolve(id),
            template_rank: None,
        })
        .collect()
}

/// Select the best-matching overload from an already-collected candidate
/// set, applying six ordered criteria.
pub fn select_overload(
    candidates: &[OverloadCandidate<'_>],
    arg_types: &[TypeIndex],
    param_types_of: impl Fn(&FunctionDecl) -> Vec<TypeIndex>,
    types: &TypeRegistry,
) -> Outcome<DeclId> {
    // (1) reject on arity, unless the candidate is variadic.
    let arity_ok: Vec<&OverloadCandidate> = candidates
        .iter()
        .filter(|c| {
            let params = param_types_of(c.decl);
            params.len() == arg_types.len() || (c.decl.is_variadic && params.len() <= arg_types.len())
        })
        .collect();
    if arity_ok.is_empty() {
        return Outcome::Soft {
            reason: "no candidate matches the argument count".to_string(),
        };
    }

    // (2)+(3): reject non-convertible candidates, track the worst
    // conversion rank needed across all arguments (a call is only as good
    // as its weakest-matching argument).
    let mut ranked: Vec<(&OverloadCandidate, ConversionRank)> = Vec::new();
    for c in arity_ok {
        let params = param_types_of(c.decl);
        let mut worst = ConversionRank::Exact;
        let mut ok = true;
        for (i, &arg_ty) in arg_types.iter().enumerate() {
            let Some(&param_ty) = params.get(i) else {
                // variadic tail argument: always accepted, does not affect rank.
                continue;
            };
            match classify_conversion(types, arg_ty, param_ty) {
                Some(rank) => worst = worst.max(rank),
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            ranked.push((c, worst));
        }
    }
    if ranked.is_empty() {
        return Outcome::Soft {
            reason: "no candidate's parameters accept the supplied argument types".to_string(),
        };
    }

    // (3): keep only those tied for the best conversion rank.
    let best_rank = ranked.iter().map(|(_, r)| *r).min().unwrap_or(ConversionRank::Exact);
    let mut best: Vec<&OverloadCandidate> = ranked
        .iter()
        .filter(|(_, r)| *r == best_rank)
        .map(|(c, _)| *c)
        .collect();

    // (4): prefer non-template over template.
    if best.iter().any(|c| c.template_rank.is_none()) {
        best.retain(|c| c.template_rank.is_none());
    } else {
        // (5): prefer the more-specialized template (lowest rank number).
        let best_template_rank = best.iter().filter_map(|c| c.template_rank).min();
        if let Some(r) = best_template_rank {
            best.retain(|c| c.template_rank == Some(r));
        }
    }

    // (6): tie remains -> ambiguous.
    match best.len() {
        1 => Outcome::Ok(best[0].decl_id),
        0 => Outcome::Soft {
            reason: "overload resolution produced no viable candidate".to_string(),
        },
        _ => Outcome::Soft {
            reason: "call is ambiguous between multiple equally good candidates".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, TypeInfo, TypeKind as TK};
    use cxx_ast::{Access, FunctionDeclBuilder, TypeSpec};

    fn prim(types: &mut TypeRegistry, kind: PrimitiveKind, bits: u32) -> TypeIndex {
        types.push(
            None,
            TypeInfo {
                kind: TK::Primitive(kind),
                size_bits: bits,
                align_bits: bits,
                origin: None,
            },
        )
    }

    fn make_fn(name: &str) -> FunctionDecl {
        let interner = cxx_ast::Interner::new();
        FunctionDeclBuilder {
            name: interner.intern(name),
            params: vec![],
            return_type: TypeSpec::named(interner.intern("void")),
            is_variadic: false,
            is_virtual: false,
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
        .build()
    }

    #[test]
    fn exact_match_beats_promoted_match() {
        let mut types = TypeRegistry::new();
        let int_ty = prim(&mut types, PrimitiveKind::Int, 32);
        let double_ty = prim(&mut types, PrimitiveKind::Double, 64);

        let exact_fn = make_fn("take_int");
        let promoted_fn = make_fn("take_double");
        let candidates = vec![
            OverloadCandidate {
                decl_id: DeclId(0),
                decl: &exact_fn,
                template_rank: None,
            },
            OverloadCandidate {
                decl_id: DeclId(1),
                decl: &promoted_fn,
                template_rank: None,
            },
        ];
        let param_lists = [vec![int_ty], vec![double_ty]];
        let result = select_overload(
            &candidates,
            &[int_ty],
            |decl| {
                if decl.name == exact_fn.name {
                    param_lists[0].clone()
                } else {
                    param_lists[1].clone()
                }
            },
            &types,
        );
        assert!(matches!(result, Outcome::Ok(id) if id == DeclId(0)));
    }

    #[test]
    fn arity_mismatch_is_pruned_not_a_hard_error() {
        let types = TypeRegistry::new();
        let f = make_fn("needs_one_arg");
        let candidates = vec![OverloadCandidate {
            decl_id: DeclId(0),
            decl: &f,
            template_rank: None,
        }];
        let result = select_overload(&candidates, &[TypeIndex(0)], |_| vec![], &types);
        assert!(matches!(result, Outcome::Soft { .. }));
    }
}
