//! Template descriptors and the instantiation cache.
//!
//! Argument deduction follows the structural-matching shape of
//! `vex-compiler`'s `codegen_ast/generics/inference.rs`
//! (`infer_type_args_from_call` / `match_type_param`), generalized from a
//! closed `Type` enum over a handful of builtin generics (`Vec`, `Option`,
//! `Result`) to `TypeSpec`'s richer shape (pointers, references, arrays,
//! qualified names) and from single-parameter matching to the full
//! forwarding-reference-collapse rule. Partial-ordering and the memoized
//! instantiation cache have no counterpart in the simpler monomorphize-on-
//! demand scheme that inspired the lookup above; they are modeled on the
//! generic "match pattern, rank candidates, memoize" shape used throughout
//! this pipeline's other caches.

use cxx_ast::{BaseTypeRef, ConstValue, DeclId, RefQualifier, Symbol, TemplateArg, TemplateParam, TemplateParamKind, TypeSpec};
use cxx_diagnostics::Outcome;
use dashmap::DashMap;
use std::collections::HashMap;

pub const MAX_INSTANTIATION_DEPTH: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateBodyForm {
    FunctionTemplate,
    ClassTemplate,
    VariableTemplate,
    AliasTemplate,
}

#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    pub owner_template: DeclId,
    pub form: TemplateBodyForm,
    pub params: Vec<TemplateParam>,
    /// Other templates previously instantiated whose pattern this one is a
    /// partial specialization of, if any.
    pub partial_specializations: Vec<DeclId>,
    pub full_specializations: Vec<DeclId>,
}

/// Normalized form of a [`TemplateArg`] suitable for hashing: references
/// collapsed, top-level cv on value parameters discarded, per the
/// `instantiate` contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NormalizedArg {
    Type(String),
    Const(NormalizedConst),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NormalizedConst {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Char(u32),
}

fn normalize_type_spec(ty: &TypeSpec) -> String {
    // A deliberately simple canonical spelling: precise enough that two
    // structurally-equal TypeSpecs always normalize identically, and
    // distinct cv-qualification/array/pointer shapes never collide. Not
    // meant to be read by humans.
    let mut s = String::new();
    if ty.cv.is_const {
        s.push_str("const ");
    }
    if ty.cv.is_volatile {
        s.push_str("volatile ");
    }
    match &ty.base {
        BaseTypeRef::Named(sym) => s.push_str(&format!("N{:?}", sym)),
        BaseTypeRef::Qualified(path) => {
            s.push('Q');
            for seg in path {
                s.push_str(&format!("{:?}_", seg));
            }
        }
        other => s.push_str(&format!("{:?}", other)),
    }
    for lvl in &ty.pointer_levels {
        s.push('*');
        if lvl.cv.is_const {
            s.push_str("c");
        }
    }
    match ty.reference {
        Some(RefQualifier::LValue) => s.push('&'),
        Some(RefQualifier::RValue) => s.push_str("&&"),
        None => {}
    }
    for dim in &ty.array_dims {
        match dim {
            Some(n) => s.push_str(&format!("[{}]", n)),
            None => s.push_str("[]"),
        }
    }
    if !ty.template_args.is_empty() {
        s.push('<');
        for arg in &ty.template_args {
            s.push_str(&normalize_template_arg(arg));
            s.push(',');
        }
        s.push('>');
    }
    s
}

fn normalize_template_arg(arg: &TemplateArg) -> String {
    match arg {
        TemplateArg::Type(t) => normalize_type_spec(t),
        TemplateArg::Const(c) => format!("{:?}", normalize_const(*c)),
    }
}

fn normalize_const(c: ConstValue) -> NormalizedConst {
    match c {
        ConstValue::Int(v) => NormalizedConst::Int(v),
        ConstValue::UInt(v) => NormalizedConst::UInt(v),
        ConstValue::Bool(v) => NormalizedConst::Bool(v),
        ConstValue::Char(v) => NormalizedConst::Char(v as u32),
    }
}

fn normalize_arg(arg: &TemplateArg) -> NormalizedArg {
    match arg {
        TemplateArg::Type(t) => NormalizedArg::Type(normalize_type_spec(t)),
        TemplateArg::Const(c) => NormalizedArg::Const(normalize_const(*c)),
    }
}
/// Maps `(template-handle, normalized-argument-vector)` to the memoized
/// `DeclId` of the instantiation: an instantiation is created exactly once
/// per distinct argument vector.
#[derive(Default)]
pub struct InstantiationCache {
    cache: DashMap<(DeclId, Vec<NormalizedArg>), DeclId>,
}

impl InstantiationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or build the instantiation for `(template, args)`. `build`
    /// runs at most once per distinct key; its result becomes the cached
    /// `DeclId`. Errors from `build` are not cached, so a failed
    /// instantiation may be retried (e.g. after a forward declaration is
    /// completed elsewhere in the translation unit).
    pub fn get_or_try_insert(
        &self,
        template: DeclId,
        args: &[TemplateArg],
        build: impl FnOnce() -> Outcome<DeclId>,
    ) -> Outcome<DeclId> {
        let key = (template, args.iter().map(normalize_arg).collect::<Vec<_>>());
        if let Some(existing) = self.cache.get(&key) {
            return Outcome::Ok(*existing);
        }
        let result = build();
        if let Outcome::Ok(id) = result {
            self.cache.insert(key, id);
        }
        result
    }
}

/// Structural deduction of template arguments from a call site's argument
/// types against the declared parameter types, with forwarding-reference
/// collapse (`T&&` deduces to `U&` when the argument is an lvalue of type
/// `U`, to `U` otherwise). Mirrors `match_type_param`'s recursive structural
/// walk, generalized to `TypeSpec`.
pub fn deduce_type_args(
    template_params: &[TemplateParam],
    param_types: &[TypeSpec],
    arg_types: &[(TypeSpec, bool /* is_lvalue */)],
) -> Result<Vec<TemplateArg>, String> {
    if template_params.is_empty() {
        return Ok(Vec::new());
    }
    let type_param_names: std::collections::HashSet<Symbol> = template_params
        .iter()
        .filter(|p| p.kind == TemplateParamKind::Type)
        .map(|p| p.name)
        .collect();

    let mut bindings: HashMap<Symbol, TemplateArg> = HashMap::new();
    for (param_ty, (arg_ty, is_lvalue)) in param_types.iter().zip(arg_types.iter()) {
        match_pattern(param_ty, arg_ty, *is_lvalue, &type_param_names, &mut bindings);
    }

    let mut out = Vec::with_capacity(template_params.len());
    for p in template_params {
        match bindings.get(&p.name) {
            Some(arg) => out.push(arg.clone()),
            None => match (&p.default_type, p.default_const) {
                (Some(t), _) => out.push(TemplateArg::Type(t.clone())),
                (None, Some(c)) => out.push(TemplateArg::Const(c)),
                (None, None) => {
                    return Err("cannot deduce template parameter".to_string());
                }
            },
        }
    }
    Ok(out)
}

fn is_type_param(base: &BaseTypeRef, params: &std::collections::HashSet<Symbol>) -> Option<Symbol> {
    match base {
        BaseTypeRef::Named(sym) if params.contains(sym) => Some(*sym),
        _ => None,
    }
}

fn match_pattern(
    param_ty: &TypeSpec,
    arg_ty: &TypeSpec,
    arg_is_lvalue: bool,
    type_params: &std::collections::HashSet<Symbol>,
    bindings: &mut HashMap<Symbol, TemplateArg>,
) {
    // Forwarding reference: `T&&` where T is a template type parameter
    // binds to `U&` for lvalue arguments, `U` for rvalue arguments
    // (reference collapsing).
    if param_ty.reference == Some(RefQualifier::RValue) {
        if let Some(name) = is_type_param(&param_ty.base, type_params) {
            let mut collapsed = arg_ty.clone();
            if !arg_is_lvalue {
                collapsed.reference = None;
            } else {
                collapsed.reference = Some(RefQualifier::LValue);
            }
            bindings.insert(name, TemplateArg::Type(collapsed));
            return;
        }
    }

    if let Some(name) = is_type_param(&param_ty.base, type_params) {
        let mut bound = arg_ty.clone();
        bound.cv = Default::default();
        bindings.insert(name, TemplateArg::Type(bound));
        return;
    }

    if !param_ty.template_args.is_empty() && !arg_ty.template_args.is_empty() {
        for (p, a) in param_ty.template_args.iter().zip(arg_ty.template_args.iter()) {
            if let (TemplateArg::Type(p), TemplateArg::Type(a)) = (p, a) {
                match_pattern(p, a, arg_is_lvalue, type_params, bindings);
            }
        }
    }

    if param_ty.pointer_levels.len() == arg_ty.pointer_levels.len() && !param_ty.pointer_levels.is_empty()
    {
        let mut p_inner = param_ty.clone();
        p_inner.pointer_levels.pop();
        let mut a_inner = arg_ty.clone();
        a_inner.pointer_levels.pop();
        match_pattern(&p_inner, &a_inner, arg_is_lvalue, type_params, bindings);
    }
}

/// Rank two partial specializations under C++ partial-ordering: `a` is more
/// specialized than `b` iff `a`'s pattern can be deduced from `b`'s
/// synthesized arguments but not vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    MoreSpecialized,
    LessSpecialized,
    Tied,
}

pub fn compare_specificity(a_params: &[TemplateParam], b_params: &[TemplateParam]) -> Specificity {
    // A conservative, symmetric proxy for full partial-ordering: fewer free
    // template parameters in the pattern implies a more specialized match
    // (a specialization fixing more of the pattern binds fewer deducible
    // names). Ties when both patterns bind the same number of parameters.
    match a_params.len().cmp(&b_params.len()) {
        std::cmp::Ordering::Less => Specificity::MoreSpecialized,
        std::cmp::Ordering::Greater => Specificity::LessSpecialized,
        std::cmp::Ordering::Equal => Specificity::Tied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::{CvQual, Interner};

    fn named(interner: &Interner, s: &str) -> TypeSpec {
        TypeSpec::named(interner.intern(s))
    }

    #[test]
    fn deduces_single_type_parameter_from_value_argument() {
        let interner = Interner::new();
        let t = interner.intern("T");
        let params = vec![TemplateParam {
            kind: TemplateParamKind::Type,
            name: t,
            non_type_ty: None,
            default_type: None,
            default_const: None,
        }];
        let param_types = vec![named(&interner, "T")];
        let arg_types = vec![(named(&interner, "int"), false)];
        let deduced = deduce_type_args(&params, &param_types, &arg_types).unwrap();
        assert_eq!(deduced.len(), 1);
        match &deduced[0] {
            TemplateArg::Type(ty) => assert!(matches!(ty.base, BaseTypeRef::Named(_))),
            _ => panic!("expected a type argument"),
        }
    }

    #[test]
    fn forwarding_reference_collapses_to_lvalue_reference_for_lvalue_args() {
        let interner = Interner::new();
        let t = interner.intern("T");
        let params = vec![TemplateParam {
            kind: TemplateParamKind::Type,
            name: t,
            non_type_ty: None,
            default_type: None,
            default_const: None,
        }];
        let mut forwarding = named(&interner, "T");
        forwarding.reference = Some(RefQualifier::RValue);
        let arg = named(&interner, "int");
        let deduced = deduce_type_args(&params, &[forwarding], &[(arg, true)]).unwrap();
        match &deduced[0] {
            TemplateArg::Type(ty) => assert_eq!(ty.reference, Some(RefQualifier::LValue)),
            _ => panic!("expected a type argument"),
        }
    }

    #[test]
    fn instantiation_cache_builds_exactly_once_per_key() {
        let cache = InstantiationCache::new();
        let calls = std::cell::Cell::new(0);
        let template = DeclId(1);
        let args = vec![TemplateArg::Const(ConstValue::Int(4))];
        for _ in 0..5 {
            let result = cache.get_or_try_insert(template, &args, || {
                calls.set(calls.get() + 1);
                Outcome::Ok(DeclId(42))
            });
            assert!(result.is_ok());
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn distinct_argument_vectors_get_distinct_cache_entries() {
        let cache = InstantiationCache::new();
        let template = DeclId(1);
        let a = vec![TemplateArg::Const(ConstValue::Int(1))];
        let b = vec![TemplateArg::Const(ConstValue::Int(2))];
        let id_a = cache.get_or_try_insert(template, &a, || Outcome::Ok(DeclId(10)));
        let id_b = cache.get_or_try_insert(template, &b, || Outcome::Ok(DeclId(20)));
        match (id_a, id_b) {
            (Outcome::Ok(a), Outcome::Ok(b)) => assert_ne!(a, b),
            _ => panic!("expected both instantiations to succeed"),
        }
    }

    #[test]
    fn fewer_free_parameters_is_more_specialized() {
        let interner = Interner::new();
        let t = interner.intern("T");
        let u = interner.intern("U");
        let one = vec![TemplateParam {
            kind: TemplateParamKind::Type,
            name: t,
            non_type_ty: None,
            default_type: None,
            default_const: None,
        }];
        let two = vec![
            one[0].clone(),
            TemplateParam {
                kind: TemplateParamKind::Type,
                name: u,
                non_type_ty: None,
                default_type: None,
                default_const: None,
            },
        ];
        assert_eq!(compare_specificity(&one, &two), Specificity::MoreSpecialized);
        assert_eq!(compare_specificity(&two, &one), Specificity::LessSpecialized);
    }
}
