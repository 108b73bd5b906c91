//! The Template & Overload Engine. Given a call site or type reference,
//! produces a concrete AST subtree (instantiation), memoized by
//! `(template-name, argument-vector)`; evaluates constraints; selects
//! partial specializations; and owns the symbol table, the type registry,
//! and name mangling.

pub mod access;
pub mod constraints;
pub mod instantiate;
pub mod mangle;
pub mod overload;
pub mod registry_build;
pub mod symtab;
pub mod templates;
pub mod types;

pub use access::check_access_violations;
pub use constraints::{evaluate_constraint, ConstraintEnv, ConstraintResult};
pub use instantiate::instantiate_function_template;
pub use mangle::{mangle, Abi};
pub use overload::{classify_conversion, collect_candidates, select_overload, ConversionRank, OverloadCandidate};
pub use registry_build::populate_from_ast;
pub use symtab::{ScopeKind, SymbolTable};
pub use templates::{
    compare_specificity, deduce_type_args, InstantiationCache, Specificity, TemplateBodyForm,
    TemplateDescriptor, MAX_INSTANTIATION_DEPTH,
};
pub use types::{
    BaseClassEntry, FieldEntry, InstantiationPhase, LazyMemberEntry, MemberFunctionEntry,
    PrimitiveKind, StructTypeInfo, TypeIndex, TypeInfo, TypeKind, TypeRegistry,
};

use cxx_ast::DeclId;
use dashmap::DashMap;
use thiserror::Error;

/// Leaf errors surfaced by this crate before the driver composes them into
/// `anyhow::Error` at the pipeline boundary.
#[derive(Debug, Error)]
pub enum SemaError {
    #[error("instantiation depth exceeded {limit} levels")]
    RecursionLimit { limit: u32 },
    #[error("template argument deduction failed: {0}")]
    DeductionFailure(String),
    #[error("constraint not satisfied: {0}")]
    ConstraintFailure(String),
    #[error("no matching overload for `{name}`")]
    NoMatchingOverload { name: String },
    #[error("call to `{name}` is ambiguous")]
    AmbiguousCall { name: String },
    #[error("ambiguous partial specialization for `{name}`")]
    AmbiguousInstantiation { name: String },
}

/// Everything one translation unit's template/overload machinery needs
/// threaded through a single value: the symbol table, the type registry,
/// the instantiation cache, and the template descriptor registry.
/// Constructed once per `cxx-driver` compilation and handed by shared
/// reference to the parser's deferred re-entry points.
pub struct SemaContext {
    pub symtab: SymbolTable,
    pub types: TypeRegistry,
    pub instantiations: InstantiationCache,
    /// One entry per template declaration (function, class, variable, or
    /// alias), registered by the parser as it encounters the declaration
    /// and consulted by the template engine when resolving partial
    /// specializations for a later instantiation.
    pub templates: DashMap<DeclId, TemplateDescriptor>,
    /// Current nesting depth of template instantiations driven through
    /// [`crate::instantiate::instantiate_function_template`]. Incremented
    /// around the re-entrant reparse of a deferred body and checked against
    /// [`MAX_INSTANTIATION_DEPTH`] so a self-instantiating template (e.g. a
    /// recursive `template<int N>` counter with no base case) terminates
    /// with a diagnostic instead of recursing until the stack overflows.
    pub reentry_depth: std::cell::Cell<u32>,
}

impl Default for SemaContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SemaContext {
    pub fn new() -> Self {
        Self {
            symtab: SymbolTable::new(),
            types: TypeRegistry::new(),
            instantiations: InstantiationCache::new(),
            templates: DashMap::new(),
            reentry_depth: std::cell::Cell::new(0),
        }
    }

    /// Register a template declaration, keyed by its own `DeclId`. Called by
    /// the parser at the point a `template<...>` declaration is parsed, well
    /// before any instantiation is requested.
    pub fn register_template(&self, id: DeclId, descriptor: TemplateDescriptor) {
        self.templates.insert(id, descriptor);
    }

    /// Collect the partial specializations registered against `primary`,
    /// for use by [`crate::templates::compare_specificity`] when ranking
    /// which pattern an instantiation request should bind to.
    pub fn partial_specializations_of(&self, primary: DeclId) -> Vec<DeclId> {
        self.templates
            .get(&primary)
            .map(|d| d.partial_specializations.clone())
            .unwrap_or_default()
    }
}
