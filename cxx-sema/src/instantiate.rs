//! Function-template instantiation: given a template's `DeclId` and a
//! concrete argument vector, re-enters the parser at the template's saved
//! body tokens, substitutes template parameters for concrete types/values
//! throughout the reparsed tree, and allocates a fresh, ordinary
//! `FunctionDecl` for the instantiation — memoized through
//! [`crate::templates::InstantiationCache`] so each distinct argument
//! vector is only ever built once.

use crate::templates::MAX_INSTANTIATION_DEPTH;
use crate::SemaContext;
use cxx_ast::{
    AstArena, Block, CatchClause, Decl, DeclId, Expr, FunctionDeclBuilder, Interner, LambdaParam,
    LocalVarDecl, Param, Stmt, Symbol, SwitchCase, TemplateArg, TemplateParam, TemplateParamKind,
    TokenStream, TypeSpec,
};
use cxx_diagnostics::{error_codes, Diagnostic, Outcome, Span};
use std::collections::HashMap;

/// A template parameter bound to either a concrete type or a concrete
/// constant, keyed by the parameter's own name so substitution is a plain
/// name lookup against whichever form (`Expr::Name` or a `TypeSpec`'s
/// `BaseTypeRef::Named`) the parameter appears as.
fn build_substitution_map(params: &[TemplateParam], args: &[TemplateArg]) -> HashMap<Symbol, TemplateArg> {
    params.iter().zip(args.iter()).map(|(p, a)| (p.name, a.clone())).collect()
}

fn substitute_type(ty: &TypeSpec, subs: &HashMap<Symbol, TemplateArg>) -> TypeSpec {
    let mut out = ty.clone();
    if let cxx_ast::BaseTypeRef::Named(sym) = &ty.base {
        if let Some(TemplateArg::Type(bound)) = subs.get(sym) {
            out.base = bound.base.clone();
            let mut levels = bound.pointer_levels.clone();
            levels.extend(out.pointer_levels.clone());
            out.pointer_levels = levels;
            if out.reference.is_none() {
                out.reference = bound.reference;
            }
            out.template_args = bound.template_args.clone();
        }
    }
    out.template_args = out
        .template_args
        .iter()
        .map(|a| substitute_template_arg(a, subs))
        .collect();
    out
}

fn substitute_template_arg(arg: &TemplateArg, subs: &HashMap<Symbol, TemplateArg>) -> TemplateArg {
    match arg {
        TemplateArg::Type(t) => TemplateArg::Type(substitute_type(t, subs)),
        TemplateArg::Const(c) => TemplateArg::Const(*c),
    }
}

fn substitute_params(params: &[Param], subs: &HashMap<Symbol, TemplateArg>) -> Vec<Param> {
    params
        .iter()
        .map(|p| Param { name: p.name, ty: substitute_type(&p.ty, subs), default: p.default.as_ref().map(|e| substitute_expr(e, subs)) })
        .collect()
}

fn substitute_block(block: &Block, subs: &HashMap<Symbol, TemplateArg>) -> Block {
    Block { stmts: block.stmts.iter().map(|s| substitute_stmt(s, subs)).collect() }
}

fn substitute_stmt(stmt: &Stmt, subs: &HashMap<Symbol, TemplateArg>) -> Stmt {
    match stmt {
        Stmt::Expr(e) => Stmt::Expr(substitute_expr(e, subs)),
        Stmt::LocalVar(decls) => Stmt::LocalVar(
            decls
                .iter()
                .map(|d| LocalVarDecl { name: d.name, ty: substitute_type(&d.ty, subs), init: d.init.as_ref().map(|e| substitute_expr(e, subs)) })
                .collect(),
        ),
        Stmt::Block(b) => Stmt::Block(substitute_block(b, subs)),
        Stmt::If { init, cond, then_branch, else_branch } => Stmt::If {
            init: init.as_ref().map(|s| Box::new(substitute_stmt(s, subs))),
            cond: substitute_expr(cond, subs),
            then_branch: Box::new(substitute_stmt(then_branch, subs)),
            else_branch: else_branch.as_ref().map(|s| Box::new(substitute_stmt(s, subs))),
        },
        Stmt::While { cond, body } => Stmt::While { cond: substitute_expr(cond, subs), body: Box::new(substitute_stmt(body, subs)) },
        Stmt::DoWhile { body, cond } => Stmt::DoWhile { body: Box::new(substitute_stmt(body, subs)), cond: substitute_expr(cond, subs) },
        Stmt::For { init, cond, step, body } => Stmt::For {
            init: init.as_ref().map(|s| Box::new(substitute_stmt(s, subs))),
            cond: cond.as_ref().map(|e| substitute_expr(e, subs)),
            step: step.as_ref().map(|e| substitute_expr(e, subs)),
            body: Box::new(substitute_stmt(body, subs)),
        },
        Stmt::RangeFor { init, binding, binding_ty, range, body } => Stmt::RangeFor {
            init: init.as_ref().map(|s| Box::new(substitute_stmt(s, subs))),
            binding: *binding,
            binding_ty: binding_ty.as_ref().map(|t| substitute_type(t, subs)),
            range: substitute_expr(range, subs),
            body: Box::new(substitute_stmt(body, subs)),
        },
        Stmt::Return(v) => Stmt::Return(v.as_ref().map(|e| substitute_expr(e, subs))),
        Stmt::Break => Stmt::Break,
        Stmt::Continue => Stmt::Continue,
        Stmt::Switch { cond, cases } => Stmt::Switch {
            cond: substitute_expr(cond, subs),
            cases: cases
                .iter()
                .map(|c| SwitchCase { labels: c.labels.clone(), stmts: c.stmts.iter().map(|s| substitute_stmt(s, subs)).collect() })
                .collect(),
        },
        Stmt::Try { body, handlers } => Stmt::Try {
            body: substitute_block(body, subs),
            handlers: handlers
                .iter()
                .map(|h| CatchClause { param: h.param.as_ref().map(|(n, t)| (*n, substitute_type(t, subs))), body: substitute_block(&h.body, subs) })
                .collect(),
        },
        Stmt::SehTry { body, except, finally } => Stmt::SehTry {
            body: substitute_block(body, subs),
            except: except.as_ref().map(|(filter, handler)| (substitute_expr(filter, subs), substitute_block(handler, subs))),
            finally: finally.as_ref().map(|f| substitute_block(f, subs)),
        },
        Stmt::Empty => Stmt::Empty,
    }
}

fn substitute_expr(expr: &Expr, subs: &HashMap<Symbol, TemplateArg>) -> Expr {
    match expr {
        Expr::Name { name, explicit_args } => match subs.get(name) {
            Some(TemplateArg::Const(c)) => const_to_expr(*c),
            _ => Expr::Name { name: *name, explicit_args: explicit_args.clone() },
        },
        Expr::QualifiedName { .. }
        | Expr::IntLiteral(_)
        | Expr::UIntLiteral(_)
        | Expr::FloatLiteral(_)
        | Expr::BoolLiteral(_)
        | Expr::CharLiteral(_)
        | Expr::StringLiteral(_)
        | Expr::NullPtr
        | Expr::This => expr.clone(),
        Expr::Binary { op, lhs, rhs } => Expr::Binary { op: *op, lhs: Box::new(substitute_expr(lhs, subs)), rhs: Box::new(substitute_expr(rhs, subs)) },
        Expr::Unary { op, operand } => Expr::Unary { op: *op, operand: Box::new(substitute_expr(operand, subs)) },
        Expr::Assign { compound, lhs, rhs } => Expr::Assign { compound: *compound, lhs: Box::new(substitute_expr(lhs, subs)), rhs: Box::new(substitute_expr(rhs, subs)) },
        Expr::Conditional { cond, then_expr, else_expr } => Expr::Conditional {
            cond: Box::new(substitute_expr(cond, subs)),
            then_expr: Box::new(substitute_expr(then_expr, subs)),
            else_expr: Box::new(substitute_expr(else_expr, subs)),
        },
        Expr::Call { callee, args } => Expr::Call { callee: Box::new(substitute_expr(callee, subs)), args: args.iter().map(|a| substitute_expr(a, subs)).collect() },
        Expr::MemberAccess { object, member, is_arrow, explicit_args } => Expr::MemberAccess {
            object: Box::new(substitute_expr(object, subs)),
            member: *member,
            is_arrow: *is_arrow,
            explicit_args: explicit_args.clone(),
        },
        Expr::Index { object, index } => Expr::Index { object: Box::new(substitute_expr(object, subs)), index: Box::new(substitute_expr(index, subs)) },
        Expr::Cast { kind, target, expr: inner } => Expr::Cast { kind: *kind, target: substitute_type(target, subs), expr: Box::new(substitute_expr(inner, subs)) },
        Expr::New { ty, array_size, placement, ctor_args } => Expr::New {
            ty: substitute_type(ty, subs),
            array_size: array_size.as_ref().map(|e| Box::new(substitute_expr(e, subs))),
            placement: placement.iter().map(|e| substitute_expr(e, subs)).collect(),
            ctor_args: ctor_args.iter().map(|e| substitute_expr(e, subs)).collect(),
        },
        Expr::Delete { expr: inner, is_array } => Expr::Delete { expr: Box::new(substitute_expr(inner, subs)), is_array: *is_array },
        Expr::Sizeof { of } => Expr::Sizeof { of: substitute_sizeof_operand(of, subs) },
        Expr::Typeid { of } => Expr::Typeid { of: substitute_sizeof_operand(of, subs) },
        Expr::InitializerList(items) => Expr::InitializerList(items.iter().map(|e| substitute_expr(e, subs)).collect()),
        Expr::Throw(v) => Expr::Throw(v.as_ref().map(|e| Box::new(substitute_expr(e, subs)))),
        Expr::Lambda { captures, params, return_type, body, is_mutable } => Expr::Lambda {
            captures: captures.clone(),
            params: params
                .iter()
                .map(|p| LambdaParam { name: p.name, ty: p.ty.as_ref().map(|t| substitute_type(t, subs)), is_forwarding_ref: p.is_forwarding_ref })
                .collect(),
            return_type: return_type.as_ref().map(|t| substitute_type(t, subs)),
            body: Box::new(substitute_block(body, subs)),
            is_mutable: *is_mutable,
        },
        Expr::Requires { params, requirements } => Expr::Requires {
            params: params.iter().map(|p| Param { name: p.name, ty: substitute_type(&p.ty, subs), default: p.default.as_ref().map(|e| substitute_expr(e, subs)) }).collect(),
            requirements: requirements.clone(),
        },
        Expr::TraitIntrinsic { name, type_args } => Expr::TraitIntrinsic { name: *name, type_args: type_args.iter().map(|t| substitute_type(t, subs)).collect() },
        Expr::Paren(inner) => Expr::Paren(Box::new(substitute_expr(inner, subs))),
    }
}

fn substitute_sizeof_operand(op: &cxx_ast::SizeofOperand, subs: &HashMap<Symbol, TemplateArg>) -> cxx_ast::SizeofOperand {
    match op {
        cxx_ast::SizeofOperand::Type(t) => cxx_ast::SizeofOperand::Type(substitute_type(t, subs)),
        cxx_ast::SizeofOperand::Expr(e) => cxx_ast::SizeofOperand::Expr(Box::new(substitute_expr(e, subs))),
    }
}

fn const_to_expr(c: cxx_ast::ConstValue) -> Expr {
    match c {
        cxx_ast::ConstValue::Int(v) => Expr::IntLiteral(v),
        cxx_ast::ConstValue::UInt(v) => Expr::UIntLiteral(v),
        cxx_ast::ConstValue::Bool(v) => Expr::BoolLiteral(v),
        cxx_ast::ConstValue::Char(v) => Expr::CharLiteral(v),
    }
}

fn base_type_name(base: &cxx_ast::BaseTypeRef, interner: &Interner) -> String {
    use cxx_ast::BaseTypeRef::*;
    match base {
        Void => "void".to_string(),
        Bool => "bool".to_string(),
        Char => "char".to_string(),
        SChar => "signed char".to_string(),
        UChar => "unsigned char".to_string(),
        Short => "short".to_string(),
        UShort => "unsigned short".to_string(),
        Int => "int".to_string(),
        UInt => "unsigned int".to_string(),
        Long => "long".to_string(),
        ULong => "unsigned long".to_string(),
        LongLong => "long long".to_string(),
        ULongLong => "unsigned long long".to_string(),
        Float => "float".to_string(),
        Double => "double".to_string(),
        LongDouble => "long double".to_string(),
        Auto => "auto".to_string(),
        Named(sym) => interner.resolve(*sym).to_string(),
        Qualified(path) => path.iter().map(|s| interner.resolve(*s).to_string()).collect::<Vec<_>>().join("::"),
    }
}

/// Human-readable tag for an instantiation's argument vector, used only to
/// build a unique, debuggable instantiation name (`identity<int>`); not a
/// mangling scheme in its own right.
fn template_arg_display(arg: &TemplateArg, interner: &Interner) -> String {
    match arg {
        TemplateArg::Type(t) => {
            let stars = "*".repeat(t.pointer_levels.len());
            format!("{}{}", base_type_name(&t.base, interner), stars)
        }
        TemplateArg::Const(c) => match c {
            cxx_ast::ConstValue::Int(v) => v.to_string(),
            cxx_ast::ConstValue::UInt(v) => v.to_string(),
            cxx_ast::ConstValue::Bool(v) => v.to_string(),
            cxx_ast::ConstValue::Char(v) => v.to_string(),
        },
    }
}

fn placeholder_span(file: u32) -> Span {
    // Reparsed template bodies don't carry their own token positions this
    // far downstream; this core's `TokenRange` stores stream cursor
    // positions, not line/column. A failing instantiation is still
    // reported against the right file, just not a precise line.
    Span::new(format!("file#{file}"), 0, 0, 1)
}

/// Instantiates the function template `template_id` with `args`, re-parsing
/// its deferred body from `stream`. Memoized per `(template_id, args)`
/// through `ctx.instantiations`; a deduction/constraint/recursion failure
/// is never cached, so it can be retried once more context is available.
pub fn instantiate_function_template<TS: TokenStream>(
    ctx: &SemaContext,
    arena: &AstArena,
    interner: &Interner,
    stream: &mut TS,
    template_id: DeclId,
    args: &[TemplateArg],
) -> Outcome<DeclId> {
    let Some(template_func) = arena.get(template_id).as_function() else {
        return Outcome::Hard(Box::new(Diagnostic::error(
            error_codes::DEDUCTION_FAILURE,
            "instantiation target is not a function template".to_string(),
            placeholder_span(0),
        )));
    };

    ctx.instantiations.get_or_try_insert(template_id, args, || {
        let depth = ctx.reentry_depth.get();
        if depth >= MAX_INSTANTIATION_DEPTH {
            return Outcome::Hard(Box::new(Diagnostic::error(
                error_codes::RECURSION_LIMIT,
                format!("instantiation depth exceeded {MAX_INSTANTIATION_DEPTH} levels"),
                placeholder_span(0),
            )));
        }
        let Some(range) = template_func.body_tokens else {
            return Outcome::Soft { reason: "template has no deferred body to instantiate".to_string() };
        };

        ctx.reentry_depth.set(depth + 1);
        let block = cxx_parser::reparse_deferred_body(stream, arena, interner, range, depth);
        ctx.reentry_depth.set(depth);

        let block = match block {
            Ok(b) => b,
            Err(e) => {
                return Outcome::Hard(Box::new(Diagnostic::error(
                    error_codes::PARSE_ERROR_IN_BODY,
                    e.to_string(),
                    placeholder_span(range.file.0),
                )))
            }
        };

        let subs = build_substitution_map(&template_func.template_params, args);
        let substituted_body = substitute_block(&block, &subs);

        let suffix = args.iter().map(|a| template_arg_display(a, interner)).collect::<Vec<_>>().join(",");
        let name = interner.intern(&format!("{}<{}>", interner.resolve(template_func.name), suffix));

        let builder = FunctionDeclBuilder {
            name,
            params: substitute_params(&template_func.params, &subs),
            return_type: substitute_type(&template_func.return_type, &subs),
            is_variadic: template_func.is_variadic,
            is_virtual: template_func.is_virtual,
            is_pure_virtual: template_func.is_pure_virtual,
            is_override: template_func.is_override,
            is_const: template_func.is_const,
            is_static: template_func.is_static,
            is_explicit: template_func.is_explicit,
            is_noexcept: template_func.is_noexcept,
            ref_qualifier: template_func.ref_qualifier,
            access: template_func.access,
            owner_class: template_func.owner_class,
            owner_namespace: template_func.owner_namespace.clone(),
            template_params: Vec::new(),
            constraint: None,
            body_tokens: None,
            body: Some(substituted_body),
        };
        let (id, decl) = arena.alloc_decl(Decl::Function(builder.build()));
        if let Decl::Function(f) = decl {
            f.mark_instantiated();
        }
        Outcome::Ok(id)
    })
}

/// Template-argument vectors this subset models explicitly only: type and
/// non-type parameters. A template parameter of kind `Template` (a
/// template-template parameter) has no corresponding `TemplateArg` variant
/// and is out of scope for instantiation.
pub fn is_supported_param(kind: TemplateParamKind) -> bool {
    !matches!(kind, TemplateParamKind::Template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SemaContext;
    use cxx_ast::{ConstValue, Decl, FileId, Interner, VecTokenStream};

    #[test]
    fn instantiates_a_function_template_body_with_a_concrete_type() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let source = "template<typename T> T identity(T x) { return x; }";
        let tokens = cxx_tokens::tokenize(source, FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(tokens);
        let global = cxx_parser::parse_translation_unit(&mut stream, &arena, &interner).expect("parse");
        let template_id = match arena.get(global) {
            Decl::Namespace(ns) => ns.items.borrow()[0],
            _ => unreachable!(),
        };
        let ctx = SemaContext::new();
        let args = vec![TemplateArg::Type(TypeSpec::named(interner.intern("int")))];
        let result = instantiate_function_template(&ctx, &arena, &interner, &mut stream, template_id, &args);
        let id = match result {
            Outcome::Ok(id) => id,
            other => panic!("expected a successful instantiation, got {other:?}"),
        };
        let func = arena.get(id).as_function().expect("instantiated function");
        assert!(func.is_instantiated());
        assert!(func.body().is_some());
    }

    #[test]
    fn repeated_instantiation_with_the_same_args_is_memoized() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let source = "template<typename T> T identity(T x) { return x; }";
        let tokens = cxx_tokens::tokenize(source, FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(tokens);
        let global = cxx_parser::parse_translation_unit(&mut stream, &arena, &interner).expect("parse");
        let template_id = match arena.get(global) {
            Decl::Namespace(ns) => ns.items.borrow()[0],
            _ => unreachable!(),
        };
        let ctx = SemaContext::new();
        let args = vec![TemplateArg::Const(ConstValue::Int(4))];
        let first = instantiate_function_template(&ctx, &arena, &interner, &mut stream, template_id, &args);
        let second = instantiate_function_template(&ctx, &arena, &interner, &mut stream, template_id, &args);
        match (first, second) {
            (Outcome::Ok(a), Outcome::Ok(b)) => assert_eq!(a, b),
            _ => panic!("expected both instantiations to succeed and share a DeclId"),
        }
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let source = "template<typename T> T identity(T x) { return x; }";
        let tokens = cxx_tokens::tokenize(source, FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(tokens);
        let global = cxx_parser::parse_translation_unit(&mut stream, &arena, &interner).expect("parse");
        let template_id = match arena.get(global) {
            Decl::Namespace(ns) => ns.items.borrow()[0],
            _ => unreachable!(),
        };
        let ctx = SemaContext::new();
        ctx.reentry_depth.set(MAX_INSTANTIATION_DEPTH);
        let args = vec![TemplateArg::Const(ConstValue::Int(1))];
        let result = instantiate_function_template(&ctx, &arena, &interner, &mut stream, template_id, &args);
        assert!(matches!(result, Outcome::Hard(_)));
    }
}
