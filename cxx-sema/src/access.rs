//! Member-access enforcement: `private`/`protected` members referenced
//! from outside their permitted access path raise `DiagnosticEngine::
//! access_violation`. Limited to the syntactically unambiguous case of a
//! qualified reference (`Class::member`), since this subset's AST carries
//! no per-expression static type to resolve an ordinary `obj.member`'s
//! owning class without a full type checker.

use cxx_ast::{Access, AstArena, Block, Decl, DeclId, Expr, FunctionDecl, Interner, Stmt, Symbol};
use cxx_diagnostics::{DiagnosticEngine, Span};

/// Walks every already-collected function body in `function_ids`, checking
/// each qualified-name reference it contains against the accessed member's
/// declared visibility. `root` is the translation unit's global namespace,
/// searched by name to resolve `Class::member` to the class's `DeclId`.
pub fn check_access_violations(
    arena: &AstArena,
    interner: &Interner,
    root: DeclId,
    function_ids: &[DeclId],
    diagnostics: &mut DiagnosticEngine,
) {
    for &id in function_ids {
        let Some(func) = arena.get(id).as_function() else { continue };
        let Some(body) = func.body() else { continue };
        walk_block(&body, arena, interner, root, func, diagnostics);
    }
}

fn walk_block(block: &Block, arena: &AstArena, interner: &Interner, root: DeclId, func: &FunctionDecl, diagnostics: &mut DiagnosticEngine) {
    for stmt in &block.stmts {
        walk_stmt(stmt, arena, interner, root, func, diagnostics);
    }
}

fn walk_stmt(stmt: &Stmt, arena: &AstArena, interner: &Interner, root: DeclId, func: &FunctionDecl, diagnostics: &mut DiagnosticEngine) {
    let mut expr = |e: &Expr| walk_expr(e, arena, interner, root, func, diagnostics);
    match stmt {
        Stmt::Expr(e) | Stmt::Return(Some(e)) => expr(e),
        Stmt::LocalVar(decls) => {
            for d in decls {
                if let Some(e) = &d.init {
                    expr(e);
                }
            }
        }
        Stmt::Block(b) => walk_block(b, arena, interner, root, func, diagnostics),
        Stmt::If { init, cond, then_branch, else_branch } => {
            if let Some(s) = init {
                walk_stmt(s, arena, interner, root, func, diagnostics);
            }
            expr(cond);
            walk_stmt(then_branch, arena, interner, root, func, diagnostics);
            if let Some(s) = else_branch {
                walk_stmt(s, arena, interner, root, func, diagnostics);
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            expr(cond);
            walk_stmt(body, arena, interner, root, func, diagnostics);
        }
        Stmt::For { init, cond, step, body } => {
            if let Some(s) = init {
                walk_stmt(s, arena, interner, root, func, diagnostics);
            }
            if let Some(e) = cond {
                expr(e);
            }
            if let Some(e) = step {
                expr(e);
            }
            walk_stmt(body, arena, interner, root, func, diagnostics);
        }
        Stmt::RangeFor { init, range, body, .. } => {
            if let Some(s) = init {
                walk_stmt(s, arena, interner, root, func, diagnostics);
            }
            expr(range);
            walk_stmt(body, arena, interner, root, func, diagnostics);
        }
        Stmt::Switch { cond, cases } => {
            expr(cond);
            for case in cases {
                for s in &case.stmts {
                    walk_stmt(s, arena, interner, root, func, diagnostics);
                }
            }
        }
        Stmt::Try { body, handlers } => {
            walk_block(body, arena, interner, root, func, diagnostics);
            for h in handlers {
                walk_block(&h.body, arena, interner, root, func, diagnostics);
            }
        }
        Stmt::SehTry { body, except, finally } => {
            walk_block(body, arena, interner, root, func, diagnostics);
            if let Some((filter, handler)) = except {
                expr(filter);
                walk_block(handler, arena, interner, root, func, diagnostics);
            }
            if let Some(f) = finally {
                walk_block(f, arena, interner, root, func, diagnostics);
            }
        }
        Stmt::Return(None) | Stmt::Break | Stmt::Continue | Stmt::Empty => {}
    }
}

fn walk_expr(expr: &Expr, arena: &AstArena, interner: &Interner, root: DeclId, func: &FunctionDecl, diagnostics: &mut DiagnosticEngine) {
    let mut rec = |e: &Expr| walk_expr(e, arena, interner, root, func, diagnostics);
    match expr {
        Expr::QualifiedName { path, .. } if path.len() >= 2 => {
            let class_name = path[path.len() - 2];
            let member_name = path[path.len() - 1];
            if let Some(owner) = find_class_by_name(arena, root, class_name) {
                check_member_access(owner, member_name, func.owner_class, arena, interner, diagnostics);
            }
        }
        Expr::Call { callee, args } => {
            rec(callee);
            for a in args {
                rec(a);
            }
        }
        Expr::Binary { lhs, rhs, .. } | Expr::Assign { lhs, rhs, .. } | Expr::Index { object: lhs, index: rhs } => {
            rec(lhs);
            rec(rhs);
        }
        Expr::Unary { operand, .. } | Expr::Cast { expr: operand, .. } | Expr::Paren(operand) | Expr::Delete { expr: operand, .. } => {
            rec(operand)
        }
        Expr::Conditional { cond, then_expr, else_expr } => {
            rec(cond);
            rec(then_expr);
            rec(else_expr);
        }
        Expr::MemberAccess { object, .. } => rec(object),
        Expr::New { array_size, placement, ctor_args, .. } => {
            if let Some(e) = array_size {
                rec(e);
            }
            for e in placement.iter().chain(ctor_args.iter()) {
                rec(e);
            }
        }
        Expr::InitializerList(items) => {
            for e in items {
                rec(e);
            }
        }
        Expr::Throw(Some(e)) => rec(e),
        Expr::Lambda { body, .. } => walk_block(body, arena, interner, root, func, diagnostics),
        _ => {}
    }
}

fn find_class_by_name(arena: &AstArena, id: DeclId, name: Symbol) -> Option<DeclId> {
    match arena.get(id) {
        Decl::Namespace(ns) => ns.items.borrow().iter().find_map(|&child| find_class_by_name(arena, child, name)),
        Decl::Class(class) => {
            if class.name == name {
                Some(id)
            } else {
                class.nested.borrow().iter().find_map(|&child| find_class_by_name(arena, child, name))
            }
        }
        _ => None,
    }
}

fn is_derived_from(arena: &AstArena, derived: DeclId, base: DeclId) -> bool {
    if derived == base {
        return true;
    }
    let Some(class) = arena.get(derived).as_class() else { return false };
    class.bases.iter().any(|b| {
        walk_siblings_for_name(arena, b.name).map(|id| is_derived_from(arena, id, base)).unwrap_or(false)
    })
}

/// Best-effort resolution of a base-class name against every class ever
/// allocated in the arena. Base specifiers only carry a name, not a
/// `DeclId`, and this subset doesn't track a per-scope using-namespace
/// chain, so a name that collides across namespaces resolves to whichever
/// declaration the arena happened to allocate first.
fn walk_siblings_for_name(arena: &AstArena, name: Symbol) -> Option<DeclId> {
    for id in arena.iter_ids() {
        if let Decl::Class(class) = arena.get(id) {
            if class.name == name {
                return Some(id);
            }
        }
    }
    None
}

fn check_member_access(
    owner: DeclId,
    member: Symbol,
    accessor_class: Option<DeclId>,
    arena: &AstArena,
    interner: &Interner,
    diagnostics: &mut DiagnosticEngine,
) {
    let Some(class) = arena.get(owner).as_class() else { return };
    let access = class
        .fields
        .borrow()
        .iter()
        .find(|f| f.name == member)
        .map(|f| f.access)
        .or_else(|| {
            class.methods.borrow().iter().find_map(|&m| arena.get(m).as_function().filter(|f| f.name == member).map(|f| f.access))
        });
    // Static data members (`VariableDecl`) carry no per-member access
    // specifier in this AST, so a qualified reference to one is never
    // flagged; only fields and member functions are enforced.
    let Some(access) = access else { return };

    let permitted = match access {
        Access::Public => true,
        Access::Private => accessor_class == Some(owner),
        Access::Protected => accessor_class == Some(owner) || accessor_class.map(|c| is_derived_from(arena, c, owner)).unwrap_or(false),
    };
    if !permitted {
        diagnostics.access_violation(&interner.resolve(member), &interner.resolve(class.name), Span::new(String::new(), 0, 0, 0));
    }
}
