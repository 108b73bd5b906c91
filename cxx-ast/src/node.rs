//! The AST node model. Mirrors `vex-ast`'s `Program`/`Item`/`Expression`
//! split, but top-level declarations that need a stable cross-phase handle
//! (functions, classes, namespaces, templates, static data members) are
//! arena-allocated and referenced by [`DeclId`] rather than by Rust
//! reference, which keeps back-edges index-based rather than raw pointers.
//! Statement and expression trees inside a single function body are owned
//! (`Box`/`Vec`) because nothing outside that function ever needs to hold a
//! stable handle into them.

use crate::intern::Symbol;
use crate::token::TokenRange;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

/// Stable index of a top-level declaration in the [`crate::arena::AstArena`].
/// Never reassigned; new declarations (including instantiations) append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Access specifier, tracked per member and per base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// Reference qualifier on a pointer or the function itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefQualifier {
    LValue, // &
    RValue, // &&
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CvQual {
    pub is_const: bool,
    pub is_volatile: bool,
}

/// A single pointer level with its own cv-qualification: `T * const *`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerLevel {
    pub cv: CvQual,
}

/// The function signature embedded in a function-pointer type specifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSig {
    pub params: Vec<TypeSpec>,
    pub is_variadic: bool,
    pub return_type: Box<TypeSpec>,
}

/// The "as-written" type on a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub base: BaseTypeRef,
    pub pointer_levels: Vec<PointerLevel>,
    pub reference: Option<RefQualifier>,
    pub cv: CvQual,
    pub bit_width: Option<u32>,
    pub function_sig: Option<FunctionSig>,
    /// Explicit template arguments written at a use site, e.g. `Vec<int>`.
    pub template_args: Vec<TemplateArg>,
    /// Array bounds, innermost last; `None` means an unbounded `T[]`.
    pub array_dims: Vec<Option<u64>>,
}

impl TypeSpec {
    pub fn named(name: Symbol) -> Self {
        Self {
            base: BaseTypeRef::Named(name),
            pointer_levels: Vec::new(),
            reference: None,
            cv: CvQual::default(),
            bit_width: None,
            function_sig: None,
            template_args: Vec::new(),
            array_dims: Vec::new(),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// What a type specifier's base names: a builtin keyword, a user name
/// resolved later by the symbol table, or (after sema) a concrete type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaseTypeRef {
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
    Auto,
    Named(Symbol),
    /// `Foo::Bar::Baz` qualified-id type reference.
    Qualified(Vec<Symbol>),
}

/// Non-type or type template argument as written at a use site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateArg {
    Type(TypeSpec),
    Const(ConstValue),
}

/// A compile-time constant value usable as a non-type template argument or
/// as the result of constant-expression evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateParamKind {
    Type,
    NonType,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: Symbol,
    /// Only meaningful for `NonType` parameters.
    pub non_type_ty: Option<TypeSpec>,
    pub default_type: Option<TypeSpec>,
    pub default_const: Option<ConstValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeSpec,
    pub default: Option<Expr>,
}

/// A base-class specifier on a class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSpec {
    pub name: Symbol,
    pub access: Access,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: Symbol,
    pub ty: TypeSpec,
    pub access: Access,
    pub bit_width: Option<u32>,
    pub init: Option<Expr>,
}

/// A function (free function, member function, constructor, destructor, or
/// operator overload). Lives behind a stable [`DeclId`] because the
/// template engine's lazy-member machinery keys on `(class, member)` pairs
/// of these.
#[derive(Debug, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: TypeSpec,
    pub is_variadic: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_override: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub is_explicit: bool,
    pub is_noexcept: bool,
    pub ref_qualifier: Option<RefQualifier>,
    pub access: Access,
    pub owner_class: Option<DeclId>,
    pub owner_namespace: Vec<Symbol>,
    pub template_params: Vec<TemplateParam>,
    pub constraint: Option<Expr>,
    /// Saved token range of the body, consumed by deferred re-parsing. Only
    /// function *templates* and lazily-instantiated members keep this past
    /// the first parse; ordinary functions null it out once `body` is set.
    pub body_tokens: Option<TokenRange>,
    body: RefCell<Option<Block>>,
    is_deleted: Cell<bool>,
    is_defaulted: Cell<bool>,
    mangled_name: Cell<Option<Symbol>>,
    /// Set once a class template member is instantiated from its saved
    /// token range; prevents re-instantiation (see lazy-member policy).
    instantiated: Cell<bool>,
}

impl FunctionDecl {
    pub fn body(&self) -> Option<std::cell::Ref<'_, Block>> {
        let borrow = self.body.borrow();
        if borrow.is_some() {
            Some(std::cell::Ref::map(borrow, |b| b.as_ref().unwrap_or_else(|| unreachable!())))
        } else {
            None
        }
    }

    /// Mutation point: attach the definition body. May be called exactly
    /// once per concrete function (ordinary parse, or template-instantiation
    /// re-parse).
    pub fn attach_body(&self, body: Block) {
        *self.body.borrow_mut() = Some(body);
    }

    pub fn attach_mangled_name(&self, name: Symbol) {
        debug_assert!(
            self.mangled_name.get().is_none(),
            "mangled name computed twice for the same function"
        );
        self.mangled_name.set(Some(name));
    }

    pub fn mangled_name(&self) -> Option<Symbol> {
        self.mangled_name.get()
    }

    pub fn mark_deleted(&self) {
        self.is_deleted.set(true);
    }

    pub fn mark_defaulted(&self) {
        self.is_defaulted.set(true);
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted.get()
    }

    pub fn is_defaulted(&self) -> bool {
        self.is_defaulted.get()
    }

    pub fn mark_instantiated(&self) {
        self.instantiated.set(true);
    }

    pub fn is_instantiated(&self) -> bool {
        self.instantiated.get()
    }
}

/// Builder used by the parser; `FunctionDecl`'s `Cell`/`RefCell` fields make
/// a plain struct literal awkward, so construction goes through this.
pub struct FunctionDeclBuilder {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: TypeSpec,
    pub is_variadic: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_override: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub is_explicit: bool,
    pub is_noexcept: bool,
    pub ref_qualifier: Option<RefQualifier>,
    pub access: Access,
    pub owner_class: Option<DeclId>,
    pub owner_namespace: Vec<Symbol>,
    pub template_params: Vec<TemplateParam>,
    pub constraint: Option<Expr>,
    pub body_tokens: Option<TokenRange>,
    pub body: Option<Block>,
}

impl FunctionDeclBuilder {
    pub fn build(self) -> FunctionDecl {
        FunctionDecl {
            name: self.name,
            params: self.params,
            return_type: self.return_type,
            is_variadic: self.is_variadic,
            is_virtual: self.is_virtual,
            is_pure_virtual: self.is_pure_virtual,
            is_override: self.is_override,
            is_const: self.is_const,
            is_static: self.is_static,
            is_explicit: self.is_explicit,
            is_noexcept: self.is_noexcept,
            ref_qualifier: self.ref_qualifier,
            access: self.access,
            owner_class: self.owner_class,
            owner_namespace: self.owner_namespace,
            template_params: self.template_params,
            constraint: self.constraint,
            body_tokens: self.body_tokens,
            body: RefCell::new(self.body),
            is_deleted: Cell::new(false),
            is_defaulted: Cell::new(false),
            mangled_name: Cell::new(None),
            instantiated: Cell::new(false),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Symbol,
    pub owner_namespace: Vec<Symbol>,
    pub bases: Vec<BaseSpec>,
    pub fields: RefCell<Vec<FieldDecl>>,
    pub methods: RefCell<Vec<DeclId>>,
    pub nested: RefCell<Vec<DeclId>>,
    pub static_data: RefCell<Vec<DeclId>>,
    pub template_params: Vec<TemplateParam>,
    pub constraint: Option<Expr>,
    pub is_polymorphic_hint: Cell<bool>,
    /// For a full/partial specialization: the primary template and the
    /// concrete/pattern argument list this class matches.
    pub specialization_of: Option<DeclId>,
    pub specialization_args: Vec<TemplateArg>,
}

impl ClassDecl {
    pub fn append_member_function(&self, id: DeclId) {
        self.methods.borrow_mut().push(id);
    }

    pub fn append_nested(&self, id: DeclId) {
        self.nested.borrow_mut().push(id);
    }

    pub fn append_static_data(&self, id: DeclId) {
        self.static_data.borrow_mut().push(id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: Symbol,
    pub owner_namespace: Vec<Symbol>,
    pub underlying: Option<TypeSpec>,
    pub is_scoped: bool,
    pub variants: Vec<(Symbol, Option<ConstValue>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: Symbol,
    pub owner_namespace: Vec<Symbol>,
    pub template_params: Vec<TemplateParam>,
    pub aliased: TypeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: Symbol,
    pub owner_namespace: Vec<Symbol>,
    pub owner_class: Option<DeclId>,
    pub ty: TypeSpec,
    pub is_static: bool,
    pub template_params: Vec<TemplateParam>,
    pub init: Option<Expr>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: Option<Symbol>,
    pub items: RefCell<Vec<DeclId>>,
}

/// Top-level declaration kinds. Every one of these gets a [`DeclId`].
#[derive(Debug, Serialize, Deserialize)]
pub enum Decl {
    Function(FunctionDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Variable(VariableDecl),
    Namespace(NamespaceDecl),
}

impl Decl {
    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match self {
            Decl::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match self {
            Decl::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<Symbol> {
        match self {
            Decl::Function(f) => Some(f.name),
            Decl::Class(c) => Some(c.name),
            Decl::Enum(e) => Some(e.name),
            Decl::TypeAlias(t) => Some(t.name),
            Decl::Variable(v) => Some(v.name),
            Decl::Namespace(n) => n.name,
        }
    }
}

// ---------------------------------------------------------------------
// Statements and expressions (owned trees within one function body).
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Deref,
    AddrOf,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Static,
    Dynamic,
    Const,
    Reinterpret,
    CStyle,
    Functional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// `[]`
    None,
    /// `[=]`
    AllByValue,
    /// `[&]`
    AllByReference,
    /// Explicit capture list: `[x, &y, self]`.
    Explicit(Vec<Capture>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub name: Symbol,
    pub by_reference: bool,
    /// Init-capture: `[x = expr]`.
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: Symbol,
    /// `None` means a generic `auto`/`auto&&` parameter.
    pub ty: Option<TypeSpec>,
    pub is_forwarding_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLiteral(i64),
    UIntLiteral(u64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    CharLiteral(char),
    StringLiteral(Symbol),
    NullPtr,
    This,
    /// Unqualified name lookup, with optional explicit template arguments:
    /// `max<int>`.
    Name {
        name: Symbol,
        explicit_args: Vec<TemplateArg>,
    },
    QualifiedName {
        path: Vec<Symbol>,
        explicit_args: Vec<TemplateArg>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Assign {
        compound: Option<BinOp>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MemberAccess {
        object: Box<Expr>,
        member: Symbol,
        is_arrow: bool,
        explicit_args: Vec<TemplateArg>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        target: TypeSpec,
        expr: Box<Expr>,
    },
    New {
        ty: TypeSpec,
        array_size: Option<Box<Expr>>,
        placement: Vec<Expr>,
        ctor_args: Vec<Expr>,
    },
    Delete {
        expr: Box<Expr>,
        is_array: bool,
    },
    Sizeof {
        of: SizeofOperand,
    },
    Typeid {
        of: SizeofOperand,
    },
    InitializerList(Vec<Expr>),
    Throw(Option<Box<Expr>>),
    Lambda {
        captures: CaptureMode,
        params: Vec<LambdaParam>,
        return_type: Option<TypeSpec>,
        body: Box<Block>,
        is_mutable: bool,
    },
    /// `requires { ... }` expression.
    Requires {
        params: Vec<Param>,
        requirements: Vec<Requirement>,
    },
    /// Compiler intrinsic such as `__is_class(T)`.
    TraitIntrinsic {
        name: Symbol,
        type_args: Vec<TypeSpec>,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizeofOperand {
    Type(TypeSpec),
    Expr(Box<Expr>),
}

/// A single requirement inside a `requires { ... }` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Requirement {
    /// `expr;` — must be well-formed.
    Simple(Expr),
    /// `{ expr } -> Concept;` or `{ expr } noexcept;`.
    Compound {
        expr: Expr,
        noexcept: bool,
        returns: Option<TypeSpec>,
    },
    /// `typename T::value_type;`
    Type(TypeSpec),
    /// Nested `requires expr;`.
    Nested(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchLabel {
    Case(ConstValue),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<SwitchLabel>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// `None` means `catch (...)`.
    pub param: Option<(Symbol, TypeSpec)>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVarDecl {
    pub name: Symbol,
    pub ty: TypeSpec,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    LocalVar(Vec<LocalVarDecl>),
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    RangeFor {
        init: Option<Box<Stmt>>,
        binding: Symbol,
        binding_ty: Option<TypeSpec>,
        range: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Switch {
        cond: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        body: Block,
        handlers: Vec<CatchClause>,
    },
    /// `__try { } __except(filter) { }` or `__try { } __finally { }`.
    SehTry {
        body: Block,
        except: Option<(Expr, Block)>,
        finally: Option<Block>,
    },
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn function_decl_body_attaches_exactly_once_semantically() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let decl = FunctionDeclBuilder {
            name,
            params: vec![],
            return_type: TypeSpec::named(name),
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
        .build();
        assert!(decl.body().is_none());
        decl.attach_body(Block { stmts: vec![Stmt::Return(None)] });
        assert!(decl.body().is_some());
        assert!(decl.mangled_name().is_none());
        decl.attach_mangled_name(name);
        assert_eq!(decl.mangled_name(), Some(name));
    }
}
