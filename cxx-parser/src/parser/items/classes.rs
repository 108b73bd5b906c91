//! `class`/`struct`/`union` grammar: base-class list, access-specifier
//! sections, fields (with bit-fields and default member initializers),
//! nested classes/enums/aliases, static data members, and member functions
//! (constructors, destructors, operator overloads, `virtual`/`override`/
//! pure-virtual/`const`/`static`/`explicit`/`noexcept`, `= default`/
//! `= delete`).

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{Access, ClassDecl, Decl, DeclId, Expr, FieldDecl, Symbol, TemplateParam, TokenStream};
use std::cell::{Cell, RefCell};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// `class`/`struct`/`union Name [: bases] { members } ;`. Called either
    /// directly (no enclosing `template<...>`) or from the template-item
    /// dispatcher with a non-empty `template_params`.
    pub(crate) fn parse_class(
        &mut self,
        owner_namespace: &[Symbol],
        template_params: Vec<TemplateParam>,
        constraint: Option<Expr>,
    ) -> Result<DeclId, ParseError> {
        let default_access = if self.eat_keyword("struct") {
            Access::Public
        } else if self.eat_keyword("union") {
            Access::Public
        } else {
            self.expect_keyword("class")?;
            Access::Private
        };
        let name = self.consume_identifier()?;
        let bases = self.parse_base_clause(default_access)?;

        let decl = ClassDecl {
            name,
            owner_namespace: owner_namespace.to_vec(),
            bases,
            fields: RefCell::new(Vec::new()),
            methods: RefCell::new(Vec::new()),
            nested: RefCell::new(Vec::new()),
            static_data: RefCell::new(Vec::new()),
            template_params,
            constraint,
            is_polymorphic_hint: Cell::new(false),
            specialization_of: None,
            specialization_args: Vec::new(),
        };
        let (id, _) = self.arena.alloc_decl(Decl::Class(decl));

        self.expect_punct("{")?;
        let mut access = default_access;
        while !self.at_punct("}") && !self.is_at_end() {
            if let Some(a) = self.eat_access_specifier() {
                self.expect_punct(":")?;
                access = a;
                continue;
            }
            self.parse_class_member(id, name, owner_namespace, access)?;
        }
        self.expect_punct("}")?;
        self.eat_punct(";");
        Ok(id)
    }

    fn parse_class_member(
        &mut self,
        owner_class: DeclId,
        class_name: Symbol,
        owner_namespace: &[Symbol],
        access: Access,
    ) -> Result<(), ParseError> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.at_keyword("template") {
            let id = self.parse_template_item(owner_namespace, Some(owner_class), Some(class_name), access)?;
            self.register_member(owner_class, id);
            return Ok(());
        }
        if self.at_any_keyword(&["class", "struct", "union"]) {
            let id = self.parse_class(owner_namespace, Vec::new(), None)?;
            if let Decl::Class(owner) = self.arena.get(owner_class) {
                owner.append_nested(id);
            }
            return Ok(());
        }
        if self.at_keyword("enum") {
            let id = self.parse_enum(owner_namespace)?;
            if let Decl::Class(owner) = self.arena.get(owner_class) {
                owner.append_nested(id);
            }
            return Ok(());
        }
        if self.at_keyword("using") {
            if let Some(id) = self.parse_using(owner_namespace)? {
                if let Decl::Class(owner) = self.arena.get(owner_class) {
                    owner.append_nested(id);
                }
            }
            return Ok(());
        }
        if self.at_keyword("typedef") {
            let id = self.parse_typedef(owner_namespace)?;
            if let Decl::Class(owner) = self.arena.get(owner_class) {
                owner.append_nested(id);
            }
            return Ok(());
        }

        // Constructor/destructor/conversion-operator are detected inside
        // `parse_function_or_variable` via `class_name`; a plain field
        // otherwise falls out of the same type-id-then-declarator path a
        // function does, so try the function/member path first and only
        // fall back to `parse_field` when it isn't a function.
        if self.looks_like_member_function(class_name) {
            let ids = self.parse_function_or_variable(
                owner_namespace,
                Some(owner_class),
                Some(class_name),
                access,
                Vec::new(),
                None,
            )?;
            for id in ids {
                self.register_member_or_static(owner_class, id);
            }
            return Ok(());
        }

        self.parse_field(owner_class, access)
    }

    fn register_member(&mut self, owner_class: DeclId, id: DeclId) {
        if let Decl::Class(owner) = self.arena.get(owner_class) {
            owner.append_member_function(id);
        }
    }

    fn register_member_or_static(&mut self, owner_class: DeclId, id: DeclId) {
        match self.arena.get(id) {
            Decl::Variable(_) => {
                if let Decl::Class(owner) = self.arena.get(owner_class) {
                    owner.append_static_data(id);
                }
            }
            _ => {
                if let Decl::Class(owner) = self.arena.get(owner_class) {
                    owner.append_member_function(id);
                }
            }
        }
    }

    /// Heuristic covering every member-function spelling: a leading
    /// `static`/`virtual`/`explicit`, a destructor's `~`, a constructor
    /// (identifier matching the class name followed by `(`), a conversion
    /// operator, an operator-function-id, or any type-id that is ultimately
    /// followed by `(` before its terminating `;`/`{`/`=`.
    fn looks_like_member_function(&self, class_name: Symbol) -> bool {
        if self.at_any_keyword(&["static", "virtual", "explicit", "inline", "constexpr", "friend"]) {
            return true;
        }
        if self.at_punct("~") {
            return true;
        }
        if self.at_identifier() && self.peek().lexeme == class_name {
            let next = self.peek_at(1);
            if next.kind == cxx_ast::TokenKind::Punctuator
                && &*self.interner.resolve(next.lexeme) == "("
            {
                return true;
            }
        }
        // Fields also start with a type-id; the `(` after the declared name
        // is what distinguishes a method, so scan ahead conservatively.
        self.type_id_then_paren_follows()
    }

    /// Scans past a plausible type-id and one declarator name, reporting
    /// whether a `(` (a parameter list) comes next. Uses save/restore since
    /// this only peeks; it never consumes on behalf of the caller.
    fn type_id_then_paren_follows(&mut self) -> bool {
        let save = self.stream.save();
        let result = self.type_id_then_paren_follows_inner();
        self.stream.restore(save);
        result
    }

    fn type_id_then_paren_follows_inner(&mut self) -> bool {
        if self.at_keyword("operator") {
            return true;
        }
        if self.parse_type().is_err() {
            return false;
        }
        if !self.at_identifier() {
            return false;
        }
        self.bump();
        self.at_punct("(")
    }

    fn parse_field(&mut self, owner_class: DeclId, access: Access) -> Result<(), ParseError> {
        let ty = self.parse_type()?;
        loop {
            let name = self.consume_identifier()?;
            let bit_width = if self.eat_punct(":") {
                let tok = self.peek();
                if tok.kind != cxx_ast::TokenKind::Literal {
                    return Err(self.error("expected a bit-field width"));
                }
                let text = self.interner.resolve(tok.lexeme);
                let width: u32 = text.parse().map_err(|_| self.error("invalid bit-field width"))?;
                self.bump();
                Some(width)
            } else {
                None
            };
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else if self.at_punct("{") {
                Some(self.parse_braced_or_paren_init()?)
            } else {
                None
            };
            let field = FieldDecl { name, ty: ty.clone(), access, bit_width, init };
            if let Decl::Class(owner) = self.arena.get(owner_class) {
                owner.fields.borrow_mut().push(field);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(";")?;
        Ok(())
    }
}
