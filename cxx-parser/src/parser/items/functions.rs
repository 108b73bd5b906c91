//! Function and variable declarations (free or member), sharing one
//! disambiguation path: both start with a type-id, and what follows the
//! declared name (`(` or not) decides which one it is.

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{
    Access, BaseTypeRef, Decl, DeclId, Expr, FunctionDeclBuilder, Param, RefQualifier, Symbol,
    TemplateParam, TokenRange, TokenStream, TypeSpec, VariableDecl,
};

pub(crate) struct DeclSpecifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_explicit: bool,
}

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Leading keywords that modify a declaration but aren't part of its
    /// type: `static`/`virtual`/`explicit` are kept, `inline`/`constexpr`/
    /// `friend` are recognized and discarded (no corresponding flag on
    /// `FunctionDecl`/`VariableDecl` in this core).
    pub(crate) fn parse_decl_specifiers(&mut self) -> DeclSpecifiers {
        let mut spec = DeclSpecifiers { is_static: false, is_virtual: false, is_explicit: false };
        loop {
            if self.eat_keyword("static") {
                spec.is_static = true;
            } else if self.eat_keyword("virtual") {
                spec.is_virtual = true;
            } else if self.eat_keyword("explicit") {
                spec.is_explicit = true;
            } else if self.eat_keyword("inline") || self.eat_keyword("constexpr") || self.eat_keyword("friend") {
                continue;
            } else {
                break;
            }
        }
        spec
    }

    pub(crate) fn parse_param_list(&mut self) -> Result<(Vec<Param>, bool), ParseError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        let mut is_variadic = false;
        if self.eat_keyword("void") && self.at_punct(")") {
            self.bump();
            return Ok((params, false));
        }
        if !self.at_punct(")") {
            loop {
                if self.eat_punct("...") {
                    is_variadic = true;
                    break;
                }
                let ty = self.parse_type()?;
                let name = if self.at_identifier() { self.consume_identifier()? } else { self.interner.intern("") };
                let default = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
                params.push(Param { name, ty, default });
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok((params, is_variadic))
    }

    /// `operator+`, `operator==`, `operator[]`, `operator()`, ... — the
    /// overloadable-operator subset this core supports, name-mangled into a
    /// single `Symbol` (`"operator" ++ spelling`) so overload lookup can key
    /// on a plain name like any other function.
    pub(crate) fn parse_operator_name(&mut self) -> Result<Symbol, ParseError> {
        self.expect_keyword("operator")?;
        if self.eat_punct("(") {
            self.expect_punct(")")?;
            return Ok(self.interner.intern("operator()"));
        }
        if self.eat_punct("[") {
            self.expect_punct("]")?;
            return Ok(self.interner.intern("operator[]"));
        }
        const SPELLINGS: &[&str] = &[
            "<=>", "==", "!=", "<=", ">=", "&&", "||", "<<=", ">>=", "<<", ">>", "++", "--",
            "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "->", "+", "-", "*", "/", "%", "^",
            "&", "|", "~", "!", "=", "<", ">",
        ];
        for spelling in SPELLINGS {
            if self.eat_punct(spelling) {
                return Ok(self.interner.intern(&format!("operator{spelling}")));
            }
        }
        Err(self.error("expected an overloadable operator after 'operator'"))
    }

    /// `operator Type()`: a user-defined conversion function, named from the
    /// target type's spelling since it has no ordinary identifier.
    fn parse_conversion_operator_name(&mut self) -> Result<(Symbol, TypeSpec), ParseError> {
        self.expect_keyword("operator")?;
        let ty = self.parse_type()?;
        let name = self.interner.intern(&format!("operator {}", spell_base(&ty.base, self.interner)));
        Ok((name, ty))
    }

    /// Dispatch for both global/namespace-scope and class-member
    /// declarations. `owner_class`/`class_name` are `Some` only when parsing
    /// inside a class body, which additionally makes constructor/destructor
    /// and conversion-operator forms possible.
    pub(crate) fn parse_function_or_variable(
        &mut self,
        owner_namespace: &[Symbol],
        owner_class: Option<DeclId>,
        class_name: Option<Symbol>,
        access: Access,
        template_params: Vec<TemplateParam>,
        constraint: Option<Expr>,
    ) -> Result<Vec<DeclId>, ParseError> {
        let spec = self.parse_decl_specifiers();

        if let Some(class_name) = class_name {
            if self.at_punct("~") {
                self.bump();
                let name_tok = self.consume_identifier()?;
                if name_tok != class_name {
                    return Err(self.error("destructor name must match its class"));
                }
                let name = self.interner.intern(&format!("~{}", self.interner.resolve(class_name)));
                let id = self.parse_function_tail(
                    name,
                    void_type(),
                    owner_namespace,
                    owner_class,
                    access,
                    &spec,
                    Vec::new(),
                    None,
                    template_params,
                    constraint,
                )?;
                return Ok(vec![id]);
            }
            if self.at_identifier() && {
                let tok = self.peek();
                tok.lexeme == class_name
            } && self.peek_at(1).kind == cxx_ast::TokenKind::Punctuator
                && &*self.interner.resolve(self.peek_at(1).lexeme) == "("
            {
                let name = self.consume_identifier()?;
                let (params, is_variadic) = self.parse_param_list()?;
                let id = self.parse_function_tail(
                    name,
                    void_type(),
                    owner_namespace,
                    owner_class,
                    access,
                    &spec,
                    params,
                    Some(is_variadic),
                    template_params,
                    constraint,
                )?;
                return Ok(vec![id]);
            }
            if self.at_keyword("operator") && self.peek_at(1).kind != cxx_ast::TokenKind::Punctuator {
                let (name, ty) = self.parse_conversion_operator_name()?;
                self.expect_punct("(")?;
                self.expect_punct(")")?;
                let id = self.parse_function_tail(
                    name, ty, owner_namespace, owner_class, access, &spec, Vec::new(), Some(false),
                    template_params, constraint,
                )?;
                return Ok(vec![id]);
            }
        }

        let return_type = self.parse_type()?;
        let name = if self.at_keyword("operator") {
            self.parse_operator_name()?
        } else {
            self.consume_identifier()?
        };

        if self.at_punct("(") {
            let id = self.parse_function_tail(
                name,
                return_type,
                owner_namespace,
                owner_class,
                access,
                &spec,
                Vec::new(),
                None,
                template_params,
                constraint,
            )?;
            return Ok(vec![id]);
        }

        self.parse_variable_declarators(return_type, name, owner_namespace, owner_class, spec.is_static, template_params)
    }

    /// Parses the parameter list onward for a declaration whose name and
    /// return type are already known (handles the common path; constructors/
    /// destructors/conversion operators call this after supplying their own
    /// params when needed).
    fn parse_function_tail(
        &mut self,
        name: Symbol,
        return_type: TypeSpec,
        owner_namespace: &[Symbol],
        owner_class: Option<DeclId>,
        access: Access,
        spec: &DeclSpecifiers,
        mut params: Vec<Param>,
        variadic_known: Option<bool>,
        template_params: Vec<TemplateParam>,
        constraint: Option<Expr>,
    ) -> Result<DeclId, ParseError> {
        let mut is_variadic = variadic_known.unwrap_or(false);
        if variadic_known.is_none() {
            let (p, v) = self.parse_param_list()?;
            params = p;
            is_variadic = v;
        }

        let is_const = self.eat_keyword("const");
        let ref_qualifier = if self.eat_punct("&&") {
            Some(RefQualifier::RValue)
        } else if self.eat_punct("&") {
            Some(RefQualifier::LValue)
        } else {
            None
        };
        let is_noexcept = self.eat_keyword("noexcept");
        if is_noexcept && self.eat_punct("(") {
            let _ = self.parse_expression()?;
            self.expect_punct(")")?;
        }
        let is_override = self.eat_keyword("override");
        self.eat_keyword("final");

        let mut is_pure_virtual = false;
        let mut is_deleted = false;
        let mut is_defaulted = false;
        let mut body = None;
        let mut body_tokens = None;

        if self.eat_punct("=") {
            if self.eat_keyword("default") {
                is_defaulted = true;
            } else if self.eat_keyword("delete") {
                is_deleted = true;
            } else {
                // pure-virtual `= 0`
                self.bump();
                is_pure_virtual = true;
            }
            self.expect_punct(";")?;
        } else if self.eat_punct(";") {
            // declaration only
        } else if template_params.is_empty() {
            // Ordinary function: parse the body now, there's nothing to
            // instantiate later.
            body = Some(self.parse_block()?);
        } else {
            // Function template: the body is only meaningful once
            // instantiated with concrete template arguments, so its tokens
            // are saved for a later re-parse rather than parsed now.
            body_tokens = Some(self.skip_function_body()?);
        }

        let builder = FunctionDeclBuilder {
            name,
            params,
            return_type,
            is_variadic,
            is_virtual: spec.is_virtual,
            is_pure_virtual,
            is_override,
            is_const,
            is_static: spec.is_static,
            is_explicit: spec.is_explicit,
            is_noexcept,
            ref_qualifier,
            access,
            owner_class,
            owner_namespace: owner_namespace.to_vec(),
            template_params,
            constraint,
            body_tokens,
            body,
        };
        let (id, decl) = self.arena.alloc_decl(Decl::Function(builder.build()));
        if let Decl::Function(f) = decl {
            if is_deleted {
                f.mark_deleted();
            }
            if is_defaulted {
                f.mark_defaulted();
            }
        }
        Ok(id)
    }

    /// Consumes a balanced `{ ... }` without building a `Block`, recording
    /// its token span for deferred re-parsing (used for template bodies,
    /// which are only ever parsed once the template is instantiated with
    /// concrete arguments).
    pub(crate) fn skip_function_body(&mut self) -> Result<TokenRange, ParseError> {
        let file = self.peek().file;
        let begin = self.stream.save();
        self.expect_punct("{")?;
        let mut depth = 1u32;
        while depth > 0 {
            if self.is_at_end() {
                return Err(self.error("unexpected end of input inside a function body"));
            }
            if self.at_punct("{") {
                depth += 1;
                self.bump();
            } else if self.at_punct("}") {
                depth -= 1;
                self.bump();
            } else {
                self.bump();
            }
        }
        let end = self.stream.save();
        Ok(TokenRange { file, begin, end })
    }

    fn parse_variable_declarators(
        &mut self,
        base_ty: TypeSpec,
        first_name: Symbol,
        owner_namespace: &[Symbol],
        owner_class: Option<DeclId>,
        is_static: bool,
        template_params: Vec<TemplateParam>,
    ) -> Result<Vec<DeclId>, ParseError> {
        let mut ids = Vec::new();
        let mut name = first_name;
        loop {
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else if self.at_punct("(") || self.at_punct("{") {
                Some(self.parse_braced_or_paren_init()?)
            } else {
                None
            };
            let decl = VariableDecl {
                name,
                owner_namespace: owner_namespace.to_vec(),
                owner_class,
                ty: base_ty.clone(),
                is_static,
                template_params: template_params.clone(),
                init,
            };
            let (id, _) = self.arena.alloc_decl(Decl::Variable(decl));
            ids.push(id);
            if !self.eat_punct(",") {
                break;
            }
            name = self.consume_identifier()?;
        }
        self.expect_punct(";")?;
        Ok(ids)
    }
}

fn void_type() -> TypeSpec {
    TypeSpec {
        base: BaseTypeRef::Void,
        pointer_levels: Vec::new(),
        reference: None,
        cv: cxx_ast::CvQual::default(),
        bit_width: None,
        function_sig: None,
        template_args: Vec::new(),
        array_dims: Vec::new(),
    }
}

fn spell_base(base: &BaseTypeRef, interner: &cxx_ast::Interner) -> String {
    match base {
        BaseTypeRef::Named(sym) => interner.resolve(*sym).to_string(),
        BaseTypeRef::Qualified(path) => path
            .iter()
            .map(|s| interner.resolve(*s).to_string())
            .collect::<Vec<_>>()
            .join("::"),
        BaseTypeRef::Void => "void".into(),
        BaseTypeRef::Bool => "bool".into(),
        BaseTypeRef::Int => "int".into(),
        BaseTypeRef::Double => "double".into(),
        BaseTypeRef::Float => "float".into(),
        other => format!("{other:?}"),
    }
}
