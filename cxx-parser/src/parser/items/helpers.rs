//! Shared helpers used by more than one item-grammar submodule: access
//! specifiers and base-class lists (`class`/`struct` grammar), and template
//! parameter lists (plain templates and template template-parameters).

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{Access, BaseSpec, ConstValue, TemplateParam, TemplateParamKind, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn eat_access_specifier(&mut self) -> Option<Access> {
        if self.eat_keyword("public") {
            Some(Access::Public)
        } else if self.eat_keyword("protected") {
            Some(Access::Protected)
        } else if self.eat_keyword("private") {
            Some(Access::Private)
        } else {
            None
        }
    }

    /// `: [public|protected|private] [virtual] Base, ...` following a
    /// class/struct head. `default_access` is `Public` for `struct`,
    /// `Private` for `class`, per C++'s own default-access rule.
    pub(crate) fn parse_base_clause(
        &mut self,
        default_access: Access,
    ) -> Result<Vec<BaseSpec>, ParseError> {
        let mut bases = Vec::new();
        if !self.eat_punct(":") {
            return Ok(bases);
        }
        loop {
            let mut access = default_access;
            let mut is_virtual = false;
            loop {
                if let Some(a) = self.eat_access_specifier() {
                    access = a;
                } else if self.eat_keyword("virtual") {
                    is_virtual = true;
                } else {
                    break;
                }
            }
            let path = self.parse_name_path()?;
            let name = *path.last().unwrap();
            bases.push(BaseSpec { name, access, is_virtual });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(bases)
    }

    /// `template<...>` header: type, non-type, and template template
    /// parameters, each with an optional default.
    pub(crate) fn parse_template_param_list(&mut self) -> Result<Vec<TemplateParam>, ParseError> {
        self.expect_keyword("template")?;
        self.expect_punct("<")?;
        let mut params = Vec::new();
        if !self.at_punct(">") {
            loop {
                params.push(self.parse_template_param()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.close_template_angle()?;
        Ok(params)
    }

    fn parse_template_param(&mut self) -> Result<TemplateParam, ParseError> {
        if self.at_keyword("template") {
            // Template template-parameter: `template<...> class Name = Default`.
            self.parse_template_param_list()?;
            self.expect_any_keyword(&["class", "typename"])?;
            let name = self.consume_identifier()?;
            let default_type = if self.eat_punct("=") { Some(self.parse_type()?) } else { None };
            return Ok(TemplateParam {
                kind: TemplateParamKind::Template,
                name,
                non_type_ty: None,
                default_type,
                default_const: None,
            });
        }
        if self.at_any_keyword(&["class", "typename"]) {
            self.bump();
            let is_pack = self.eat_punct("...");
            let name = self.consume_identifier()?;
            let default_type = if self.eat_punct("=") { Some(self.parse_type()?) } else { None };
            let _ = is_pack; // variadic packs collapse to a single parameter slot in this core
            return Ok(TemplateParam {
                kind: TemplateParamKind::Type,
                name,
                non_type_ty: None,
                default_type,
                default_const: None,
            });
        }
        // Non-type template parameter: a type-id followed by a name.
        let ty = self.parse_type()?;
        let name = self.consume_identifier()?;
        let default_const = if self.eat_punct("=") {
            Some(self.parse_template_default_const()?)
        } else {
            None
        };
        Ok(TemplateParam {
            kind: TemplateParamKind::NonType,
            name,
            non_type_ty: Some(ty),
            default_type: None,
            default_const,
        })
    }

    fn parse_template_default_const(&mut self) -> Result<ConstValue, ParseError> {
        if self.eat_keyword("true") {
            return Ok(ConstValue::Bool(true));
        }
        if self.eat_keyword("false") {
            return Ok(ConstValue::Bool(false));
        }
        let negative = self.eat_punct("-");
        let tok = self.peek();
        if tok.kind == cxx_ast::TokenKind::Literal {
            let text = self.interner.resolve(tok.lexeme);
            if let Ok(v) = text.trim_end_matches(['u', 'U', 'l', 'L']).parse::<i64>() {
                self.bump();
                return Ok(ConstValue::Int(if negative { -v } else { v }));
            }
        }
        Err(self.error("expected a constant default template argument"))
    }

    pub(crate) fn expect_any_keyword(&mut self, kws: &[&str]) -> Result<(), ParseError> {
        for kw in kws {
            if self.eat_keyword(kw) {
                return Ok(());
            }
        }
        Err(self.error(&format!("expected one of {kws:?}")))
    }
}
