//! Built-in arithmetic type specifiers: the `signed`/`unsigned`/`short`/
//! `long` combinations the base-type grammar enumerates.

use super::super::Parser;
use cxx_ast::{BaseTypeRef, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Try to consume a primitive arithmetic or `void`/`bool` base type.
    /// Handles the combinable specifiers (`unsigned long long`, `signed
    /// char`, bare `long` meaning `long int`) the way the standard grammar
    /// allows them in any order before the final type keyword.
    pub(crate) fn try_parse_primitive_base(&mut self) -> Option<BaseTypeRef> {
        if self.eat_keyword("void") {
            return Some(BaseTypeRef::Void);
        }
        if self.eat_keyword("bool") {
            return Some(BaseTypeRef::Bool);
        }
        if self.eat_keyword("float") {
            return Some(BaseTypeRef::Float);
        }
        if self.eat_keyword("double") {
            if self.eat_keyword("long") {
                // unusual spelling order `double long`; standard spelling is
                // `long double`, handled below. Treat equivalently.
                return Some(BaseTypeRef::LongDouble);
            }
            return Some(BaseTypeRef::Double);
        }

        let mut signed = false;
        let mut unsigned = false;
        let mut long_count = 0u32;
        let mut short = false;
        let mut char_seen = false;
        let mut saw_any = false;

        loop {
            if self.eat_keyword("signed") {
                signed = true;
                saw_any = true;
            } else if self.eat_keyword("unsigned") {
                unsigned = true;
                saw_any = true;
            } else if self.eat_keyword("short") {
                short = true;
                saw_any = true;
            } else if self.eat_keyword("long") {
                long_count += 1;
                saw_any = true;
            } else if self.eat_keyword("char") {
                char_seen = true;
                saw_any = true;
                break;
            } else if self.eat_keyword("int") {
                saw_any = true;
                break;
            } else if self.eat_keyword("double") {
                return Some(BaseTypeRef::LongDouble);
            } else {
                break;
            }
        }

        if !saw_any {
            return None;
        }

        if char_seen {
            return Some(if unsigned {
                BaseTypeRef::UChar
            } else if signed {
                BaseTypeRef::SChar
            } else {
                BaseTypeRef::Char
            });
        }

        Some(match (short, long_count, unsigned) {
            (true, _, true) => BaseTypeRef::UShort,
            (true, _, false) => BaseTypeRef::Short,
            (false, 0, true) => BaseTypeRef::UInt,
            (false, 0, false) => BaseTypeRef::Int,
            (false, 1, true) => BaseTypeRef::ULong,
            (false, 1, false) => BaseTypeRef::Long,
            (false, _, true) => BaseTypeRef::ULongLong,
            (false, _, false) => BaseTypeRef::LongLong,
        })
    }
}
