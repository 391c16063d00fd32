use tinyc_ast::{BasicKind, Ty};
use tinyc_lexer::TokenKind;

use crate::error::ParseError;
use crate::parser::Parser;

impl<'a> Parser<'a> {
    /// Parses a type: an optional leading `const`, a basic type keyword or
    /// `struct Name`, then zero or more `*` (each optionally followed by its
    /// own `const`).
    pub(crate) fn parse_type(&mut self) -> Result<Ty, ParseError> {
        let mut top_const = false;
        if self.check(&TokenKind::Const) {
            self.advance();
            top_const = true;
        }

        let mut ty = match &self.peek().kind {
            TokenKind::Bool => {
                self.advance();
                Ty::new(BasicKind::Bool)
            }
            TokenKind::S8 => {
                self.advance();
                Ty::new(BasicKind::S8)
            }
            TokenKind::U8 => {
                self.advance();
                Ty::new(BasicKind::U8)
            }
            TokenKind::S32 => {
                self.advance();
                Ty::new(BasicKind::S32)
            }
            TokenKind::F32 => {
                self.advance();
                Ty::new(BasicKind::F32)
            }
            TokenKind::F64 => {
                self.advance();
                Ty::new(BasicKind::F64)
            }
            TokenKind::Void => {
                self.advance();
                Ty::new(BasicKind::Void)
            }
            TokenKind::Struct => {
                self.advance();
                let pos = self.peek().pos;
                let name = self.expect_identifier("struct name")?;
                let id = self.ensure_struct_declared(&name, pos);
                Ty::struct_(id)
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.clone(),
                    expected: "a type",
                    pos: self.peek().pos,
                })
            }
        };
        ty = ty.with_top_const(top_const);

        while self.check(&TokenKind::Star) {
            self.advance();
            let const_here = if self.check(&TokenKind::Const) {
                self.advance();
                true
            } else {
                false
            };
            ty = ty.pointer_to(const_here).ok_or_else(|| ParseError::Other {
                message: "pointer indirection level too deep".into(),
                pos: self.peek().pos,
            })?;
        }

        Ok(ty)
    }
}
