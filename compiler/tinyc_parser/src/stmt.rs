use tinyc_ast::{Stmt, VarDecl};
use tinyc_lexer::TokenKind;

use crate::error::ParseError;
use crate::parser::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::LeftBrace => {
                self.push_scope();
                let block = self.parse_block()?;
                self.pop_scope();
                Ok(Stmt::Compound(block))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::Continue)
            }
            _ if self.looks_like_type_start() => self.parse_var_decl(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'('")?;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::RightParen, "')'")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'('")?;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::RightParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'('")?;
        self.push_scope();

        let init = if self.check(&TokenKind::Semicolon) {
            self.advance();
            None
        } else if self.looks_like_type_start() {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "';'")?;
            Some(Box::new(Stmt::Expr(expr)))
        };

        let cond = if self.check(&TokenKind::Semicolon) { None } else { Some(self.parse_condition()?) };
        self.expect(TokenKind::Semicolon, "';'")?;

        let step = if self.check(&TokenKind::RightParen) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::RightParen, "')'")?;

        let body = Box::new(self.parse_stmt()?);
        self.pop_scope();
        Ok(Stmt::For { init, cond, step, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(Stmt::Return(None));
        }
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Return(Some(expr)))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let pos = self.peek().pos;
        let name = self.expect_identifier("a variable name")?;
        let init = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let local = self.declare_local(name.clone(), ty, pos)?;
        Ok(Stmt::VarDecl(VarDecl { local, name, ty, init }))
    }
}
