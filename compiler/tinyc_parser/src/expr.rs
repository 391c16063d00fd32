use tinyc_ast::{AssignOp, BinOp, Expr, Literal, UnOp};
use tinyc_lexer::TokenKind;
use tinyc_utils::SourcePos;

use crate::error::ParseError;
use crate::parser::Parser;

impl<'a> Parser<'a> {
    /// Parses a full expression, including assignment.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parses a condition for `if`/`while`/`for`: a bare top-level `=` is
    /// rejected (it is almost always a typo for `==`), but `(a = b)` is
    /// accepted since the parentheses make the intent explicit.
    pub(crate) fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        let pos = self.peek().pos;
        let expr = self.parse_expr()?;
        if matches!(expr, Expr::Assign(..)) {
            return Err(ParseError::AssignmentInCondition { pos });
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_logical_or()?;

        let op = match self.peek_kind() {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::AddAssign,
            TokenKind::MinusEqual => AssignOp::SubAssign,
            TokenKind::StarEqual => AssignOp::MulAssign,
            TokenKind::SlashEqual => AssignOp::DivAssign,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_assignment()?;
        Ok(Expr::Assign(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_logical_and()?;
        while self.check(&TokenKind::VbarVbar) {
            self.advance();
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqualEqual => BinOp::Eq,
                TokenKind::BangEqual => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Lt,
                TokenKind::LessEqual => BinOp::Le,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::GreaterEqual => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            TokenKind::Ampersand => Some(UnOp::AddressOf),
            TokenKind::Star => Some(UnOp::Deref),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }

        if self.check(&TokenKind::Sizeof) {
            self.advance();
            self.expect(TokenKind::LeftParen, "'('")?;
            let ty = self.parse_type()?;
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(Expr::SizeOf(ty));
        }

        if self.check(&TokenKind::LeftParen) && self.looks_like_cast() {
            self.advance();
            let ty = self.parse_type()?;
            self.expect(TokenKind::RightParen, "')'")?;
            let operand = self.parse_unary()?;
            return Ok(Expr::Cast(ty, Box::new(operand)));
        }

        self.parse_postfix()
    }

    /// Distinguishes `(type)expr` from `(expr)`: only the former starts with
    /// a type keyword immediately after the `(`.
    fn looks_like_cast(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(
                TokenKind::Const
                    | TokenKind::Bool
                    | TokenKind::S8
                    | TokenKind::U8
                    | TokenKind::S32
                    | TokenKind::F32
                    | TokenKind::F64
                    | TokenKind::Void
                    | TokenKind::Struct
            )
        )
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier("a member name")?;
                    expr = Expr::Member(Box::new(expr), name);
                }
                TokenKind::Arrow => {
                    self.advance();
                    let name = self.expect_identifier("a member name")?;
                    expr = Expr::Arrow(Box::new(expr), name);
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RightBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.peek().pos;
        match self.peek_kind().clone() {
            TokenKind::IntNumber(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(v)))
            }
            TokenKind::FloatNumber(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(v)))
            }
            TokenKind::CharLiteral(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Char(v)))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Nullptr => {
                self.advance();
                Ok(Expr::Literal(Literal::Nullptr))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) && self.func_names.contains_key(&name) {
                    let func_id = self.func_names[&name];
                    self.advance();
                    let args = self.parse_arg_list()?;
                    self.expect(TokenKind::RightParen, "')'")?;
                    return Ok(Expr::Call(func_id, name, args));
                }
                self.resolve_identifier(name, pos)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            other => Err(ParseError::UnexpectedToken { found: other, expected: "an expression", pos }),
        }
    }

    fn resolve_identifier(&mut self, name: String, pos: SourcePos) -> Result<Expr, ParseError> {
        if let Some(local) = self.resolve_local(&name) {
            return Ok(Expr::Local(local, name));
        }
        if let Some(&global) = self.global_names.get(&name) {
            return Ok(Expr::Global(global, name));
        }
        Err(ParseError::UnknownIdentifier { name, pos })
    }
}
