use tinyc_utils::SourcePos;

use crate::error::LexError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, chars: source.char_indices().peekable(), line: 1, col: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_at(&self, byte_idx: usize) -> Option<char> {
        self.source[byte_idx..].chars().next()
    }

    fn byte_idx(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.source.len())
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let idx = self.byte_idx();
                    match self.peek_at(idx + 1) {
                        Some('/') => {
                            while let Some(c) = self.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            loop {
                                match self.peek() {
                                    None => break,
                                    Some('*') => {
                                        self.bump();
                                        if self.peek() == Some('/') {
                                            self.bump();
                                            break;
                                        }
                                    }
                                    Some(_) => {
                                        self.bump();
                                    }
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();
        let pos = self.pos();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, pos));
        };

        if c.is_ascii_digit() {
            return self.lex_number(pos);
        }
        if c == '_' || c.is_alphabetic() {
            return self.lex_identifier_or_keyword(pos);
        }
        if c == '"' {
            return self.lex_string(pos);
        }
        if c == '\'' {
            return self.lex_char(pos);
        }

        self.bump();
        let kind = match c {
            '+' => self.two_char('=', TokenKind::PlusEqual, TokenKind::Plus, '+', TokenKind::PlusPlus),
            '-' => self.lex_minus(),
            '*' => self.two_char_eq(TokenKind::StarEqual, TokenKind::Star),
            '/' => self.two_char_eq(TokenKind::SlashEqual, TokenKind::Slash),
            '|' => {
                if self.peek() == Some('|') {
                    self.bump();
                    TokenKind::VbarVbar
                } else {
                    return Err(LexError::UnexpectedChar { ch: c, pos });
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.bump();
                    TokenKind::AmpersandAmpersand
                } else {
                    TokenKind::Ampersand
                }
            }
            '=' => self.two_char_eq(TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.two_char_eq(TokenKind::BangEqual, TokenKind::Bang),
            '>' => self.two_char_eq(TokenKind::GreaterEqual, TokenKind::Greater),
            '<' => self.two_char_eq(TokenKind::LessEqual, TokenKind::Less),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '%' => TokenKind::Percent,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '.' => TokenKind::Dot,
            other => return Err(LexError::UnexpectedChar { ch: other, pos }),
        };
        Ok(Token::new(kind, pos))
    }

    fn lex_minus(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.bump();
                TokenKind::MinusEqual
            }
            Some('-') => {
                self.bump();
                TokenKind::MinusMinus
            }
            Some('>') => {
                self.bump();
                TokenKind::Arrow
            }
            _ => TokenKind::Minus,
        }
    }

    fn two_char_eq(&mut self, if_eq: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.bump();
            if_eq
        } else {
            otherwise
        }
    }

    fn two_char(
        &mut self,
        eq_char: char,
        if_eq: TokenKind,
        otherwise: TokenKind,
        dup_char: char,
        if_dup: TokenKind,
    ) -> TokenKind {
        match self.peek() {
            Some(c) if c == eq_char => {
                self.bump();
                if_eq
            }
            Some(c) if c == dup_char => {
                self.bump();
                if_dup
            }
            _ => otherwise,
        }
    }

    fn lex_identifier_or_keyword(&mut self, pos: SourcePos) -> Result<Token, LexError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = match ident.as_str() {
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "bool" => TokenKind::Bool,
            "s8" => TokenKind::S8,
            "u8" => TokenKind::U8,
            "s32" => TokenKind::S32,
            "f32" => TokenKind::F32,
            "f64" => TokenKind::F64,
            "void" => TokenKind::Void,
            "nullptr" => TokenKind::Nullptr,
            "const" => TokenKind::Const,
            "struct" => TokenKind::Struct,
            "sizeof" => TokenKind::Sizeof,
            _ => TokenKind::Identifier(ident),
        };
        Ok(Token::new(kind, pos))
    }

    fn lex_number(&mut self, pos: SourcePos) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            Ok(Token::new(TokenKind::FloatNumber(value), pos))
        } else {
            let value: i32 = text.parse().unwrap_or(0);
            Ok(Token::new(TokenKind::IntNumber(value), pos))
        }
    }

    fn lex_escape(&mut self, pos: SourcePos) -> Result<u8, LexError> {
        let c = self.bump().ok_or(LexError::UnterminatedString { pos })?;
        Ok(match c {
            'n' => b'\n',
            '0' => 0u8,
            '\\' => b'\\',
            '"' => b'"',
            '\'' => b'\'',
            other => return Err(LexError::InvalidEscape { ch: other, pos }),
        })
    }

    fn lex_string(&mut self, pos: SourcePos) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::UnterminatedString { pos }),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    bytes.push(self.lex_escape(pos)?);
                }
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    self.bump();
                }
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Token::new(TokenKind::StringLiteral(text), pos))
    }

    fn lex_char(&mut self, pos: SourcePos) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let value = match self.peek() {
            None => return Err(LexError::UnterminatedChar { pos }),
            Some('\'') => return Err(LexError::EmptyCharLiteral { pos }),
            Some('\\') => {
                self.bump();
                self.lex_escape(pos)? as i8
            }
            Some(c) => {
                self.bump();
                if !c.is_ascii() {
                    return Err(LexError::InvalidEscape { ch: c, pos });
                }
                c as i8
            }
        };
        if self.peek() != Some('\'') {
            return Err(LexError::UnterminatedChar { pos });
        }
        self.bump();
        Ok(Token::new(TokenKind::CharLiteral(value), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn arithmetic_expression() {
        let k = kinds("2+3*4==14");
        assert_eq!(
            k,
            vec![
                TokenKind::IntNumber(2),
                TokenKind::Plus,
                TokenKind::IntNumber(3),
                TokenKind::Star,
                TokenKind::IntNumber(4),
                TokenKind::EqualEqual,
                TokenKind::IntNumber(14),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        let k = kinds("s32 x = sizeof(struct Foo);");
        assert_eq!(k[0], TokenKind::S32);
        assert_eq!(k[1], TokenKind::Identifier("x".into()));
        assert_eq!(k[3], TokenKind::Sizeof);
    }

    #[test]
    fn string_literal_with_escapes() {
        let k = kinds("\"a\\nb\"");
        assert_eq!(k[0], TokenKind::StringLiteral("a\nb".into()));
    }

    #[test]
    fn double_char_tokens() {
        let k = kinds("a += 1; b->c; x++ -- y &&z || w");
        assert!(k.contains(&TokenKind::PlusEqual));
        assert!(k.contains(&TokenKind::Arrow));
        assert!(k.contains(&TokenKind::PlusPlus));
        assert!(k.contains(&TokenKind::MinusMinus));
        assert!(k.contains(&TokenKind::AmpersandAmpersand));
        assert!(k.contains(&TokenKind::VbarVbar));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }
}
