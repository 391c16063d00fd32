use tinyc_utils::{render_source_excerpt, SourcePos};

#[derive(Debug, Clone)]
pub enum LexError {
    UnexpectedChar { ch: char, pos: SourcePos },
    UnterminatedString { pos: SourcePos },
    UnterminatedChar { pos: SourcePos },
    InvalidEscape { ch: char, pos: SourcePos },
    EmptyCharLiteral { pos: SourcePos },
}

impl LexError {
    pub fn pos(&self) -> SourcePos {
        match self {
            LexError::UnexpectedChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::UnterminatedChar { pos }
            | LexError::InvalidEscape { pos, .. }
            | LexError::EmptyCharLiteral { pos } => *pos,
        }
    }

    pub fn render(&self, source: &str) -> String {
        format!("{}\n{}", self, render_source_excerpt(source, self.pos()))
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedChar { ch, pos } => {
                write!(f, "{pos}: unexpected character '{ch}'")
            }
            LexError::UnterminatedString { pos } => write!(f, "{pos}: unterminated string literal"),
            LexError::UnterminatedChar { pos } => write!(f, "{pos}: unterminated character literal"),
            LexError::InvalidEscape { ch, pos } => write!(f, "{pos}: invalid escape sequence '\\{ch}'"),
            LexError::EmptyCharLiteral { pos } => write!(f, "{pos}: empty character literal"),
        }
    }
}

impl std::error::Error for LexError {}
