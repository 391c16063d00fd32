use tinyc_lexer::TokenKind;
use tinyc_utils::{render_source_excerpt, SourcePos};

#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken { found: TokenKind, expected: &'static str, pos: SourcePos },
    UnknownIdentifier { name: String, pos: SourcePos },
    UnknownType { name: String, pos: SourcePos },
    DuplicateDefinition { name: String, pos: SourcePos },
    RedefinitionOfStruct { name: String, pos: SourcePos },
    AssignmentInCondition { pos: SourcePos },
    Other { message: String, pos: SourcePos },
}

impl ParseError {
    pub fn pos(&self) -> SourcePos {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnknownIdentifier { pos, .. }
            | ParseError::UnknownType { pos, .. }
            | ParseError::DuplicateDefinition { pos, .. }
            | ParseError::RedefinitionOfStruct { pos, .. }
            | ParseError::AssignmentInCondition { pos }
            | ParseError::Other { pos, .. } => *pos,
        }
    }

    pub fn render(&self, source: &str) -> String {
        format!("{}\n{}", self, render_source_excerpt(source, self.pos()))
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken { found, expected, pos } => {
                write!(f, "{pos}: expected {expected}, found {found:?}")
            }
            ParseError::UnknownIdentifier { name, pos } => write!(f, "{pos}: unknown identifier '{name}'"),
            ParseError::UnknownType { name, pos } => write!(f, "{pos}: unknown type 'struct {name}'"),
            ParseError::DuplicateDefinition { name, pos } => write!(f, "{pos}: '{name}' is already defined"),
            ParseError::RedefinitionOfStruct { name, pos } => {
                write!(f, "{pos}: struct '{name}' is already defined")
            }
            ParseError::AssignmentInCondition { pos } => {
                write!(f, "{pos}: assignment not allowed directly in a condition; wrap it in parentheses")
            }
            ParseError::Other { message, pos } => write!(f, "{pos}: {message}"),
        }
    }
}

impl std::error::Error for ParseError {}
