/// A 1-based line/column position in a source file, shared by the lexer,
/// parser, and compiler so diagnostics from every stage render the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: u32,
    pub col: u32,
}

impl SourcePos {
    pub fn new(line: u32, col: u32) -> Self {
        SourcePos { line, col }
    }
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Renders the offending source line followed by a caret pointing at `pos`'s
/// column, e.g.:
/// ```text
///     s32 x = 2 +;
///               ^
/// ```
pub fn render_source_excerpt(source: &str, pos: SourcePos) -> String {
    let line_text = source.lines().nth(pos.line.saturating_sub(1) as usize).unwrap_or("");
    let col = pos.col.saturating_sub(1) as usize;
    let caret_pad = " ".repeat(col.min(line_text.len()));
    format!("{line_text}\n{caret_pad}^")
}
