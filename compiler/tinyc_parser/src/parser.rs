use std::collections::HashMap;

use tinyc_ast::{
    Block, FuncDecl, FuncOrigin, GlobalDecl, LocalInfo, Local, Param, StructDef, StructId, Ty,
};
use tinyc_lexer::{Lexer, Token, TokenKind};
use tinyc_utils::{IdxVec, SourcePos};

use crate::error::ParseError;

pub struct ParsedProgram {
    pub structs: IdxVec<StructId, StructDef>,
    pub funcs: IdxVec<tinyc_ast::FuncId, FuncDecl>,
    pub globals: IdxVec<tinyc_ast::GlobalId, GlobalDecl>,
}

pub struct Parser<'a> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'a str,

    pub(crate) structs: IdxVec<StructId, StructDef>,
    pub(crate) struct_names: HashMap<String, StructId>,

    pub(crate) funcs: IdxVec<tinyc_ast::FuncId, FuncDecl>,
    pub(crate) func_names: HashMap<String, tinyc_ast::FuncId>,

    pub(crate) globals: IdxVec<tinyc_ast::GlobalId, GlobalDecl>,
    pub(crate) global_names: HashMap<String, tinyc_ast::GlobalId>,

    /// Populated while parsing the body of one function.
    pub(crate) cur_locals: IdxVec<Local, LocalInfo>,
    pub(crate) cur_scopes: Vec<HashMap<String, Local>>,

    /// Body token ranges recorded during the signature pass, keyed by
    /// function id; resolved in the second pass.
    pending_bodies: Vec<(tinyc_ast::FuncId, usize)>,
}

impl<'a> Parser<'a> {
    fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
        Lexer::new(source).tokenize().map_err(|e| ParseError::Other { message: e.to_string(), pos: e.pos() })
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken { found: self.peek_kind().clone(), expected, pos: self.peek().pos })
        }
    }

    pub(crate) fn expect_identifier(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::UnexpectedToken { found: other, expected, pos: self.peek().pos }),
        }
    }

    pub(crate) fn ensure_struct_declared(&mut self, name: &str, pos: SourcePos) -> StructId {
        if let Some(&id) = self.struct_names.get(name) {
            return id;
        }
        let _ = pos;
        let id = self.structs.push(StructDef::forward_declared(name.to_string()));
        self.struct_names.insert(name.to_string(), id);
        id
    }

    pub(crate) fn looks_like_type_start(&self) -> bool {
        matches!(
            self.peek_kind(),
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
    }

    fn skip_balanced_braces(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut depth = 1u32;
        while depth > 0 {
            match self.peek_kind().clone() {
                TokenKind::LeftBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RightBrace => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::Eof => {
                    return Err(ParseError::UnexpectedToken {
                        found: TokenKind::Eof,
                        expected: "'}'",
                        pos: self.peek().pos,
                    })
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(())
    }

    /// Parses every `struct` definition and every function/global signature
    /// at the top level, without descending into function bodies (those are
    /// skipped by brace matching and revisited in [`Self::parse_bodies`]).
    /// This lets a function call any other function declared later in the
    /// same file.
    fn parse_signatures(&mut self) -> Result<(), ParseError> {
        loop {
            if self.check(&TokenKind::Eof) {
                break;
            }

            if self.check(&TokenKind::Struct) {
                self.parse_struct_item()?;
                continue;
            }

            let pos = self.peek().pos;
            let ret_ty = self.parse_type()?;
            let name = self.expect_identifier("a function or variable name")?;

            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let params = self.parse_param_list()?;
                self.expect(TokenKind::RightParen, "')'")?;

                if self.func_names.contains_key(&name) {
                    return Err(ParseError::DuplicateDefinition { name, pos });
                }
                let locals = params
                    .iter()
                    .map(|p| LocalInfo { name: p.name.clone(), ty: p.ty })
                    .collect::<IdxVec<Local, LocalInfo>>();
                let func_id = self.funcs.push(FuncDecl {
                    name: name.clone(),
                    ret_ty,
                    params,
                    body: None,
                    origin: FuncOrigin::Source,
                    locals,
                });
                self.func_names.insert(name, func_id);

                let body_start = self.pos;
                self.skip_balanced_braces()?;
                self.pending_bodies.push((func_id, body_start));
            } else {
                self.expect(TokenKind::Semicolon, "';'")?;
                if self.global_names.contains_key(&name) {
                    return Err(ParseError::DuplicateDefinition { name, pos });
                }
                let id = self.globals.push(GlobalDecl { name: name.clone(), ty: ret_ty, byte_offset: 0 });
                self.global_names.insert(name, id);
            }
        }
        Ok(())
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_identifier("a parameter name")?;
            params.push(Param { name, ty });
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(params)
    }

    fn parse_struct_item(&mut self) -> Result<(), ParseError> {
        self.advance(); // 'struct'
        let pos = self.peek().pos;
        let name = self.expect_identifier("a struct name")?;

        if self.check(&TokenKind::Semicolon) {
            self.advance();
            self.ensure_struct_declared(&name, pos);
            return Ok(());
        }

        let id = self.ensure_struct_declared(&name, pos);
        if self.structs[id].defined {
            return Err(ParseError::RedefinitionOfStruct { name, pos });
        }

        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let member_ty = self.parse_type()?;
            let member_name = self.expect_identifier("a member name")?;
            self.expect(TokenKind::Semicolon, "';'")?;
            members.push(tinyc_ast::StructMember { name: member_name, ty: member_ty, byte_offset: 0 });
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        self.expect(TokenKind::Semicolon, "';'")?;

        self.structs[id].members = members;
        let snapshot = self.structs_snapshot();
        let structs_view = tinyc_ast::layout::IdxSliceStructs::new(&snapshot);
        tinyc_ast::layout::layout_struct(&mut self.structs[id], &structs_view);
        Ok(())
    }

    /// `layout_struct` needs a read-only view of the struct table while it
    /// holds a mutable borrow of one entry; a cheap clone sidesteps the
    /// aliasing conflict since struct tables are small and layout only runs
    /// once per definition.
    fn structs_snapshot(&self) -> IdxVec<StructId, StructDef> {
        IdxVec::from_raw(self.structs.raw.clone())
    }

    fn parse_bodies(&mut self) -> Result<(), ParseError> {
        let pending = std::mem::take(&mut self.pending_bodies);
        for (func_id, body_start) in pending {
            self.pos = body_start;
            self.cur_locals = IdxVec::from_raw(self.funcs[func_id].locals.raw.clone());
            let mut top_scope = HashMap::new();
            for (local, info) in self.cur_locals.iter_enumerated() {
                top_scope.insert(info.name.clone(), local);
            }
            self.cur_scopes = vec![top_scope];

            let block = self.parse_block()?;
            self.funcs[func_id].body = Some(block);
            self.funcs[func_id].locals = std::mem::take(&mut self.cur_locals);
        }
        Ok(())
    }

    pub(crate) fn declare_local(&mut self, name: String, ty: Ty, pos: SourcePos) -> Result<Local, ParseError> {
        if self.cur_scopes.last().unwrap().contains_key(&name) {
            return Err(ParseError::DuplicateDefinition { name, pos });
        }
        let local = self.cur_locals.push(LocalInfo { name: name.clone(), ty });
        self.cur_scopes.last_mut().unwrap().insert(name, local);
        Ok(local)
    }

    pub(crate) fn resolve_local(&self, name: &str) -> Option<Local> {
        self.cur_scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    pub(crate) fn push_scope(&mut self) {
        self.cur_scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.cur_scopes.pop();
    }
}

/// Parses `source` into a [`ParsedProgram`]. `host_prototypes` are textual
/// function prototypes (e.g. `"void prints(const s8*)"`) registered as
/// host-implemented functions before the source is parsed, mirroring how
/// the reference VM loads its core library ahead of user code.
pub fn parse_program(
    source: &'_ str,
    host_prototypes: &[(&str, FuncOrigin)],
) -> Result<ParsedProgram, ParseError> {
    let mut parser = Parser {
        tokens: Vec::new(),
        pos: 0,
        source,
        structs: IdxVec::new(),
        struct_names: HashMap::new(),
        funcs: IdxVec::new(),
        func_names: HashMap::new(),
        globals: IdxVec::new(),
        global_names: HashMap::new(),
        cur_locals: IdxVec::new(),
        cur_scopes: Vec::new(),
        pending_bodies: Vec::new(),
    };

    for &(prototype, origin) in host_prototypes {
        parser.register_host_prototype(prototype, origin)?;
    }

    parser.tokens = Parser::lex(source)?;
    parser.pos = 0;
    parser.parse_signatures()?;
    parser.parse_bodies()?;

    Ok(ParsedProgram { structs: parser.structs, funcs: parser.funcs, globals: parser.globals })
}

impl<'a> Parser<'a> {
    fn register_host_prototype(&mut self, prototype: &str, origin: FuncOrigin) -> Result<(), ParseError> {
        let saved_tokens = std::mem::replace(&mut self.tokens, Parser::lex(prototype)?);
        let saved_pos = std::mem::replace(&mut self.pos, 0);

        let ret_ty = self.parse_type()?;
        let name = self.expect_identifier("a function name")?;
        self.expect(TokenKind::LeftParen, "'('")?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RightParen, "')'")?;

        if self.func_names.contains_key(&name) {
            return Err(ParseError::DuplicateDefinition { name, pos: SourcePos::new(1, 1) });
        }
        let func_id = self.funcs.push(FuncDecl {
            name: name.clone(),
            ret_ty,
            params,
            body: None,
            origin,
            locals: IdxVec::new(),
        });
        self.func_names.insert(name, func_id);

        self.tokens = saved_tokens;
        self.pos = saved_pos;
        Ok(())
    }
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(Block { stmts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyc_ast::BasicKind;

    #[test]
    fn parses_a_function_calling_a_later_declared_function() {
        let src = "s32 main() { return add(1, 2); } s32 add(s32 a, s32 b) { return a + b; }";
        let parsed = parse_program(src, &[]).expect("parses");
        assert_eq!(parsed.funcs.len(), 2);
        let main = parsed.funcs.iter().find(|f| f.name == "main").unwrap();
        assert!(main.body.is_some());
    }

    #[test]
    fn struct_usable_by_pointer_before_its_body() {
        let src = "struct Node; s32 len(struct Node* n) { return 0; } struct Node { s32 value; struct Node* next; };";
        let parsed = parse_program(src, &[]).expect("parses");
        assert_eq!(parsed.structs.len(), 1);
        assert!(parsed.structs.iter().next().unwrap().defined);
    }

    #[test]
    fn host_prototypes_are_registered_before_source_is_parsed() {
        let src = "void main() { prints(\"hi\"); }";
        let host_prototypes = [("void prints(const s8*)", tinyc_ast::FuncOrigin::CoreLib)];
        let parsed = parse_program(src, &host_prototypes).expect("parses");
        let prints = parsed.funcs.iter().find(|f| f.name == "prints").unwrap();
        assert!(prints.is_host());
        assert_eq!(prints.origin, tinyc_ast::FuncOrigin::CoreLib);
    }

    #[test]
    fn duplicate_function_name_is_rejected() {
        let src = "s32 f() { return 0; } s32 f() { return 1; }";
        assert!(matches!(parse_program(src, &[]), Err(ParseError::DuplicateDefinition { .. })));
    }

    #[test]
    fn redefining_a_struct_body_is_rejected() {
        let src = "struct P { s32 x; }; struct P { s32 y; }; s32 main() { return 0; }";
        assert!(matches!(parse_program(src, &[]), Err(ParseError::RedefinitionOfStruct { .. })));
    }

    #[test]
    fn assignment_directly_in_a_condition_is_rejected() {
        let src = "s32 main() { s32 a; s32 b; if (a = b) { return 1; } return 0; }";
        assert!(matches!(parse_program(src, &[]), Err(ParseError::AssignmentInCondition { .. })));
    }

    #[test]
    fn global_declaration_is_distinguished_from_a_function_by_the_trailing_token() {
        let src = "s32 counter; s32 main() { return counter; }";
        let parsed = parse_program(src, &[]).expect("parses");
        assert_eq!(parsed.globals.len(), 1);
        assert_eq!(parsed.globals.iter().next().unwrap().ty.kind, BasicKind::S32);
    }
}
