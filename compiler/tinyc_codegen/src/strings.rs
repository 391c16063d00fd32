use std::collections::HashMap;

use tinyc_ast::{Block, Expr, FuncDecl, FuncId, Literal, Stmt};
use tinyc_utils::IdxVec;

/// Interned string literals, laid out null-terminated back to back at the
/// start of the program's global-data image so `AddressGlobal` offsets into
/// it are stable once computed.
#[derive(Default)]
pub struct StringTable {
    offsets: HashMap<String, u32>,
    pub bytes: Vec<u8>,
}

impl StringTable {
    pub fn offset_of(&self, s: &str) -> u32 {
        self.offsets[s]
    }

    fn intern(&mut self, s: &str) {
        if self.offsets.contains_key(s) {
            return;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(s.to_string(), offset);
    }
}

/// Walks every source function body once, ahead of codegen, so string
/// literal offsets are known before any function is compiled.
pub fn collect_strings(funcs: &IdxVec<FuncId, FuncDecl>) -> StringTable {
    let mut table = StringTable::default();
    for func in funcs.iter() {
        if let Some(body) = &func.body {
            collect_block(&mut table, body);
        }
    }
    table
}

fn collect_block(table: &mut StringTable, block: &Block) {
    for stmt in &block.stmts {
        collect_stmt(table, stmt);
    }
}

fn collect_stmt(table: &mut StringTable, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(e) => collect_expr(table, e),
        Stmt::VarDecl(d) => {
            if let Some(e) = &d.init {
                collect_expr(table, e);
            }
        }
        Stmt::Compound(b) => collect_block(table, b),
        Stmt::If { cond, then_branch, else_branch } => {
            collect_expr(table, cond);
            collect_stmt(table, then_branch);
            if let Some(e) = else_branch {
                collect_stmt(table, e);
            }
        }
        Stmt::While { cond, body } => {
            collect_expr(table, cond);
            collect_stmt(table, body);
        }
        Stmt::For { init, cond, step, body } => {
            if let Some(s) = init {
                collect_stmt(table, s);
            }
            if let Some(e) = cond {
                collect_expr(table, e);
            }
            if let Some(e) = step {
                collect_expr(table, e);
            }
            collect_stmt(table, body);
        }
        Stmt::Return(e) => {
            if let Some(e) = e {
                collect_expr(table, e);
            }
        }
        Stmt::Break | Stmt::Continue => {}
    }
}

fn collect_expr(table: &mut StringTable, expr: &Expr) {
    match expr {
        Expr::Literal(Literal::Str(s)) => table.intern(s),
        Expr::Literal(_) => {}
        Expr::Local(..) | Expr::Global(..) => {}
        Expr::Unary(_, e) => collect_expr(table, e),
        Expr::Binary(_, l, r) | Expr::Assign(_, l, r) => {
            collect_expr(table, l);
            collect_expr(table, r);
        }
        Expr::Call(_, _, args) => {
            for a in args {
                collect_expr(table, a);
            }
        }
        Expr::Member(b, _) | Expr::Arrow(b, _) => collect_expr(table, b),
        Expr::Index(b, i) => {
            collect_expr(table, b);
            collect_expr(table, i);
        }
        Expr::Cast(_, e) => collect_expr(table, e),
        Expr::SizeOf(_) => {}
        Expr::Paren(e) => collect_expr(table, e),
    }
}
