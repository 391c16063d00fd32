use std::collections::{HashMap, HashSet, VecDeque};

use tinyc_ast::{Block, Expr, FuncDecl, FuncId, GlobalDecl, GlobalId, Local, LocalInfo, Stmt, StructDef, StructId};
use tinyc_utils::IdxVec;

use crate::env::CompileEnv;
use crate::error::CodegenError;
use crate::stmt::compile_block;
use crate::strings::{collect_strings, StringTable};

/// One function table entry, as assembled for serialization.
#[derive(Debug, Clone)]
pub enum FunctionEntry {
    Source { entry_offset: u32, stack_cells: u32, param_cells: u32, return_cells: u32 },
    Host { prototype: String, prototype_hash: u32, param_cells: u32, return_cells: u32 },
}

impl FunctionEntry {
    pub fn param_cells(&self) -> u32 {
        match self {
            FunctionEntry::Source { param_cells, .. } | FunctionEntry::Host { param_cells, .. } => *param_cells,
        }
    }

    pub fn return_cells(&self) -> u32 {
        match self {
            FunctionEntry::Source { return_cells, .. } | FunctionEntry::Host { return_cells, .. } => *return_cells,
        }
    }
}

/// A fully assembled program, ready for the VM to load.
#[derive(Debug)]
pub struct Program {
    /// Strings region followed by every reachable function's bytecode,
    /// concatenated; entry offsets in [`FunctionEntry::Source`] index here.
    pub bytecode: Vec<u8>,
    pub strings_byte_size: u32,
    /// Byte size of the whole global-data image (strings plus user globals),
    /// copied into the low range of the operand stack at load time.
    pub global_data_size: u32,
    pub global_byte_offsets: IdxVec<GlobalId, u64>,
    /// Indexed by table position, not the parser's original [`FuncId`]:
    /// only functions reachable from `main` are compiled, in first-seen
    /// worklist order, so `main` is always entry 0 and `CALL` immediates
    /// are the *table* index assigned by that order (see
    /// [`active_function_order`]).
    pub functions: IdxVec<FuncId, FunctionEntry>,
}

const DJB2_SEED: u32 = 5381;

/// Hashes a function prototype string for host-function matching. The VM's
/// loader must compute this same hash over its own registered prototypes
/// to link against the function table's `prototype_hash` entries.
pub fn djb2(s: &str) -> u32 {
    let mut h: u32 = DJB2_SEED;
    for b in s.bytes() {
        h = h.wrapping_mul(33).wrapping_add(b as u32);
    }
    h
}

/// Lays out the global-data image: interned strings first, padded up to a
/// whole data cell, then every user-declared global in declaration order.
/// Globals are cell-aligned like locals, not byte-packed by natural
/// alignment: ADDRESS_GLOBAL adds a byte offset to the cell-granular start
/// of the operand stack, and the VM reserves the image in whole cells.
fn layout_globals(
    strings: &StringTable,
    globals: &IdxVec<GlobalId, GlobalDecl>,
    structs: &IdxVec<StructId, StructDef>,
) -> (IdxVec<GlobalId, u64>, u64) {
    let structs_view = tinyc_ast::layout::IdxSliceStructs::new(structs);
    let mut cells = tinyc_abi::data_cell_count(strings.bytes.len() as u64);
    let mut offsets = IdxVec::new();
    for global in globals.iter() {
        offsets.push(cells * tinyc_abi::DATA_CELL_BYTES);
        cells += tinyc_ast::layout::data_cell_size(global.ty, &structs_view) as u64;
    }
    (offsets, cells * tinyc_abi::DATA_CELL_BYTES)
}

/// Walks every `Expr::Call` in `stmt`, handing each callee to `on_call`.
fn walk_stmt_calls(stmt: &Stmt, on_call: &mut impl FnMut(FuncId)) {
    match stmt {
        Stmt::Expr(e) => walk_expr_calls(e, on_call),
        Stmt::VarDecl(decl) => {
            if let Some(init) = &decl.init {
                walk_expr_calls(init, on_call);
            }
        }
        Stmt::Compound(block) => walk_block_calls(block, on_call),
        Stmt::If { cond, then_branch, else_branch } => {
            walk_expr_calls(cond, on_call);
            walk_stmt_calls(then_branch, on_call);
            if let Some(e) = else_branch {
                walk_stmt_calls(e, on_call);
            }
        }
        Stmt::While { cond, body } => {
            walk_expr_calls(cond, on_call);
            walk_stmt_calls(body, on_call);
        }
        Stmt::For { init, cond, step, body } => {
            if let Some(init) = init {
                walk_stmt_calls(init, on_call);
            }
            if let Some(cond) = cond {
                walk_expr_calls(cond, on_call);
            }
            if let Some(step) = step {
                walk_expr_calls(step, on_call);
            }
            walk_stmt_calls(body, on_call);
        }
        Stmt::Return(Some(e)) => walk_expr_calls(e, on_call),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
    }
}

fn walk_block_calls(block: &Block, on_call: &mut impl FnMut(FuncId)) {
    for stmt in &block.stmts {
        walk_stmt_calls(stmt, on_call);
    }
}

fn walk_expr_calls(expr: &Expr, on_call: &mut impl FnMut(FuncId)) {
    match expr {
        Expr::Literal(_) | Expr::Local(..) | Expr::Global(..) | Expr::SizeOf(_) => {}
        Expr::Unary(_, operand) | Expr::Cast(_, operand) | Expr::Paren(operand) => walk_expr_calls(operand, on_call),
        Expr::Binary(_, lhs, rhs) | Expr::Assign(_, lhs, rhs) | Expr::Index(lhs, rhs) => {
            walk_expr_calls(lhs, on_call);
            walk_expr_calls(rhs, on_call);
        }
        Expr::Call(func_id, _, args) => {
            on_call(*func_id);
            for arg in args {
                walk_expr_calls(arg, on_call);
            }
        }
        Expr::Member(base, _) | Expr::Arrow(base, _) => walk_expr_calls(base, on_call),
    }
}

/// Computes the active-function worklist: the set of functions reachable
/// from `main`, in first-seen order, so `main` lands at table index 0 and
/// every other index is assigned the order its first call site appears in.
/// Host functions are registered the same way (their indices must also be
/// stable CALL targets) even though they have no body of their own to walk.
fn active_function_order(funcs: &IdxVec<FuncId, FuncDecl>, entry_func: FuncId) -> Vec<FuncId> {
    let mut order = Vec::new();
    let mut seen: HashSet<FuncId> = HashSet::new();
    let mut worklist: VecDeque<FuncId> = VecDeque::new();

    seen.insert(entry_func);
    worklist.push_back(entry_func);

    while let Some(id) = worklist.pop_front() {
        order.push(id);
        if let Some(body) = &funcs[id].body {
            walk_block_calls(body, &mut |callee| {
                if seen.insert(callee) {
                    worklist.push_back(callee);
                }
            });
        }
    }
    order
}

/// Compiles every function reachable from `main` and assembles the result
/// into a serializable [`Program`]. Table indices are assigned in
/// first-seen worklist order (see [`active_function_order`]), so `main` is
/// always index 0 and `CALL` immediates are translated from the parser's
/// [`FuncId`] through that mapping rather than emitted directly.
pub fn assemble_program(
    structs: &IdxVec<StructId, StructDef>,
    funcs: &IdxVec<FuncId, FuncDecl>,
    globals: &IdxVec<GlobalId, GlobalDecl>,
) -> Result<Program, CodegenError> {
    let entry_func = funcs
        .iter_enumerated()
        .find(|(_, f)| f.name == "main")
        .map(|(id, _)| id)
        .ok_or(CodegenError::MainMissing)?;
    {
        let main = &funcs[entry_func];
        if !main.ret_ty.is_void() || !main.params.is_empty() {
            return Err(CodegenError::MainWrongSignature);
        }
    }

    let strings = collect_strings(funcs);
    let (global_byte_offsets, global_data_size) = layout_globals(&strings, globals, structs);

    // `compile_expr`'s `Expr::Global` arm reads `byte_offset` straight off
    // the `GlobalDecl`; the parser only ever writes 0 there, so patch in the
    // offsets just computed before any function is compiled against them.
    let mut globals: IdxVec<GlobalId, GlobalDecl> = IdxVec::from_raw(globals.raw.clone());
    for (id, global) in globals.iter_enumerated_mut() {
        global.byte_offset = global_byte_offsets[id];
    }
    let globals = &globals;

    let active_order = active_function_order(funcs, entry_func);
    let active_index: HashMap<FuncId, u32> =
        active_order.iter().enumerate().map(|(i, id)| (*id, i as u32)).collect();

    let mut bytecode = strings.bytes.clone();
    let mut functions: IdxVec<FuncId, FunctionEntry> = IdxVec::with_capacity(active_order.len());
    let mut seen_host_hashes: HashSet<u32> = HashSet::new();

    for id in &active_order {
        let decl = &funcs[*id];
        let param_cells: u32 = decl
            .params
            .iter()
            .map(|p| tinyc_ast::layout::data_cell_size(p.ty, &tinyc_ast::layout::IdxSliceStructs::new(structs)))
            .sum();
        let return_cells = tinyc_ast::layout::data_cell_size(decl.ret_ty, &tinyc_ast::layout::IdxSliceStructs::new(structs));

        if decl.is_host() {
            let prototype = decl.prototype_text();
            let hash = djb2(&prototype);
            if !seen_host_hashes.insert(hash) {
                return Err(CodegenError::DuplicateHostPrototype { prototype });
            }
            functions.push(FunctionEntry::Host { prototype, prototype_hash: hash, param_cells, return_cells });
            continue;
        }

        let entry_offset = bytecode.len() as u32;
        let params: IdxVec<Local, LocalInfo> = IdxVec::from_raw(decl.locals.raw[..decl.params.len()].to_vec());
        let mut env = CompileEnv::new(structs, funcs, globals, &strings, &active_index, params);
        env.set_base_offset(entry_offset as u64);

        let body = decl.body.as_ref().expect("source function has a body");
        let reach = compile_block(&mut env, body, false, decl.ret_ty)?;
        if decl.ret_ty.is_void() {
            if reach != crate::stmt::Reachability::Return {
                env.buf.emit_op(crate::bytecode::Opcode::Return);
            }
        } else if reach != crate::stmt::Reachability::Return {
            return Err(CodegenError::MissingReturn { func_name: decl.name.clone() });
        }

        // `stack_cells` is the frame's reserved local-region size, not the
        // deepest operand-stack excursion: the VM pre-allocates exactly this
        // many cells at call time and temporaries grow the stack on top of
        // it dynamically as the body's PUSH/POP opcodes execute.
        let stack_cells = env.max_locals_cells() as u32;
        bytecode.extend_from_slice(env.buf.bytes());
        functions.push(FunctionEntry::Source { entry_offset, stack_cells, param_cells, return_cells });
    }

    let strings_byte_size = strings.bytes.len() as u32;
    Ok(Program {
        bytecode,
        strings_byte_size,
        global_data_size: global_data_size as u32,
        global_byte_offsets,
        functions,
    })
}

/// Byte-for-byte serialization: fixed header, then the bytecode blob
/// (strings region included), then the packed function table.
pub fn serialize(program: &Program) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(program.functions.len() as u32).to_le_bytes());
    out.extend_from_slice(&(program.bytecode.len() as u32).to_le_bytes());
    out.extend_from_slice(&program.global_data_size.to_le_bytes());
    out.extend_from_slice(&program.strings_byte_size.to_le_bytes());

    out.extend_from_slice(&program.bytecode);

    for entry in program.functions.iter() {
        match entry {
            FunctionEntry::Source { entry_offset, stack_cells, param_cells, return_cells } => {
                out.push(0);
                out.extend_from_slice(&param_cells.to_le_bytes());
                out.extend_from_slice(&return_cells.to_le_bytes());
                out.extend_from_slice(&entry_offset.to_le_bytes());
                out.extend_from_slice(&stack_cells.to_le_bytes());
            }
            FunctionEntry::Host { prototype_hash, param_cells, return_cells, .. } => {
                out.push(1);
                out.extend_from_slice(&param_cells.to_le_bytes());
                out.extend_from_slice(&return_cells.to_le_bytes());
                out.extend_from_slice(&prototype_hash.to_le_bytes());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_matches_reference_vector() {
        // djb2("a") = 5381*33 + 'a' = 177573 + 97 = 177670
        assert_eq!(djb2("a"), 177_670);
    }
}
