use std::collections::HashMap;

use tinyc_ast::layout::{self, IdxSliceStructs};
use tinyc_ast::{FuncDecl, FuncId, GlobalDecl, GlobalId, Local, LocalInfo, StructDef, StructId, Ty};
use tinyc_utils::IdxVec;

use crate::bytecode::BytecodeBuffer;
use crate::strings::StringTable;

/// Pending patch sites for one loop, resolved when the loop closes.
#[derive(Default)]
pub struct LoopContext {
    pub break_patches: Vec<usize>,
    pub continue_patches: Vec<usize>,
}

struct ScopeMark {
    /// Number of locals declared at the point this scope was entered;
    /// declarations in the scope are truncated back to this on pop.
    local_count: usize,
    /// Cell cursor at the point this scope was entered, so a sibling scope
    /// declared later reuses the same frame cells.
    locals_cells: u64,
}

/// Threads the struct/func/global tables, the current function's local
/// table and live scopes, and the in-progress bytecode buffer through
/// expression and statement compilation — one mutable context rather than
/// passing each table through every call, mirroring the teacher's
/// `FnCtx`-threading idiom.
pub struct CompileEnv<'a> {
    pub structs: &'a IdxVec<StructId, StructDef>,
    pub funcs: &'a IdxVec<FuncId, FuncDecl>,
    pub globals: &'a IdxVec<GlobalId, GlobalDecl>,
    pub strings: &'a StringTable,
    /// Maps a callee's parser-assigned [`FuncId`] to the table index it was
    /// given by the active-function worklist, so `CALL` immediates point at
    /// the compacted, `main`-at-0 table rather than the declaration-order id.
    pub active_index: &'a HashMap<FuncId, u32>,

    /// All locals declared so far in the current function, including
    /// parameters at the front; grows as variable declarations are compiled.
    pub locals: IdxVec<Local, LocalInfo>,
    /// Byte offset of each local from the start of the frame's local region.
    pub local_offsets: IdxVec<Local, u64>,

    pub buf: BytecodeBuffer,

    /// Running operand-stack cell count, for the max-stack-depth invariant.
    stack_cells: u64,
    max_stack_cells: u64,

    /// Cell cursor for local-variable allocation; scopes restore this on
    /// exit so sibling blocks reuse the same frame cells. The running peak,
    /// `max_locals_cells`, is the frame's reserved local-region size — the
    /// VM allocates it once per call and locals never move within it.
    locals_cells: u64,
    max_locals_cells: u64,

    /// Byte offset this function's bytecode will have in the final,
    /// concatenated program image; jump targets must be computed relative to
    /// that image, not to this function's own buffer.
    base_offset: u64,

    scopes: Vec<ScopeMark>,
    loops: Vec<LoopContext>,
}

impl<'a> CompileEnv<'a> {
    pub fn new(
        structs: &'a IdxVec<StructId, StructDef>,
        funcs: &'a IdxVec<FuncId, FuncDecl>,
        globals: &'a IdxVec<GlobalId, GlobalDecl>,
        strings: &'a StringTable,
        active_index: &'a HashMap<FuncId, u32>,
        params: IdxVec<Local, LocalInfo>,
    ) -> Self {
        let mut env = CompileEnv {
            structs,
            funcs,
            globals,
            strings,
            active_index,
            locals: IdxVec::new(),
            local_offsets: IdxVec::new(),
            buf: BytecodeBuffer::new(),
            stack_cells: 0,
            max_stack_cells: 0,
            locals_cells: 0,
            max_locals_cells: 0,
            base_offset: 0,
            scopes: vec![ScopeMark { local_count: 0, locals_cells: 0 }],
            loops: Vec::new(),
        };
        for info in params.into_iter() {
            env.declare_local(info.name, info.ty);
        }
        env
    }

    /// Sets this function's eventual offset in the assembled program image.
    /// Must be set before any jump target is computed (the assembler knows
    /// it only after every earlier function has been sized).
    pub fn set_base_offset(&mut self, base_offset: u64) {
        self.base_offset = base_offset;
    }

    /// The absolute program-image position a jump emitted right now would
    /// target, i.e. this function's base offset plus its buffer's current
    /// length.
    pub fn target(&self) -> i32 {
        (self.base_offset + self.buf.len() as u64) as i32
    }

    fn structs_view(&self) -> IdxSliceStructs<'_> {
        IdxSliceStructs::new(self.structs)
    }

    pub fn layout_of(&self, ty: Ty) -> tinyc_abi::TyAndLayout<Ty> {
        layout::compute_layout(ty, &self.structs_view())
    }

    pub fn data_cell_size(&self, ty: Ty) -> u32 {
        layout::data_cell_size(ty, &self.structs_view())
    }

    pub fn pointed_type_byte_size(&self, ptr_ty: Ty) -> u64 {
        layout::pointed_type_byte_size(ptr_ty, &self.structs_view())
    }

    /// Declares a new local at the current frame cell cursor and returns its
    /// id. Locals occupy whole cells, like the VM's ADDRESS opcode expects
    /// (a byte offset added to the cell-granular frame base), even when
    /// their own type is smaller than one cell.
    pub fn declare_local(&mut self, name: String, ty: Ty) -> Local {
        let cell_offset = self.locals_cells;
        self.locals_cells += self.data_cell_size(ty) as u64;
        self.max_locals_cells = self.max_locals_cells.max(self.locals_cells);
        let id = self.locals.push(LocalInfo { name, ty });
        let pushed = self.local_offsets.push(cell_offset * tinyc_abi::DATA_CELL_BYTES);
        debug_assert_eq!(id, pushed);
        id
    }

    pub fn local_offset(&self, local: Local) -> u64 {
        self.local_offsets[local]
    }

    /// Enters a new lexical scope; locals declared in it are discarded (for
    /// name-resolution purposes) when the scope is popped.
    pub fn push_scope(&mut self) {
        self.scopes.push(ScopeMark { local_count: self.locals.len(), locals_cells: self.locals_cells });
    }

    pub fn pop_scope(&mut self) {
        let mark = self.scopes.pop().expect("scope underflow");
        self.locals.truncate(mark.local_count);
        self.local_offsets.truncate(mark.local_count);
        self.locals_cells = mark.locals_cells;
    }

    pub fn push_loop(&mut self) {
        self.loops.push(LoopContext::default());
    }

    pub fn current_loop_mut(&mut self) -> Option<&mut LoopContext> {
        self.loops.last_mut()
    }

    pub fn pop_loop(&mut self) -> LoopContext {
        self.loops.pop().expect("loop-context underflow")
    }

    /// Call after pushing `cells` data cells onto the operand stack.
    pub fn note_push(&mut self, cells: u64) {
        self.stack_cells += cells;
        self.max_stack_cells = self.max_stack_cells.max(self.stack_cells);
    }

    /// Call after popping `cells` data cells off the operand stack.
    pub fn note_pop(&mut self, cells: u64) {
        self.stack_cells = self.stack_cells.saturating_sub(cells);
    }

    pub fn stack_cells(&self) -> u64 {
        self.stack_cells
    }

    pub fn max_stack_cells(&self) -> u64 {
        self.max_stack_cells
    }

    /// Peak cell count the frame's local region ever reaches across every
    /// scope, including parameters. This is the function's declared frame
    /// size (`stack_cells` in the function table): the VM reserves exactly
    /// this many cells once per call and never resizes it.
    pub fn max_locals_cells(&self) -> u64 {
        self.max_locals_cells
    }
}
