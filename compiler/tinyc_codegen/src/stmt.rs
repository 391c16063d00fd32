use tinyc_ast::{Block, Stmt, Ty};

use crate::bytecode::Opcode;
use crate::env::CompileEnv;
use crate::error::CodegenError;
use crate::expr::{compile_expr, compile_expr_converted, compile_expr_value, emit_implicit_conversion, emit_store};

/// How a compiled statement can be reached from the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reachability {
    None,
    BreakOrContinue,
    Return,
}

pub fn compile_block(env: &mut CompileEnv<'_>, block: &Block, new_scope: bool, ret_ty: Ty) -> Result<Reachability, CodegenError> {
    if new_scope {
        env.push_scope();
    }
    let mut reach = Reachability::None;
    for (i, stmt) in block.stmts.iter().enumerate() {
        if reach != Reachability::None && i > 0 {
            // Unreachable code: still type-checked (dry-run) so later
            // errors are still surfaced, but its bytecode is discarded.
            let was_dry = env.buf.is_dry_run();
            env.buf.set_dry_run(true);
            let _ = compile_stmt(env, stmt, ret_ty);
            env.buf.set_dry_run(was_dry);
            continue;
        }
        let this_reach = compile_stmt(env, stmt, ret_ty)?;
        reach = reach.max(this_reach);
    }
    if new_scope {
        env.pop_scope();
    }
    Ok(reach)
}

fn compile_stmt(env: &mut CompileEnv<'_>, stmt: &Stmt, ret_ty: Ty) -> Result<Reachability, CodegenError> {
    match stmt {
        Stmt::Expr(expr) => {
            let (ty, is_lvalue) = compile_expr(env, expr)?;
            // Expression statements discard their result; an lvalue is
            // always a single address cell, an rvalue may span several
            // cells (a struct value).
            let cells = if is_lvalue { 1 } else { env.data_cell_size(ty) as u64 };
            if cells > 0 {
                env.buf.emit_op(Opcode::PopMany);
                env.buf.emit_u32(cells as u32);
                env.note_pop(cells);
            }
            Ok(Reachability::None)
        }
        Stmt::VarDecl(decl) => {
            let local = env.declare_local(decl.name.clone(), decl.ty);
            if let Some(init) = &decl.init {
                compile_expr_converted(env, init, decl.ty)?;
                env.buf.emit_op(Opcode::Address);
                env.buf.emit_u32(env.local_offset(local) as u32);
                env.note_push(1);
                emit_store(env, decl.ty);
                let cells = env.data_cell_size(decl.ty) as u64;
                env.buf.emit_op(Opcode::PopMany);
                env.buf.emit_u32(cells as u32);
                env.note_pop(cells);
            } else if decl.ty.is_top_const() {
                return Err(CodegenError::ConstLocalWithoutInitializer { name: decl.name.clone() });
            }
            Ok(Reachability::None)
        }
        Stmt::Compound(block) => compile_block(env, block, true, ret_ty),
        Stmt::If { cond, then_branch, else_branch } => compile_if(env, cond, then_branch, else_branch, ret_ty),
        Stmt::While { cond, body } => compile_while(env, cond, body, ret_ty),
        Stmt::For { init, cond, step, body } => compile_for(env, init.as_deref(), cond, step, body, ret_ty),
        Stmt::Return(value) => {
            match value {
                Some(expr) => {
                    compile_expr_converted(env, expr, ret_ty)?;
                }
                None => {
                    if !ret_ty.is_void() {
                        return Err(CodegenError::IncompatibleConversion { from: Ty::void(), to: ret_ty });
                    }
                }
            }
            env.buf.emit_op(Opcode::Return);
            Ok(Reachability::Return)
        }
        Stmt::Break => {
            env.buf.emit_op(Opcode::Jump);
            let at = env.buf.reserve_s32();
            env.current_loop_mut().ok_or(CodegenError::BreakOutsideLoop)?.break_patches.push(at);
            Ok(Reachability::BreakOrContinue)
        }
        Stmt::Continue => {
            env.buf.emit_op(Opcode::Jump);
            let at = env.buf.reserve_s32();
            env.current_loop_mut().ok_or(CodegenError::ContinueOutsideLoop)?.continue_patches.push(at);
            Ok(Reachability::BreakOrContinue)
        }
    }
}

fn compile_if(
    env: &mut CompileEnv<'_>,
    cond: &tinyc_ast::Expr,
    then_branch: &Stmt,
    else_branch: &Option<Box<Stmt>>,
    ret_ty: Ty,
) -> Result<Reachability, CodegenError> {
    compile_cond_as_s32(env, cond)?;
    env.buf.emit_op(Opcode::JumpFalse);
    let else_at = env.buf.reserve_s32();
    env.note_pop(1);

    let then_reach = compile_stmt(env, then_branch, ret_ty)?;

    if let Some(else_branch) = else_branch {
        env.buf.emit_op(Opcode::Jump);
        let end_at = env.buf.reserve_s32();
        env.buf.patch_s32(else_at, env.target());
        let else_reach = compile_stmt(env, else_branch, ret_ty)?;
        env.buf.patch_s32(end_at, env.target());
        Ok(then_reach.min(else_reach))
    } else {
        env.buf.patch_s32(else_at, env.target());
        Ok(Reachability::None)
    }
}

fn compile_cond_as_s32(env: &mut CompileEnv<'_>, cond: &tinyc_ast::Expr) -> Result<(), CodegenError> {
    let ty = compile_expr_value(env, cond)?;
    emit_implicit_conversion(env, ty, Ty::s32())
}

fn compile_while(env: &mut CompileEnv<'_>, cond: &tinyc_ast::Expr, body: &Stmt, ret_ty: Ty) -> Result<Reachability, CodegenError> {
    let test_at = env.target();
    compile_cond_as_s32(env, cond)?;
    env.buf.emit_op(Opcode::JumpFalse);
    let end_at = env.buf.reserve_s32();
    env.note_pop(1);

    env.push_loop();
    let _ = compile_stmt(env, body, ret_ty)?;
    let loop_ctx = env.pop_loop();
    for p in loop_ctx.continue_patches {
        env.buf.patch_s32(p, test_at);
    }

    env.buf.emit_op(Opcode::Jump);
    let back_at = env.buf.reserve_s32();
    env.buf.patch_s32(back_at, test_at);

    let end_target = env.target();
    env.buf.patch_s32(end_at, end_target);
    for p in loop_ctx.break_patches {
        env.buf.patch_s32(p, end_target);
    }
    Ok(Reachability::None)
}

fn compile_for(
    env: &mut CompileEnv<'_>,
    init: Option<&Stmt>,
    cond: &Option<tinyc_ast::Expr>,
    step: &Option<tinyc_ast::Expr>,
    body: &Stmt,
    ret_ty: Ty,
) -> Result<Reachability, CodegenError> {
    env.push_scope();
    if let Some(init) = init {
        compile_stmt(env, init, ret_ty)?;
    }

    let test_at = env.target();
    let end_at = if let Some(cond) = cond {
        compile_cond_as_s32(env, cond)?;
        env.buf.emit_op(Opcode::JumpFalse);
        let at = env.buf.reserve_s32();
        env.note_pop(1);
        Some(at)
    } else {
        None
    };

    env.push_loop();
    let _ = compile_stmt(env, body, ret_ty)?;
    let loop_ctx = env.pop_loop();

    let step_at = env.target();
    for p in loop_ctx.continue_patches {
        env.buf.patch_s32(p, step_at);
    }
    if let Some(step) = step {
        let ty = compile_expr_value(env, step)?;
        let cells = env.data_cell_size(ty) as u64;
        env.buf.emit_op(Opcode::PopMany);
        env.buf.emit_u32(cells as u32);
        env.note_pop(cells);
    }

    env.buf.emit_op(Opcode::Jump);
    let back_at = env.buf.reserve_s32();
    env.buf.patch_s32(back_at, test_at);

    let end_target = env.target();
    if let Some(end_at) = end_at {
        env.buf.patch_s32(end_at, end_target);
    }
    for p in loop_ctx.break_patches {
        env.buf.patch_s32(p, end_target);
    }

    env.pop_scope();
    Ok(Reachability::None)
}
