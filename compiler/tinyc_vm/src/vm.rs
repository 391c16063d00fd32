use std::any::Any;

use tinyc_codegen::Opcode;

use crate::cell::{DataCell, RawPtr};
use crate::error::VmError;
use crate::frame::StackFrame;
use crate::host::HostRegistry;

/// Upper bound on concurrently live operand-stack cells. The backing `Vec`
/// is allocated to this capacity up front and never allowed to grow past
/// it, so raw pointers taken into its interior (by ADDRESS/ADDRESS_GLOBAL)
/// stay valid for the VM's whole lifetime.
const STACK_CELLS: usize = 1024 * 1024;
/// Upper bound on concurrently open call frames.
const FRAME_STACK_SIZE: usize = 512;

/// A function table entry once a program has been loaded: host-impl
/// entries carry their resolved callback rather than a bare prototype hash.
enum LoadedFunction {
    Source { entry_offset: usize, stack_cells: usize, param_cells: usize, return_cells: usize },
    Host { callback: crate::host::HostCallback, param_cells: usize, return_cells: usize },
}

/// A program [`Vm::load`] has linked against a [`HostRegistry`], ready to
/// run. Holds its own copy of the bytecode blob (strings region included)
/// rather than borrowing the serialized buffer, so the caller is free to
/// drop or reuse it.
pub struct LoadedProgram {
    bytecode: Vec<u8>,
    global_data_size: usize,
    /// Byte length of the interned-strings prefix of `bytecode`. No
    /// function's `entry_offset` ever points inside it (every function is
    /// compiled after it), but its bytes are the initial content of the
    /// operand stack's global-data region, copied there once per run.
    strings_byte_size: usize,
    functions: Vec<LoadedFunction>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, at: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], VmError> {
        let end = self.at.checked_add(n).ok_or_else(|| VmError::MalformedProgram { reason: "header overflow".into() })?;
        let slice = self
            .bytes
            .get(self.at..end)
            .ok_or_else(|| VmError::MalformedProgram { reason: "buffer truncated".into() })?;
        self.at = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, VmError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, VmError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}

impl LoadedProgram {
    /// Parses the byte format `tinyc_codegen::serialize` produces and links
    /// every host-impl function-table entry against `hosts`.
    pub fn load(bytes: &[u8], hosts: &HostRegistry) -> Result<LoadedProgram, VmError> {
        let mut cursor = Cursor::new(bytes);
        let function_count = cursor.u32()? as usize;
        let bytecode_len = cursor.u32()? as usize;
        let global_data_size = cursor.u32()? as usize;
        let strings_byte_size = cursor.u32()? as usize;

        let bytecode = cursor.take(bytecode_len)?.to_vec();

        let mut functions = Vec::with_capacity(function_count);
        for _ in 0..function_count {
            let tag = cursor.u8()?;
            let param_cells = cursor.u32()? as usize;
            let return_cells = cursor.u32()? as usize;
            let function = match tag {
                0 => {
                    let entry_offset = cursor.u32()? as usize;
                    let stack_cells = cursor.u32()? as usize;
                    LoadedFunction::Source { entry_offset, stack_cells, param_cells, return_cells }
                }
                1 => {
                    let prototype_hash = cursor.u32()?;
                    let callback = hosts.resolve(prototype_hash)?;
                    LoadedFunction::Host { callback, param_cells, return_cells }
                }
                other => return Err(VmError::MalformedProgram { reason: format!("unknown function tag {other}") }),
            };
            functions.push(function);
        }

        if functions.is_empty() {
            return Err(VmError::MalformedProgram { reason: "program has no functions".into() });
        }

        Ok(LoadedProgram { bytecode, global_data_size, strings_byte_size, functions })
    }
}

fn read_u32(code: &[u8], ip: &mut usize) -> u32 {
    let v = u32::from_le_bytes(code[*ip..*ip + 4].try_into().unwrap());
    *ip += 4;
    v
}

fn read_s32(code: &[u8], ip: &mut usize) -> i32 {
    read_u32(code, ip) as i32
}

fn read_f32(code: &[u8], ip: &mut usize) -> f32 {
    let v = f32::from_le_bytes(code[*ip..*ip + 4].try_into().unwrap());
    *ip += 4;
    v
}

fn read_f64(code: &[u8], ip: &mut usize) -> f64 {
    let v = f64::from_le_bytes(code[*ip..*ip + 8].try_into().unwrap());
    *ip += 8;
    v
}

/// A single-threaded, cooperative stack machine. Stack overflow, an
/// assertion on an invalid address, or division by zero all end the run
/// with an error rather than the program's own fault-handling (there is
/// none) — callers that want a graceful CLI message catch [`VmError`]
/// at the boundary.
pub struct Vm {
    stack: Vec<DataCell>,
    frames: Vec<StackFrame>,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm { stack: Vec::with_capacity(STACK_CELLS), frames: Vec::with_capacity(FRAME_STACK_SIZE) }
    }

    fn push(&mut self, cell: DataCell) -> Result<(), VmError> {
        if self.stack.len() >= STACK_CELLS {
            return Err(VmError::OperandStackOverflow);
        }
        self.stack.push(cell);
        Ok(())
    }

    fn push_many(&mut self, n: usize) -> Result<(), VmError> {
        let new_len = self.stack.len() + n;
        if new_len > STACK_CELLS {
            return Err(VmError::OperandStackOverflow);
        }
        self.stack.resize(new_len, DataCell::zeroed());
        Ok(())
    }

    fn pop(&mut self) -> DataCell {
        self.stack.pop().expect("operand stack underflow")
    }

    fn pop_many(&mut self, n: usize) {
        let new_len = self.stack.len() - n;
        self.stack.truncate(new_len);
    }

    fn top(&self) -> DataCell {
        *self.stack.last().expect("operand stack underflow")
    }

    fn top_mut(&mut self) -> &mut DataCell {
        self.stack.last_mut().expect("operand stack underflow")
    }

    fn push_stack_frame(&mut self, entry_offset: usize, size: usize, param_cells: usize) -> Result<(), VmError> {
        if self.frames.len() >= FRAME_STACK_SIZE {
            return Err(VmError::CallFrameStackOverflow);
        }
        let bp = self.stack.len() - param_cells;
        self.push_many(size - param_cells)?;
        self.frames.push(StackFrame { bp, size, ip: entry_offset });
        Ok(())
    }

    /// Copies the program's global-data image onto the bottom of the
    /// operand stack and runs the entry function (table index 0, which the
    /// assembler's active-function worklist guarantees is `main`) to
    /// completion. `main` always returns `void`, so a normal return yields
    /// exit code 0; a program that wants a different status calls the
    /// `exit` host function, which is free to terminate the host process
    /// directly.
    pub fn run(&mut self, program: &LoadedProgram, host_data: &mut dyn Any) -> Result<i32, VmError> {
        self.stack.clear();
        self.frames.clear();
        self.push_many(program.global_data_size / tinyc_abi::DATA_CELL_BYTES as usize)?;
        // The leading `strings_byte_size` bytes of the bytecode blob are the
        // interned string literals' content; seed the global region with
        // them so `AddressGlobal`-addressed string pointers read real bytes.
        // Everything past them (padding plus user globals) stays zeroed.
        if program.strings_byte_size > 0 {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    program.bytecode.as_ptr(),
                    self.stack.as_mut_ptr() as *mut u8,
                    program.strings_byte_size,
                );
            }
        }

        let entry = match &program.functions[0] {
            LoadedFunction::Source { entry_offset, stack_cells, param_cells, .. } => (*entry_offset, *stack_cells, *param_cells),
            LoadedFunction::Host { .. } => {
                return Err(VmError::MalformedProgram { reason: "entry function cannot be a host function".into() })
            }
        };
        self.push_stack_frame(entry.0, entry.1, entry.2)?;

        let code = &program.bytecode;
        let mut ip = entry.0;
        loop {
            let opcode = Opcode::from_u8(code[ip]).ok_or_else(|| VmError::MalformedProgram { reason: format!("bad opcode byte at {ip}") })?;
            ip += 1;
            match opcode {
                Opcode::PushS32 => {
                    let v = read_s32(code, &mut ip);
                    self.push(DataCell::from_s32(v))?;
                }
                Opcode::PushF32 => {
                    let v = read_f32(code, &mut ip);
                    self.push(DataCell::from_f32(v))?;
                }
                Opcode::PushF64 => {
                    let v = read_f64(code, &mut ip);
                    self.push(DataCell::from_f64(v))?;
                }
                Opcode::PushNullptr => self.push(DataCell::from_pointer(RawPtr::NULL))?,

                Opcode::Pop => {
                    self.pop();
                }
                Opcode::PopMany => {
                    let n = read_u32(code, &mut ip) as usize;
                    self.pop_many(n);
                }
                Opcode::Swap => {
                    let len = self.stack.len();
                    self.stack.swap(len - 1, len - 2);
                }
                Opcode::Clone => {
                    let v = self.top();
                    self.push(v)?;
                }
                Opcode::Memmove => {
                    let dst_offset = read_u32(code, &mut ip) as usize;
                    let src_offset = read_u32(code, &mut ip) as usize;
                    let size = read_u32(code, &mut ip) as usize;
                    let end = self.stack.len() * 8;
                    let base = self.stack.as_mut_ptr() as *mut u8;
                    unsafe {
                        let dst = base.add(end - dst_offset);
                        let src = base.add(end - src_offset);
                        std::ptr::copy(src, dst, size);
                    }
                }

                Opcode::Call => {
                    let fun_idx = read_u32(code, &mut ip) as usize;
                    match &program.functions[fun_idx] {
                        LoadedFunction::Host { callback, param_cells, return_cells } => {
                            let argv_start = self.stack.len() - param_cells;
                            let result = callback(&self.stack[argv_start..], host_data);
                            self.pop_many(*param_cells);
                            if *return_cells > 0 {
                                self.push(result)?;
                            }
                        }
                        LoadedFunction::Source { entry_offset, stack_cells, param_cells, .. } => {
                            self.frames.last_mut().expect("call frame underflow").ip = ip;
                            self.push_stack_frame(*entry_offset, *stack_cells, *param_cells)?;
                            ip = *entry_offset;
                        }
                    }
                }
                Opcode::Return => {
                    let frame = *self.frames.last().expect("call frame underflow");
                    let len = self.stack.len();
                    let ret_size = len - (frame.bp + frame.size);
                    self.stack.copy_within(len - ret_size..len, frame.bp);
                    self.pop_many(frame.size);
                    self.frames.pop();
                    match self.frames.last() {
                        Some(caller) => ip = caller.ip,
                        // `main` returns void; there is no exit-code cell to
                        // pop. A program signals a non-zero status by
                        // calling the `exit` host function directly.
                        None => return Ok(0),
                    }
                }

                Opcode::JumpTrue => {
                    let target = read_s32(code, &mut ip) as usize;
                    let cond = self.pop().s8();
                    if cond != 0 {
                        ip = target;
                    }
                }
                Opcode::JumpFalse => {
                    let target = read_s32(code, &mut ip) as usize;
                    let cond = self.pop().s8();
                    if cond == 0 {
                        ip = target;
                    }
                }
                Opcode::Jump => {
                    let target = read_s32(code, &mut ip) as usize;
                    ip = target;
                }

                Opcode::Address => {
                    let byte_offset = read_u32(code, &mut ip) as usize;
                    let frame = *self.frames.last().expect("call frame underflow");
                    let base_byte = frame.bp * 8;
                    let addr_byte = base_byte + byte_offset;
                    if addr_byte < base_byte || addr_byte >= base_byte + frame.size * 8 {
                        return Err(VmError::InvalidAddress);
                    }
                    let ptr = unsafe { (self.stack.as_mut_ptr() as *mut u8).add(addr_byte) };
                    self.push(DataCell::from_pointer(RawPtr(ptr)))?;
                }
                Opcode::AddressGlobal => {
                    let byte_offset = read_u32(code, &mut ip) as usize;
                    if byte_offset >= program.global_data_size {
                        return Err(VmError::InvalidAddress);
                    }
                    let ptr = unsafe { (self.stack.as_mut_ptr() as *mut u8).add(byte_offset) };
                    self.push(DataCell::from_pointer(RawPtr(ptr)))?;
                }

                Opcode::Store1 => {
                    let ptr = self.pop().pointer();
                    let v = self.top().s8();
                    unsafe { std::ptr::write(ptr.0 as *mut i8, v) };
                }
                Opcode::Store4 => {
                    let ptr = self.pop().pointer();
                    let cell = self.top();
                    unsafe { std::ptr::copy_nonoverlapping(&cell as *const DataCell as *const u8, ptr.0, 4) };
                }
                Opcode::Store8 => {
                    let ptr = self.pop().pointer();
                    let cell = self.top();
                    unsafe { std::ptr::copy_nonoverlapping(&cell as *const DataCell as *const u8, ptr.0, 8) };
                }
                Opcode::StoreStruct => {
                    let ptr = self.pop().pointer();
                    let byte_size = read_u32(code, &mut ip) as usize;
                    let data_size = tinyc_abi::data_cell_count(byte_size as u64) as usize;
                    let src_index = self.stack.len() - data_size;
                    let src = &self.stack[src_index] as *const DataCell as *const u8;
                    unsafe { std::ptr::copy_nonoverlapping(src, ptr.0, byte_size) };
                }

                Opcode::Load1 => {
                    let ptr = self.top().pointer();
                    let v = unsafe { std::ptr::read(ptr.0 as *const i8) };
                    *self.top_mut() = DataCell::from_s8(v);
                }
                Opcode::Load4 => {
                    let ptr = self.top().pointer();
                    let mut cell = DataCell::zeroed();
                    unsafe { std::ptr::copy_nonoverlapping(ptr.0, &mut cell as *mut DataCell as *mut u8, 4) };
                    *self.top_mut() = cell;
                }
                Opcode::Load8 => {
                    let ptr = self.top().pointer();
                    let mut cell = DataCell::zeroed();
                    unsafe { std::ptr::copy_nonoverlapping(ptr.0, &mut cell as *mut DataCell as *mut u8, 8) };
                    *self.top_mut() = cell;
                }
                Opcode::LoadStruct => {
                    let ptr = self.pop().pointer();
                    let byte_size = read_u32(code, &mut ip) as usize;
                    let data_size = tinyc_abi::data_cell_count(byte_size as u64) as usize;
                    self.push_many(data_size)?;
                    let dst_index = self.stack.len() - data_size;
                    let dst = &mut self.stack[dst_index] as *mut DataCell as *mut u8;
                    unsafe { std::ptr::copy_nonoverlapping(ptr.0, dst, byte_size) };
                }

                Opcode::CompareEqS32 => self.binary_s32(|a, b| (a == b) as i32),
                Opcode::CompareNeS32 => self.binary_s32(|a, b| (a != b) as i32),
                Opcode::CompareGS32 => self.binary_s32(|a, b| (a > b) as i32),
                Opcode::CompareGeS32 => self.binary_s32(|a, b| (a >= b) as i32),
                Opcode::CompareLS32 => self.binary_s32(|a, b| (a < b) as i32),
                Opcode::CompareLeS32 => self.binary_s32(|a, b| (a <= b) as i32),
                Opcode::LogicalNotS32 => {
                    let v = self.top().s32();
                    *self.top_mut() = DataCell::from_s8((v == 0) as i8);
                }
                Opcode::NegateS32 => {
                    let v = self.top().s32();
                    *self.top_mut() = DataCell::from_s32(-v);
                }
                Opcode::AddS32 => self.arith_s32(|a, b| a.wrapping_add(b)),
                Opcode::SubS32 => self.arith_s32(|a, b| a.wrapping_sub(b)),
                Opcode::MulS32 => self.arith_s32(|a, b| a.wrapping_mul(b)),
                Opcode::DivS32 => {
                    let rhs = self.pop().s32();
                    let lhs = self.top().s32();
                    *self.top_mut() = DataCell::from_s32(lhs.wrapping_div(rhs));
                }
                Opcode::ModuloS32 => {
                    let rhs = self.pop().s32();
                    let lhs = self.top().s32();
                    *self.top_mut() = DataCell::from_s32(lhs.wrapping_rem(rhs));
                }

                Opcode::CompareEqF32 => self.compare_f32(|a, b| a == b),
                Opcode::CompareNeF32 => self.compare_f32(|a, b| a != b),
                Opcode::CompareGF32 => self.compare_f32(|a, b| a > b),
                Opcode::CompareGeF32 => self.compare_f32(|a, b| a >= b),
                Opcode::CompareLF32 => self.compare_f32(|a, b| a < b),
                Opcode::CompareLeF32 => self.compare_f32(|a, b| a <= b),
                Opcode::LogicalNotF32 => {
                    let v = self.top().f32();
                    *self.top_mut() = DataCell::from_s8((v == 0.0) as i8);
                }
                Opcode::NegateF32 => {
                    let v = self.top().f32();
                    *self.top_mut() = DataCell::from_f32(-v);
                }
                Opcode::AddF32 => self.arith_f32(|a, b| a + b),
                Opcode::SubF32 => self.arith_f32(|a, b| a - b),
                Opcode::MulF32 => self.arith_f32(|a, b| a * b),
                Opcode::DivF32 => self.arith_f32(|a, b| a / b),

                Opcode::CompareEqF64 => self.compare_f64(|a, b| a == b),
                Opcode::CompareNeF64 => self.compare_f64(|a, b| a != b),
                Opcode::CompareGF64 => self.compare_f64(|a, b| a > b),
                Opcode::CompareGeF64 => self.compare_f64(|a, b| a >= b),
                Opcode::CompareLF64 => self.compare_f64(|a, b| a < b),
                Opcode::CompareLeF64 => self.compare_f64(|a, b| a <= b),
                Opcode::LogicalNotF64 => {
                    let v = self.top().f64();
                    *self.top_mut() = DataCell::from_s8((v == 0.0) as i8);
                }
                Opcode::NegateF64 => {
                    let v = self.top().f64();
                    *self.top_mut() = DataCell::from_f64(-v);
                }
                Opcode::AddF64 => self.arith_f64(|a, b| a + b),
                Opcode::SubF64 => self.arith_f64(|a, b| a - b),
                Opcode::MulF64 => self.arith_f64(|a, b| a * b),
                Opcode::DivF64 => self.arith_f64(|a, b| a / b),

                Opcode::CompareEqPtr => self.compare_ptr(|a, b| a.0 == b.0),
                Opcode::CompareNePtr => self.compare_ptr(|a, b| a.0 != b.0),
                Opcode::CompareGPtr => self.compare_ptr(|a, b| a.0 > b.0),
                Opcode::CompareGePtr => self.compare_ptr(|a, b| a.0 >= b.0),
                Opcode::CompareLPtr => self.compare_ptr(|a, b| a.0 < b.0),
                Opcode::CompareLePtr => self.compare_ptr(|a, b| a.0 <= b.0),
                Opcode::LogicalNotPtr => {
                    let v = self.top().pointer();
                    *self.top_mut() = DataCell::from_s8(v.is_null() as i8);
                }
                Opcode::SubPtrPtr => {
                    let elem_size = read_s32(code, &mut ip) as isize;
                    let rhs = self.pop().pointer();
                    let lhs = self.top().pointer();
                    let byte_diff = unsafe { lhs.0.offset_from(rhs.0) };
                    *self.top_mut() = DataCell::from_s32((byte_diff / elem_size) as i32);
                }
                Opcode::AddPtrS32 => {
                    let type_byte_size = read_s32(code, &mut ip) as isize;
                    let index = self.pop().s32() as isize;
                    let ptr = self.top().pointer();
                    *self.top_mut() = DataCell::from_pointer(unsafe { ptr.byte_offset(index * type_byte_size) });
                }
                Opcode::SubPtrS32 => {
                    let type_byte_size = read_s32(code, &mut ip) as isize;
                    let index = self.pop().s32() as isize;
                    let ptr = self.top().pointer();
                    *self.top_mut() = DataCell::from_pointer(unsafe { ptr.byte_offset(-(index * type_byte_size)) });
                }

                Opcode::BoolFromS8 => self.convert(|c| DataCell::from_s8((c.s8() != 0) as i8)),
                Opcode::BoolFromU8 => self.convert(|c| DataCell::from_s8((c.u8() != 0) as i8)),
                Opcode::BoolFromS32 => self.convert(|c| DataCell::from_s8((c.s32() != 0) as i8)),
                Opcode::BoolFromF32 => self.convert(|c| DataCell::from_s8((c.f32() != 0.0) as i8)),
                Opcode::BoolFromF64 => self.convert(|c| DataCell::from_s8((c.f64() != 0.0) as i8)),

                Opcode::S8FromU8 => self.convert(|c| DataCell::from_s8(c.u8() as i8)),
                Opcode::S8FromS32 => self.convert(|c| DataCell::from_s8(c.s32() as i8)),
                Opcode::S8FromF32 => self.convert(|c| DataCell::from_s8(c.f32() as i8)),
                Opcode::S8FromF64 => self.convert(|c| DataCell::from_s8(c.f64() as i8)),

                Opcode::U8FromS8 => self.convert(|c| DataCell::from_u8(c.s8() as u8)),
                Opcode::U8FromS32 => self.convert(|c| DataCell::from_u8(c.s32() as u8)),
                Opcode::U8FromF32 => self.convert(|c| DataCell::from_u8(c.f32() as u8)),
                Opcode::U8FromF64 => self.convert(|c| DataCell::from_u8(c.f64() as u8)),

                Opcode::S32FromS8 => self.convert(|c| DataCell::from_s32(c.s8() as i32)),
                Opcode::S32FromU8 => self.convert(|c| DataCell::from_s32(c.u8() as i32)),
                Opcode::S32FromF32 => self.convert(|c| DataCell::from_s32(c.f32() as i32)),
                Opcode::S32FromF64 => self.convert(|c| DataCell::from_s32(c.f64() as i32)),

                Opcode::F32FromS8 => self.convert(|c| DataCell::from_f32(c.s8() as f32)),
                Opcode::F32FromU8 => self.convert(|c| DataCell::from_f32(c.u8() as f32)),
                Opcode::F32FromS32 => self.convert(|c| DataCell::from_f32(c.s32() as f32)),
                Opcode::F32FromF64 => self.convert(|c| DataCell::from_f32(c.f64() as f32)),

                Opcode::F64FromS8 => self.convert(|c| DataCell::from_f64(c.s8() as f64)),
                Opcode::F64FromU8 => self.convert(|c| DataCell::from_f64(c.u8() as f64)),
                Opcode::F64FromS32 => self.convert(|c| DataCell::from_f64(c.s32() as f64)),
                Opcode::F64FromF32 => self.convert(|c| DataCell::from_f64(c.f32() as f64)),
            }
        }
    }

    fn convert(&mut self, f: impl Fn(DataCell) -> DataCell) {
        let v = self.top();
        *self.top_mut() = f(v);
    }

    fn binary_s32(&mut self, f: impl Fn(i32, i32) -> i32) {
        let rhs = self.pop().s32();
        let lhs = self.top().s32();
        *self.top_mut() = DataCell::from_s8((f(lhs, rhs) != 0) as i8);
    }

    fn arith_s32(&mut self, f: impl Fn(i32, i32) -> i32) {
        let rhs = self.pop().s32();
        let lhs = self.top().s32();
        *self.top_mut() = DataCell::from_s32(f(lhs, rhs));
    }

    fn compare_f32(&mut self, f: impl Fn(f32, f32) -> bool) {
        let rhs = self.pop().f32();
        let lhs = self.top().f32();
        *self.top_mut() = DataCell::from_s8(f(lhs, rhs) as i8);
    }

    fn arith_f32(&mut self, f: impl Fn(f32, f32) -> f32) {
        let rhs = self.pop().f32();
        let lhs = self.top().f32();
        *self.top_mut() = DataCell::from_f32(f(lhs, rhs));
    }

    fn compare_f64(&mut self, f: impl Fn(f64, f64) -> bool) {
        let rhs = self.pop().f64();
        let lhs = self.top().f64();
        *self.top_mut() = DataCell::from_s8(f(lhs, rhs) as i8);
    }

    fn arith_f64(&mut self, f: impl Fn(f64, f64) -> f64) {
        let rhs = self.pop().f64();
        let lhs = self.top().f64();
        *self.top_mut() = DataCell::from_f64(f(lhs, rhs));
    }

    fn compare_ptr(&mut self, f: impl Fn(RawPtr, RawPtr) -> bool) {
        let rhs = self.pop().pointer();
        let lhs = self.top().pointer();
        *self.top_mut() = DataCell::from_s8(f(lhs, rhs) as i8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Hand-assembles the wire format `tinyc_codegen::serialize` produces,
    /// byte for byte, so these tests exercise `LoadedProgram::load`'s parser
    /// without going through the compiler front end. Table index 0 is always
    /// the entry function, matching the assembler's active-function
    /// worklist, so tests push `main` first.
    struct ProgramBuilder {
        bytecode: Vec<u8>,
        functions: Vec<Vec<u8>>,
        global_data_size: u32,
        strings_byte_size: u32,
    }

    impl ProgramBuilder {
        fn new() -> Self {
            ProgramBuilder { bytecode: Vec::new(), functions: Vec::new(), global_data_size: 0, strings_byte_size: 0 }
        }

        fn source_fn(&mut self, code: &[u8]) -> u32 {
            let entry_offset = self.bytecode.len() as u32;
            self.bytecode.extend_from_slice(code);
            let idx = self.functions.len() as u32;
            let mut entry = vec![0u8];
            entry.extend_from_slice(&0u32.to_le_bytes());
            entry.extend_from_slice(&0u32.to_le_bytes());
            entry.extend_from_slice(&entry_offset.to_le_bytes());
            entry.extend_from_slice(&0u32.to_le_bytes());
            self.functions.push(entry);
            idx
        }

        fn host_fn(&mut self, prototype: &str, param_cells: u32, return_cells: u32) -> u32 {
            let idx = self.functions.len() as u32;
            let hash = tinyc_codegen::djb2(prototype);
            let mut entry = vec![1u8];
            entry.extend_from_slice(&param_cells.to_le_bytes());
            entry.extend_from_slice(&return_cells.to_le_bytes());
            entry.extend_from_slice(&hash.to_le_bytes());
            self.functions.push(entry);
            idx
        }

        fn build(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&(self.functions.len() as u32).to_le_bytes());
            out.extend_from_slice(&(self.bytecode.len() as u32).to_le_bytes());
            out.extend_from_slice(&self.global_data_size.to_le_bytes());
            out.extend_from_slice(&self.strings_byte_size.to_le_bytes());
            out.extend_from_slice(&self.bytecode);
            for entry in &self.functions {
                out.extend_from_slice(entry);
            }
            out
        }
    }

    fn op(byte: Opcode) -> u8 {
        byte as u8
    }

    #[test]
    fn calls_a_host_function_with_the_right_argument() {
        thread_local! {
            static SEEN: RefCell<i32> = RefCell::new(0);
        }
        fn capture(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
            SEEN.with(|s| *s.borrow_mut() = argv[0].s32());
            DataCell::zeroed()
        }

        let mut builder = ProgramBuilder::new();
        let capture_idx: u32 = 1; // main takes table index 0; capture will be the next push.
        let mut main_code = Vec::new();
        main_code.push(op(Opcode::PushS32));
        main_code.extend_from_slice(&7i32.to_le_bytes());
        main_code.push(op(Opcode::Call));
        main_code.extend_from_slice(&capture_idx.to_le_bytes());
        main_code.push(op(Opcode::Return));
        let main_idx = builder.source_fn(&main_code);
        assert_eq!(main_idx, 0);
        assert_eq!(builder.host_fn("void capture(s32)", 1, 0), capture_idx);
        let bytes = builder.build();

        let mut hosts = HostRegistry::new();
        hosts.register("void capture(s32)", capture);
        let program = LoadedProgram::load(&bytes, &hosts).expect("loads");

        let mut vm = Vm::new();
        let mut host_data: () = ();
        let exit_code = vm.run(&program, &mut host_data).expect("runs");
        assert_eq!(exit_code, 0);
        assert_eq!(SEEN.with(|s| *s.borrow()), 7);
    }

    #[test]
    fn unresolved_host_prototype_fails_to_load() {
        let mut builder = ProgramBuilder::new();
        let main_idx = builder.source_fn(&[op(Opcode::Return)]);
        assert_eq!(main_idx, 0);
        builder.host_fn("void mystery()", 0, 0);
        let bytes = builder.build();

        let hosts = HostRegistry::new();
        assert!(matches!(LoadedProgram::load(&bytes, &hosts), Err(VmError::UnresolvedHostFunction { .. })));
    }

    #[test]
    fn arithmetic_runs_end_to_end() {
        // main() { s32 x = 2 + 3 * 4; report(x); }
        let mut builder = ProgramBuilder::new();
        let report_idx: u32 = 1; // main takes table index 0; report will be the next push.
        let mut code = Vec::new();
        code.push(op(Opcode::PushS32));
        code.extend_from_slice(&3i32.to_le_bytes());
        code.push(op(Opcode::PushS32));
        code.extend_from_slice(&4i32.to_le_bytes());
        code.push(op(Opcode::MulS32));
        code.push(op(Opcode::PushS32));
        code.extend_from_slice(&2i32.to_le_bytes());
        code.push(op(Opcode::Swap));
        code.push(op(Opcode::AddS32));
        code.push(op(Opcode::Call));
        code.extend_from_slice(&report_idx.to_le_bytes());
        code.push(op(Opcode::Return));
        let main_idx = builder.source_fn(&code);
        assert_eq!(main_idx, 0);
        assert_eq!(builder.host_fn("void report(s32)", 1, 0), report_idx);
        let bytes = builder.build();

        thread_local! {
            static RESULT: RefCell<i32> = RefCell::new(0);
        }
        fn report(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
            RESULT.with(|r| *r.borrow_mut() = argv[0].s32());
            DataCell::zeroed()
        }

        let mut hosts = HostRegistry::new();
        hosts.register("void report(s32)", report);
        let program = LoadedProgram::load(&bytes, &hosts).expect("loads");
        let mut vm = Vm::new();
        vm.run(&program, &mut ()).expect("runs");
        assert_eq!(RESULT.with(|r| *r.borrow()), 14);
    }
}
