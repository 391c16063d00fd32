/// One byte per instruction, immediates follow inline in little-endian form.
/// Order does not matter to the VM (it's matched by value, not position) but
/// is kept grouped by family to make the dispatch table easy to audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    PushS32,
    PushF32,
    PushF64,
    PushNullptr,

    Pop,
    PopMany,
    Swap,
    Memmove,
    Clone,
    Call,
    Return,
    JumpTrue,
    JumpFalse,
    Jump,
    Address,
    AddressGlobal,

    Store1,
    Store4,
    Store8,
    StoreStruct,

    Load1,
    Load4,
    Load8,
    LoadStruct,

    CompareEqS32,
    CompareNeS32,
    CompareGS32,
    CompareGeS32,
    CompareLS32,
    CompareLeS32,
    LogicalNotS32,
    NegateS32,
    AddS32,
    SubS32,
    MulS32,
    DivS32,
    ModuloS32,

    CompareEqF32,
    CompareNeF32,
    CompareGF32,
    CompareGeF32,
    CompareLF32,
    CompareLeF32,
    LogicalNotF32,
    NegateF32,
    AddF32,
    SubF32,
    MulF32,
    DivF32,

    CompareEqF64,
    CompareNeF64,
    CompareGF64,
    CompareGeF64,
    CompareLF64,
    CompareLeF64,
    LogicalNotF64,
    NegateF64,
    AddF64,
    SubF64,
    MulF64,
    DivF64,

    CompareEqPtr,
    CompareNePtr,
    CompareGPtr,
    CompareGePtr,
    CompareLPtr,
    CompareLePtr,
    LogicalNotPtr,
    SubPtrPtr,
    AddPtrS32,
    SubPtrS32,

    // Scalar conversions, named `To_From`.
    BoolFromS8,
    BoolFromU8,
    BoolFromS32,
    BoolFromF32,
    BoolFromF64,

    S8FromU8,
    S8FromS32,
    S8FromF32,
    S8FromF64,

    U8FromS8,
    U8FromS32,
    U8FromF32,
    U8FromF64,

    S32FromS8,
    S32FromU8,
    S32FromF32,
    S32FromF64,

    F32FromS8,
    F32FromU8,
    F32FromS32,
    F32FromF64,

    F64FromS8,
    F64FromU8,
    F64FromS32,
    F64FromF32,
}

impl Opcode {
    /// Inverse of the `as u8` cast `emit_op` uses. Table order must track
    /// the enum's declaration order exactly, since that's what fixes each
    /// variant's discriminant.
    pub fn from_u8(byte: u8) -> Option<Opcode> {
        const ALL: &[Opcode] = &[
            Opcode::PushS32,
            Opcode::PushF32,
            Opcode::PushF64,
            Opcode::PushNullptr,
            Opcode::Pop,
            Opcode::PopMany,
            Opcode::Swap,
            Opcode::Memmove,
            Opcode::Clone,
            Opcode::Call,
            Opcode::Return,
            Opcode::JumpTrue,
            Opcode::JumpFalse,
            Opcode::Jump,
            Opcode::Address,
            Opcode::AddressGlobal,
            Opcode::Store1,
            Opcode::Store4,
            Opcode::Store8,
            Opcode::StoreStruct,
            Opcode::Load1,
            Opcode::Load4,
            Opcode::Load8,
            Opcode::LoadStruct,
            Opcode::CompareEqS32,
            Opcode::CompareNeS32,
            Opcode::CompareGS32,
            Opcode::CompareGeS32,
            Opcode::CompareLS32,
            Opcode::CompareLeS32,
            Opcode::LogicalNotS32,
            Opcode::NegateS32,
            Opcode::AddS32,
            Opcode::SubS32,
            Opcode::MulS32,
            Opcode::DivS32,
            Opcode::ModuloS32,
            Opcode::CompareEqF32,
            Opcode::CompareNeF32,
            Opcode::CompareGF32,
            Opcode::CompareGeF32,
            Opcode::CompareLF32,
            Opcode::CompareLeF32,
            Opcode::LogicalNotF32,
            Opcode::NegateF32,
            Opcode::AddF32,
            Opcode::SubF32,
            Opcode::MulF32,
            Opcode::DivF32,
            Opcode::CompareEqF64,
            Opcode::CompareNeF64,
            Opcode::CompareGF64,
            Opcode::CompareGeF64,
            Opcode::CompareLF64,
            Opcode::CompareLeF64,
            Opcode::LogicalNotF64,
            Opcode::NegateF64,
            Opcode::AddF64,
            Opcode::SubF64,
            Opcode::MulF64,
            Opcode::DivF64,
            Opcode::CompareEqPtr,
            Opcode::CompareNePtr,
            Opcode::CompareGPtr,
            Opcode::CompareGePtr,
            Opcode::CompareLPtr,
            Opcode::CompareLePtr,
            Opcode::LogicalNotPtr,
            Opcode::SubPtrPtr,
            Opcode::AddPtrS32,
            Opcode::SubPtrS32,
            Opcode::BoolFromS8,
            Opcode::BoolFromU8,
            Opcode::BoolFromS32,
            Opcode::BoolFromF32,
            Opcode::BoolFromF64,
            Opcode::S8FromU8,
            Opcode::S8FromS32,
            Opcode::S8FromF32,
            Opcode::S8FromF64,
            Opcode::U8FromS8,
            Opcode::U8FromS32,
            Opcode::U8FromF32,
            Opcode::U8FromF64,
            Opcode::S32FromS8,
            Opcode::S32FromU8,
            Opcode::S32FromF32,
            Opcode::S32FromF64,
            Opcode::F32FromS8,
            Opcode::F32FromU8,
            Opcode::F32FromS32,
            Opcode::F32FromF64,
            Opcode::F64FromS8,
            Opcode::F64FromU8,
            Opcode::F64FromS32,
            Opcode::F64FromF32,
        ];
        ALL.get(byte as usize).copied()
    }
}

/// A growable bytecode sequence with support for patching forward jumps and
/// a dry-run mode that records book-keeping without emitting bytes (used to
/// type-check an expression a second time without doubling the output).
#[derive(Debug, Default)]
pub struct BytecodeBuffer {
    bytes: Vec<u8>,
    dry_run: bool,
}

impl BytecodeBuffer {
    pub fn new() -> Self {
        BytecodeBuffer::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn emit_op(&mut self, op: Opcode) {
        if !self.dry_run {
            self.bytes.push(op as u8);
        }
    }

    pub fn emit_s8(&mut self, value: i8) {
        if !self.dry_run {
            self.bytes.push(value as u8);
        }
    }

    pub fn emit_s32(&mut self, value: i32) {
        if !self.dry_run {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn emit_u32(&mut self, value: u32) {
        if !self.dry_run {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn emit_f32(&mut self, value: f32) {
        if !self.dry_run {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn emit_f64(&mut self, value: f64) {
        if !self.dry_run {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Reserves a 4-byte slot for a forward jump target and returns its
    /// byte offset, to be filled in later with [`Self::patch_s32`].
    pub fn reserve_s32(&mut self) -> usize {
        if self.dry_run {
            return 0;
        }
        let at = self.bytes.len();
        self.bytes.extend_from_slice(&0i32.to_le_bytes());
        at
    }

    pub fn patch_s32(&mut self, at: usize, value: i32) {
        if self.dry_run {
            return;
        }
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_emits_nothing_but_keeps_indices_stable() {
        let mut buf = BytecodeBuffer::new();
        buf.set_dry_run(true);
        buf.emit_op(Opcode::PushS32);
        buf.emit_s32(14);
        assert!(buf.is_empty());
    }

    #[test]
    fn from_u8_round_trips_every_variant() {
        for byte in 0u8.. {
            match Opcode::from_u8(byte) {
                Some(op) => assert_eq!(op as u8, byte),
                None => break,
            }
        }
    }

    #[test]
    fn patch_overwrites_reserved_slot() {
        let mut buf = BytecodeBuffer::new();
        buf.emit_op(Opcode::Jump);
        let at = buf.reserve_s32();
        buf.emit_op(Opcode::Pop);
        buf.patch_s32(at, 99);
        let bytes = buf.into_bytes();
        assert_eq!(i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()), 99);
    }
}
