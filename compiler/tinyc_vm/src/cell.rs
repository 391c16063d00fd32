use std::fmt;

/// An untyped host address: the VM's only notion of "pointer". May alias
/// into the operand stack (addresses produced by ADDRESS/ADDRESS_GLOBAL) or
/// into memory a host function allocated; the VM performs no lifetime
/// tracking either way.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct RawPtr(pub *mut u8);

impl RawPtr {
    pub const NULL: RawPtr = RawPtr(std::ptr::null_mut());

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// # Safety
    /// The caller must ensure `self` points `bytes` away from a valid,
    /// in-bounds allocation that the resulting pointer will not outlive.
    pub unsafe fn byte_offset(self, bytes: isize) -> RawPtr {
        RawPtr(self.0.offset(bytes))
    }
}

impl fmt::Debug for RawPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", self.0)
    }
}

/// One 8-byte operand-stack slot, reinterpreted according to whichever
/// opcode reads it — mirrors the reference VM's untagged data union rather
/// than a safe tagged enum, since the bytecode itself carries the tag.
#[derive(Clone, Copy)]
#[repr(C)]
pub union DataCell {
    pub s8: i8,
    pub u8: u8,
    pub s32: i32,
    pub f32: f32,
    pub f64: f64,
    pub pointer: RawPtr,
}

impl DataCell {
    pub fn zeroed() -> Self {
        // SAFETY: every field of the union accepts the all-zero bit
        // pattern (null is a valid `RawPtr`), so this never observes an
        // invalid value through any accessor.
        unsafe { std::mem::zeroed() }
    }

    pub fn from_s32(v: i32) -> Self {
        let mut cell = Self::zeroed();
        cell.s32 = v;
        cell
    }

    pub fn from_f32(v: f32) -> Self {
        let mut cell = Self::zeroed();
        cell.f32 = v;
        cell
    }

    pub fn from_f64(v: f64) -> Self {
        DataCell { f64: v }
    }

    pub fn from_s8(v: i8) -> Self {
        let mut cell = Self::zeroed();
        cell.s8 = v;
        cell
    }

    pub fn from_u8(v: u8) -> Self {
        let mut cell = Self::zeroed();
        cell.u8 = v;
        cell
    }

    pub fn from_pointer(p: RawPtr) -> Self {
        DataCell { pointer: p }
    }

    pub fn s8(&self) -> i8 {
        unsafe { self.s8 }
    }

    pub fn u8(&self) -> u8 {
        unsafe { self.u8 }
    }

    pub fn s32(&self) -> i32 {
        unsafe { self.s32 }
    }

    pub fn f32(&self) -> f32 {
        unsafe { self.f32 }
    }

    pub fn f64(&self) -> f64 {
        unsafe { self.f64 }
    }

    pub fn pointer(&self) -> RawPtr {
        unsafe { self.pointer }
    }
}

impl fmt::Debug for DataCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // No discriminant to read; print the widest scalar interpretation.
        write!(f, "DataCell(s32={}, f64={}, ptr={:?})", self.s32(), self.f64(), self.pointer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_pointer_is_null() {
        assert!(DataCell::zeroed().pointer().is_null());
    }

    #[test]
    fn f64_round_trips() {
        assert_eq!(DataCell::from_f64(3.5).f64(), 3.5);
    }

    #[test]
    fn s8_write_does_not_require_prior_init() {
        let cell = DataCell::from_s8(-1);
        assert_eq!(cell.s8(), -1);
    }
}
