use crate::ids::StructId;

/// Ordering here is load-bearing: [`arithmetic_type`] picks the operand with
/// the larger discriminant as the promoted type once both sides are known to
/// be non-pointer arithmetic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BasicKind {
    Bool,
    S8,
    U8,
    S32,
    F32,
    F64,
    Void,
    Nullptr,
    Struct,
}

impl BasicKind {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BasicKind::Bool | BasicKind::S8 | BasicKind::U8 | BasicKind::S32 | BasicKind::F32 | BasicKind::F64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::F32 | BasicKind::F64)
    }
}

/// Maximum pointer depth a [`Ty`] can represent; bounded by the width of
/// `const_mask`.
pub const MAX_INDIRECTION: u8 = 7;

/// A type descriptor: a basic kind, a pointer depth, and a const bit per
/// indirection level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ty {
    pub kind: BasicKind,
    /// Pointer depth; 0 means a value of `kind`, 1 means `kind*`, etc.
    pub indirection: u8,
    /// Bit `i` set means the type is const at indirection level `i`. Bit 0
    /// is the referent's own const-ness; bit `i >= 1` is the const-ness of
    /// the pointer stored at depth `i`.
    pub const_mask: u8,
    /// Populated iff `kind == BasicKind::Struct`.
    pub struct_id: Option<StructId>,
}

impl Ty {
    pub fn new(kind: BasicKind) -> Self {
        Ty { kind, indirection: 0, const_mask: 0, struct_id: None }
    }

    pub fn void() -> Self {
        Ty::new(BasicKind::Void)
    }

    pub fn bool_() -> Self {
        Ty::new(BasicKind::Bool)
    }

    pub fn s32() -> Self {
        Ty::new(BasicKind::S32)
    }

    pub fn f64_() -> Self {
        Ty::new(BasicKind::F64)
    }

    pub fn nullptr() -> Self {
        let mut t = Ty::new(BasicKind::Nullptr);
        t.indirection = 1;
        t
    }

    pub fn struct_(id: StructId) -> Self {
        Ty { kind: BasicKind::Struct, indirection: 0, const_mask: 0, struct_id: Some(id) }
    }

    /// Returns this type with one additional level of pointer indirection.
    /// `const_at_top` marks the new outermost pointer itself as const.
    pub fn pointer_to(self, const_at_top: bool) -> Option<Self> {
        if self.indirection >= MAX_INDIRECTION {
            return None;
        }
        let mut t = self;
        t.indirection += 1;
        if const_at_top {
            t.const_mask |= 1 << t.indirection;
        }
        Some(t)
    }

    /// The type obtained by dereferencing one level of pointer indirection.
    pub fn referent(self) -> Option<Self> {
        if self.indirection == 0 {
            return None;
        }
        let mut t = self;
        t.indirection -= 1;
        t.const_mask &= (1 << (t.indirection + 1)) - 1;
        Some(t)
    }

    pub fn is_pointer(self) -> bool {
        self.indirection > 0
    }

    pub fn is_struct(self) -> bool {
        self.indirection == 0 && self.kind == BasicKind::Struct
    }

    pub fn is_void(self) -> bool {
        self.indirection == 0 && self.kind == BasicKind::Void
    }

    pub fn is_void_pointer(self) -> bool {
        self.indirection == 1 && self.kind == BasicKind::Void
    }

    pub fn is_arithmetic(self) -> bool {
        self.indirection == 0 && self.kind.is_arithmetic()
    }

    /// Is this type const at its own (topmost-referent) level, i.e. can an
    /// lvalue of this type be assigned through directly.
    pub fn is_top_const(self) -> bool {
        self.const_mask & 1 != 0
    }

    pub fn with_top_const(mut self, const_: bool) -> Self {
        if const_ {
            self.const_mask |= 1;
        } else {
            self.const_mask &= !1;
        }
        self
    }

    /// `&` of an lvalue of this type: pointer to this type, one level up,
    /// inheriting this type's own const-ness at the new referent level.
    pub fn address_of(self) -> Option<Self> {
        let mut t = self.pointer_to(false)?;
        // bit 0 of the new type describes the referent, which is `self`
        // itself; shift self's const bits up by one and merge.
        t.const_mask = (self.const_mask << 1) | (self.const_mask & 1);
        Some(t)
    }

    /// Two pointer types are comparable (`==`, ordering, or assignable
    /// without a cast) per the language's pointer-compatibility rule.
    pub fn pointer_comparable(self, other: Self) -> bool {
        if !self.is_pointer() || !other.is_pointer() {
            return false;
        }
        if self.kind == BasicKind::Nullptr || other.kind == BasicKind::Nullptr {
            return true;
        }
        if self.indirection == 1 && self.kind == BasicKind::Void {
            return true;
        }
        if other.indirection == 1 && other.kind == BasicKind::Void {
            return true;
        }
        if self.indirection != other.indirection || self.kind != other.kind {
            return false;
        }
        if self.kind == BasicKind::Struct {
            return self.struct_id == other.struct_id;
        }
        true
    }

    /// Can a value of type `from` be implicitly converted to `to` at the
    /// top level pointer target (const must only ever get stricter).
    pub fn pointer_assignable_to(self, to: Self) -> bool {
        if !self.pointer_comparable(to) {
            return false;
        }
        // every const bit set on `self` must also be set on `to`.
        (self.const_mask & !to.const_mask) == 0
    }
}

/// The usual arithmetic promotion: both operands convert to the wider of
/// the two kinds, with anything `<= S32` promoting to `S32`.
pub fn arithmetic_type(l: Ty, r: Ty) -> Option<Ty> {
    if !l.is_arithmetic() || !r.is_arithmetic() {
        return None;
    }
    let winner = if l.kind <= BasicKind::S32 && r.kind <= BasicKind::S32 {
        BasicKind::S32
    } else if l.kind >= r.kind {
        l.kind
    } else {
        r.kind
    };
    Some(Ty::new(winner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_picks_s32_for_small_kinds() {
        assert_eq!(arithmetic_type(Ty::new(BasicKind::Bool), Ty::new(BasicKind::S8)).unwrap().kind, BasicKind::S32);
    }

    #[test]
    fn promotion_widens_to_float() {
        assert_eq!(arithmetic_type(Ty::s32(), Ty::f64_()).unwrap().kind, BasicKind::F64);
    }

    #[test]
    fn pointer_roundtrip_through_address_and_referent() {
        let s32 = Ty::s32();
        let p = s32.address_of().unwrap();
        assert_eq!(p.indirection, 1);
        assert_eq!(p.referent().unwrap(), s32);
    }

    #[test]
    fn void_pointer_is_universally_comparable() {
        let vp = Ty::void().pointer_to(false).unwrap();
        let sp = Ty::s32().pointer_to(false).unwrap();
        assert!(vp.pointer_comparable(sp));
    }

    #[test]
    fn mismatched_pointer_kinds_are_not_comparable() {
        let sp = Ty::s32().pointer_to(false).unwrap();
        let fp = Ty::f64_().pointer_to(false).unwrap();
        assert!(!sp.pointer_comparable(fp));
    }

    #[test]
    fn const_stripping_assignment_is_rejected() {
        let const_s32_ptr = Ty::s32().with_top_const(true).pointer_to(false).unwrap();
        let mut_s32_ptr = Ty::s32().pointer_to(false).unwrap();
        assert!(!const_s32_ptr.pointer_assignable_to(mut_s32_ptr));
        assert!(mut_s32_ptr.pointer_assignable_to(const_s32_ptr));
    }
}
