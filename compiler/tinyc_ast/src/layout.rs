use tinyc_abi::size_and_align::{Align, Size};
use tinyc_abi::{Layout, TyAndLayout};
use tinyc_utils::IdxVec;

use crate::decl::StructDef;
use crate::ids::StructId;
use crate::ty::{BasicKind, Ty};

/// Computes byte size and alignment for every member of `def`, assigning
/// member offsets in declaration order with natural alignment and trailing
/// padding to the struct's own alignment. Mutates `def` in place.
pub fn layout_struct(def: &mut StructDef, structs: &IdxSliceStructs<'_>) {
    let mut offset: u64 = 0;
    let mut align: u64 = 1;
    for member in def.members.iter_mut() {
        let member_layout = compute_layout(member.ty, structs);
        let member_align = member_layout.layout.align.abi.bytes();
        align = align.max(member_align);
        offset = round_up(offset, member_align);
        member.byte_offset = offset;
        offset += member_layout.layout.size.bytes();
    }
    let size = if offset == 0 { 1 } else { round_up(offset, align) };
    def.byte_size = size;
    def.align = align;
    def.defined = true;
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

/// A thin borrow of the struct table, so `compute_layout` can resolve
/// `StructId` referents without owning the table.
pub struct IdxSliceStructs<'a> {
    structs: &'a IdxVec<StructId, StructDef>,
}

impl<'a> IdxSliceStructs<'a> {
    pub fn new(structs: &'a IdxVec<StructId, StructDef>) -> Self {
        IdxSliceStructs { structs }
    }

    fn get(&self, id: StructId) -> &StructDef {
        &self.structs[id]
    }
}

/// Computes the layout of any [`Ty`], consulting the struct table for
/// `STRUCT` types (which must already have had [`layout_struct`] run on
/// them) and treating pointers as an opaque 8-byte scalar regardless of
/// what they point to.
pub fn compute_layout(ty: Ty, structs: &IdxSliceStructs<'_>) -> TyAndLayout<Ty> {
    let layout = if ty.is_pointer() {
        Layout::scalar(Size::from_bytes(8), Align::from_bytes(8).unwrap())
    } else {
        match ty.kind {
            BasicKind::Bool | BasicKind::S8 | BasicKind::U8 => {
                Layout::scalar(Size::from_bytes(1), Align::from_bytes(1).unwrap())
            }
            BasicKind::S32 | BasicKind::F32 => {
                Layout::scalar(Size::from_bytes(4), Align::from_bytes(4).unwrap())
            }
            BasicKind::F64 => Layout::scalar(Size::from_bytes(8), Align::from_bytes(8).unwrap()),
            BasicKind::Void | BasicKind::Nullptr => {
                Layout::scalar(Size::from_bytes(0), Align::from_bytes(1).unwrap())
            }
            BasicKind::Struct => {
                let def = structs.get(ty.struct_id.expect("struct type without struct id"));
                Layout::aggregate(
                    Size::from_bytes(def.byte_size),
                    Align::from_bytes(def.align).unwrap(),
                )
            }
        }
    };
    TyAndLayout { ty, layout }
}

/// Convenience: the VM-operand-stack cell count of a type.
pub fn data_cell_size(ty: Ty, structs: &IdxSliceStructs<'_>) -> u32 {
    if ty.is_pointer() {
        return 1;
    }
    match ty.kind {
        BasicKind::Struct => compute_layout(ty, structs).layout.cell_count(),
        _ => 1,
    }
}

/// Byte size of the type pointed to by a pointer type; 0 for `void*`.
pub fn pointed_type_byte_size(ptr_ty: Ty, structs: &IdxSliceStructs<'_>) -> u64 {
    debug_assert!(ptr_ty.is_pointer());
    let referent = ptr_ty.referent().expect("pointer type has a referent");
    if referent.is_void() {
        return 0;
    }
    compute_layout(referent, structs).layout.size.bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{StructDef, StructMember};

    #[test]
    fn empty_struct_is_one_byte() {
        let mut def = StructDef::forward_declared("Empty".into());
        let structs: IdxVec<StructId, StructDef> = IdxVec::new();
        layout_struct(&mut def, &IdxSliceStructs::new(&structs));
        assert_eq!(def.byte_size, 1);
        assert_eq!(def.align, 1);
    }

    #[test]
    fn natural_alignment_with_padding() {
        // struct S { s8 a; s32 b; } -> size 8, align 4
        let mut def = StructDef::forward_declared("S".into());
        def.members.push(StructMember { name: "a".into(), ty: Ty::new(BasicKind::S8), byte_offset: 0 });
        def.members.push(StructMember { name: "b".into(), ty: Ty::s32(), byte_offset: 0 });
        let structs: IdxVec<StructId, StructDef> = IdxVec::new();
        layout_struct(&mut def, &IdxSliceStructs::new(&structs));
        assert_eq!(def.members[1].byte_offset, 4);
        assert_eq!(def.byte_size, 8);
        assert_eq!(def.align, 4);
    }
}
