use crate::ty::{BasicKind, Ty};

/// Renders a type back into the source spelling used in a function
/// prototype string, e.g. `const s32*`. This text is what gets hashed to
/// resolve host functions at load time, so its exact shape matters.
pub fn format_ty(ty: &Ty) -> String {
    let mut s = String::new();
    if ty.const_mask & 1 != 0 {
        s.push_str("const ");
    }
    s.push_str(match ty.kind {
        BasicKind::Bool => "bool",
        BasicKind::S8 => "s8",
        BasicKind::U8 => "u8",
        BasicKind::S32 => "s32",
        BasicKind::F32 => "f32",
        BasicKind::F64 => "f64",
        BasicKind::Void => "void",
        BasicKind::Nullptr => "nullptr",
        BasicKind::Struct => "struct",
    });
    for level in 1..=ty.indirection {
        s.push('*');
        if ty.const_mask & (1 << level) != 0 {
            s.push_str(" const");
        }
    }
    s
}
