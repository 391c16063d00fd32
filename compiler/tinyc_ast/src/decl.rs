use crate::ids::Local;
use crate::stmt::Block;
use crate::ty::Ty;

#[derive(Debug, Clone)]
pub struct LocalInfo {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub ty: Ty,
    /// Byte offset from the start of the struct; filled in by layout.
    pub byte_offset: u64,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<StructMember>,
    /// `false` for a forward declaration (`struct Foo;`) that is only ever
    /// used behind a pointer.
    pub defined: bool,
    pub byte_size: u64,
    pub align: u64,
}

impl StructDef {
    pub fn forward_declared(name: String) -> Self {
        StructDef { name, members: Vec::new(), defined: false, byte_size: 0, align: 1 }
    }

    pub fn find_member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
}

/// Where a function descriptor came from; carried through to the program
/// assembler's function table origin tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncOrigin {
    Source,
    CoreLib,
    HostUser,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub ret_ty: Ty,
    pub params: Vec<Param>,
    /// `None` for a host-declared prototype; `Some` for a source function.
    pub body: Option<Block>,
    pub origin: FuncOrigin,
    /// Every local declared in the body, including the parameters at index
    /// `0..params.len()`, indexed by [`Local`]. Empty for host functions.
    pub locals: tinyc_utils::IdxVec<Local, LocalInfo>,
}

impl FuncDecl {
    pub fn is_host(&self) -> bool {
        self.body.is_none()
    }

    /// Textual prototype used for host-function hash resolution, e.g.
    /// `"s32 pow(f64, f64)"`.
    pub fn prototype_text(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| crate::ty_fmt::format_ty(&p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}({})", crate::ty_fmt::format_ty(&self.ret_ty), self.name, params)
    }
}

#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: Ty,
    pub byte_offset: u64,
}
