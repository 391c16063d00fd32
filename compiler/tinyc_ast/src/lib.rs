pub mod decl;
pub mod expr;
pub mod ids;
pub mod layout;
pub mod stmt;
pub mod ty;
pub mod ty_fmt;

pub use decl::{FuncDecl, FuncOrigin, GlobalDecl, LocalInfo, Param, StructDef, StructMember};
pub use expr::{AssignOp, BinOp, Expr, Literal, UnOp};
pub use ids::{FuncId, GlobalId, Local, StructId};
pub use stmt::{Block, Stmt, VarDecl};
pub use ty::{arithmetic_type, BasicKind, Ty};
