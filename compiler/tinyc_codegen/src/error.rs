use tinyc_ast::Ty;

#[derive(Debug, Clone)]
pub enum CodegenError {
    NotAnLvalue { what: &'static str },
    IncompatibleConversion { from: Ty, to: Ty },
    ConstViolation,
    IncompatiblePointerComparison,
    MemberNotFound { struct_name: String, member: String },
    NotAStruct,
    DerefOfNonPointer,
    DerefOfIncompleteOrVoid,
    NonArithmetic,
    UnknownStruct { name: String },
    MainMissing,
    MainWrongSignature,
    ConstLocalWithoutInitializer { name: String },
    BreakOutsideLoop,
    ContinueOutsideLoop,
    TooManyParams,
    TooManyStructMembers,
    DuplicateHostPrototype { prototype: String },
    MissingReturn { func_name: String },
    HostFunctionMultiCellReturn { func_name: String },
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::NotAnLvalue { what } => write!(f, "expected an lvalue, found {what}"),
            CodegenError::IncompatibleConversion { from, to } => {
                write!(f, "cannot convert {from:?} to {to:?}")
            }
            CodegenError::ConstViolation => write!(f, "assignment through a const-qualified pointer"),
            CodegenError::IncompatiblePointerComparison => write!(f, "incompatible pointer types compared"),
            CodegenError::MemberNotFound { struct_name, member } => {
                write!(f, "struct {struct_name} has no member '{member}'")
            }
            CodegenError::NotAStruct => write!(f, "member access on a non-struct value"),
            CodegenError::DerefOfNonPointer => write!(f, "dereferencing a non-pointer value"),
            CodegenError::DerefOfIncompleteOrVoid => write!(f, "dereferencing an incomplete or void type"),
            CodegenError::NonArithmetic => write!(f, "operand is not an arithmetic type"),
            CodegenError::UnknownStruct { name } => write!(f, "struct '{name}' is never defined"),
            CodegenError::MainMissing => write!(f, "no 'main' function defined"),
            CodegenError::MainWrongSignature => write!(f, "'main' must be declared as 'void main()'"),
            CodegenError::ConstLocalWithoutInitializer { name } => {
                write!(f, "const local '{name}' must have an initializer")
            }
            CodegenError::BreakOutsideLoop => write!(f, "'break' outside a loop"),
            CodegenError::ContinueOutsideLoop => write!(f, "'continue' outside a loop"),
            CodegenError::TooManyParams => write!(f, "function exceeds the maximum parameter count"),
            CodegenError::TooManyStructMembers => write!(f, "struct exceeds the maximum member count"),
            CodegenError::DuplicateHostPrototype { prototype } => {
                write!(f, "duplicate host prototype hash for '{prototype}'")
            }
            CodegenError::MissingReturn { func_name } => {
                write!(f, "function '{func_name}' does not return a value on every path")
            }
            CodegenError::HostFunctionMultiCellReturn { func_name } => {
                write!(f, "host function '{func_name}' returns a struct larger than one cell")
            }
        }
    }
}

impl std::error::Error for CodegenError {}
