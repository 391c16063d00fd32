pub mod cell;
pub mod error;
pub mod frame;
pub mod host;
pub mod vm;

pub use cell::{DataCell, RawPtr};
pub use error::VmError;
pub use frame::StackFrame;
pub use host::{HostCallback, HostRegistry};
pub use vm::{LoadedProgram, Vm};
