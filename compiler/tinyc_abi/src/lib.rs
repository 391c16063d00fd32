pub mod layout;
pub mod size_and_align;

pub use layout::{CellRepr, Layout, TyAndLayout};
pub use size_and_align::{AbiAndPrefAlign, Align, AlignError, Size};

/// Size, in bytes, of one VM operand-stack data cell.
pub const DATA_CELL_BYTES: u64 = 8;

/// Number of data cells needed to hold `byte_size` bytes.
pub fn data_cell_count(byte_size: u64) -> u64 {
    byte_size.div_ceil(DATA_CELL_BYTES).max(if byte_size == 0 { 0 } else { 1 })
}
