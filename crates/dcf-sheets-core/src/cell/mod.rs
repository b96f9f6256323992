//! Cell-related types

mod address;
mod arith;
mod object;
mod storage;
mod value;

pub use address::{
    char_range, column_to_index, index_to_column, shift_column, split_position,
    split_position_index, CellAddress, CellRange, CellRangeIter,
};
pub use arith::ArithOp;
pub use object::{sort_cells, Cell};
pub use storage::{CellData, CellStorage};
pub use value::{CellError, CellValue, SharedString};
