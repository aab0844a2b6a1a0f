//! Translation between the AST and the canonical JSON encoding.

mod printer;
mod reader;

pub use printer::{print, print_to_string, to_value, JsonFormat};
pub use reader::{read, read_slice, read_slice_with_options, read_with_options, ReaderOptions};
