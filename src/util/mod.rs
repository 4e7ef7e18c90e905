//! Input helpers shared by the file parsers.

mod reader;

pub use reader::{numbered_lines, open_reader};
