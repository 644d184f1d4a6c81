//! transit library
//! provides little-endian binary serialization for fixed-width integers,
//! length-prefixed strings and interned string tables

mod intern_table;
mod parser;
mod serialize;

pub use intern_table::*;
pub use parser::*;
pub use serialize::*;

pub mod prelude {
    pub use crate::{
        InternTable, Pod, advance_window, read_advance_short_string, read_consume_pod, write_any,
        write_short_string,
    };
}
