//! Grammar of the event log: one event per line,
//! `<relative_ms> <subject> <kind> [args...]`
mod feature;
pub use feature::*;

mod kind;
pub use kind::*;

mod line;
pub use line::*;

mod subject;
pub use subject::*;
