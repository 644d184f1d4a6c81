//! Tracing crate
//!
//! Records the lifecycle of invocations on both ends of a remote call: start and end,
//! allocations, lock wait and hold times, remote calls and page faults. Events are
//! buffered in memory and flushed to one append-only text log per side, later
//! correlated by `idcm-analytics`.
//!
//! # Examples
//! ```no_run
//! use idcm_tracing::prelude::*;
//!
//! let logger = LoggerBuilder::new(Side::Server).build().unwrap();
//! let subject = logger.next_subject("Greet");
//! logger.begin_invocation(&subject, &[Feature::new("msg_len", 5)]);
//! let buffer = logger.tracked_alloc(&subject, 64);
//! logger.tracked_free(&subject, buffer);
//! logger.end_invocation(&subject);
//! ```

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

pub mod alloc;
pub mod errors;
pub mod event;
pub mod lock;
pub mod logger;
pub mod panic_hook;
pub mod process_info;
pub mod sample_id;
pub mod scope;
pub mod time;

pub mod prelude {
    pub use crate::alloc::TrackedAlloc;
    pub use crate::event::{EventKind, Feature, FeatureValue, LogLine, Subject};
    pub use crate::lock::TimedMutexGuard;
    pub use crate::logger::{Logger, LoggerBuilder, Side};
    pub use crate::process_info::PageFaults;
    pub use crate::scope::InvocationGuard;
}
