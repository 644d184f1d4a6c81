//! Allocations reported to the event log
use crate::event::{EventKind, Subject};
use crate::logger::Logger;

/// Heap buffer obtained through [`Logger::tracked_alloc`].
///
/// The handle owns the memory; give it back with [`Logger::tracked_free`] so that the
/// release shows up in the log. Dropping it without doing so frees the memory silently,
/// which the trace reports as a leak.
#[derive(Debug)]
pub struct TrackedAlloc {
    data: Vec<u8>,
}

impl TrackedAlloc {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Logger {
    /// Allocates `size` zeroed bytes and records `malloc <size>`.
    /// Running out of memory terminates the process.
    pub fn tracked_alloc(&self, subject: &Subject, size: usize) -> TrackedAlloc {
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            self.fatal(&format!("cannot allocate {size} bytes for {subject}"));
        }
        data.resize(size, 0);
        self.record_event(subject, EventKind::Malloc, &size.to_string());
        TrackedAlloc { data }
    }

    /// Grows or shrinks the buffer, keeping its prefix, and records `realloc <new_size>`
    pub fn tracked_realloc(&self, subject: &Subject, alloc: &mut TrackedAlloc, new_size: usize) {
        let additional = new_size.saturating_sub(alloc.data.len());
        if alloc.data.try_reserve_exact(additional).is_err() {
            self.fatal(&format!("cannot reallocate {new_size} bytes for {subject}"));
        }
        alloc.data.resize(new_size, 0);
        alloc.data.shrink_to_fit();
        self.record_event(subject, EventKind::Realloc, &new_size.to_string());
    }

    pub fn tracked_free(&self, subject: &Subject, alloc: TrackedAlloc) {
        drop(alloc);
        self.record_event(subject, EventKind::Free, "");
    }
}
