//! Sample ids so that repeated runs of a function get distinct subjects
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// How ids are counted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IdScope {
    /// one counter per function name, the first run of each function gets 1
    #[default]
    PerFunction,
    /// one counter for every function, ids are unique across the whole process
    Shared,
}

#[derive(Debug, Default)]
pub struct SampleIdAllocator {
    scope: IdScope,
    counters: Mutex<HashMap<String, u32>>,
}

impl SampleIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(scope: IdScope) -> Self {
        Self {
            scope,
            counters: Mutex::default(),
        }
    }

    pub fn scope(&self) -> IdScope {
        self.scope
    }

    /// Returns 1 for the first run, then 2, 3, ...
    pub fn next_sample_id(&self, function_name: &str) -> u32 {
        let key = match self.scope {
            IdScope::PerFunction => function_name,
            IdScope::Shared => "",
        };
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = counters.get_mut(key) {
            *counter += 1;
            *counter
        } else {
            counters.insert(key.to_owned(), 1);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_per_function() {
        let allocator = SampleIdAllocator::new();
        assert_eq!(allocator.next_sample_id("Greet"), 1);
        assert_eq!(allocator.next_sample_id("Greet"), 2);
        assert_eq!(allocator.next_sample_id("Respond"), 1);
        assert_eq!(allocator.next_sample_id("Greet"), 3);
    }

    #[test]
    fn test_shared_ids() {
        let allocator = SampleIdAllocator::with_scope(IdScope::Shared);
        assert_eq!(allocator.next_sample_id("Greet"), 1);
        assert_eq!(allocator.next_sample_id("Double"), 2);
        assert_eq!(allocator.next_sample_id("Greet"), 3);
    }
}
