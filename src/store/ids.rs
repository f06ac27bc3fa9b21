//! Id allocation for generated resource URIs.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of local ids appended to the data namespace.
///
/// Allocators need not guarantee global uniqueness: the store retries until
/// the resulting URI is unused.
pub trait IdAllocator: Send + Sync {
    /// The next candidate id.
    fn next_id(&self) -> String;
}

/// Random UUID v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Ever-increasing `<prefix><n>` ids, starting at 1.
#[derive(Debug)]
pub struct SequentialAllocator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialAllocator {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    #[must_use]
    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(first),
        }
    }
}

impl IdAllocator for SequentialAllocator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_increase() {
        let ids = SequentialAllocator::new("id");
        assert_eq!(ids.next_id(), "id1");
        assert_eq!(ids.next_id(), "id2");
    }

    #[test]
    fn uuid_ids_are_distinct() {
        let ids = UuidAllocator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
