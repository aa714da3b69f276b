//! Identifier allocation
//!
//! Reproducible identifiers for batches and other generated artifacts:
//! a monotonic counter per prefix, or a digest of the request content.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

/// Monotonic, prefixed identifier allocator.
///
/// Thread-safe; identifiers are unique per allocator instance and start at 1.
#[derive(Debug)]
pub struct IdAllocator {
    prefix: String,
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next identifier, e.g. `batch-000001`
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:06}", self.prefix, n)
    }

    /// Number of identifiers handed out so far
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

/// Content-derived identifier: prefix plus the first 16 hex digits of SHA-256
pub fn content_id(prefix: &str, content: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(content));
    format!("{}-{}", prefix, &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let ids = IdAllocator::new("batch");
        assert_eq!(ids.next_id(), "batch-000001");
        assert_eq!(ids.next_id(), "batch-000002");
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_allocators_are_independent() {
        let a = IdAllocator::new("a");
        let b = IdAllocator::new("b");
        a.next_id();
        assert_eq!(b.next_id(), "b-000001");
    }

    #[test]
    fn test_content_id_is_reproducible() {
        let first = content_id("gen", b"GET /users");
        let second = content_id("gen", b"GET /users");
        assert_eq!(first, second);
        assert_ne!(first, content_id("gen", b"GET /orders"));
        assert!(first.starts_with("gen-"));
        assert_eq!(first.len(), "gen-".len() + 16);
    }
}
