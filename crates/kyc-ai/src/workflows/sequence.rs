use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic identifier source owned by a single service instance.
#[derive(Debug)]
pub struct IdSequence {
    prefix: &'static str,
    next: AtomicU64,
}

impl IdSequence {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> String {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{id:06}", self.prefix)
    }
}
