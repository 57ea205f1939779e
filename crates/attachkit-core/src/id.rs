use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Allocates timestamp-shaped attachment ids.
///
/// Ids are the current time in milliseconds, bumped past the previous id
/// when two allocations land in the same millisecond (or the clock steps
/// back), so ids from one generator are strictly increasing.
#[derive(Debug, Default)]
pub struct AttachmentIdGenerator {
    last: AtomicI64,
}

impl AttachmentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    fn next_at(&self, now_millis: i64) -> i64 {
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_millis.max(prev + 1)
    }
}
