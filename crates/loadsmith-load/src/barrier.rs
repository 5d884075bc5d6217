use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts finished loader units and elects the one that fires the
/// after-load hook.
///
/// Arrival is a single `fetch_add`, so exactly one caller observes the count
/// reaching `total`, regardless of the order in which units finish.
#[derive(Debug)]
pub struct CompletionBarrier {
    total: usize,
    finished: AtomicUsize,
}

impl CompletionBarrier {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            finished: AtomicUsize::new(0),
        }
    }

    /// Record one finished unit. Returns `true` for the final arrival only.
    pub fn arrive(&self) -> bool {
        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        finished == self.total
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.finished() >= self.total
    }
}
