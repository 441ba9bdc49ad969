//! Identity of the threads that record commands and request descriptor sets.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};

/// Totally ordered identity of a worker thread. Each worker gets its own set cache and pool blocks for every
/// layout, so sets are never shared between workers.
///
/// Ids can be picked by the caller, for example the index of a worker in a job system, or handed out
/// automatically with [`WorkerId::current`]. Do not mix both schemes in one factory, the automatic ids
/// could collide with chosen ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u32);

static NEXT_WORKER: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static CURRENT_WORKER: WorkerId = WorkerId(NEXT_WORKER.fetch_add(1, Ordering::Relaxed));
}

impl WorkerId {
    /// Id of the calling thread. Stable for the lifetime of the thread and unique in the process.
    pub fn current() -> Self {
        CURRENT_WORKER.with(|id| *id)
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker {}", self.0)
    }
}
