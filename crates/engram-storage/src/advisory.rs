//! Advisory lock registry.
//!
//! Two keyspaces: per-memory-id locks serializing writes to a single
//! memory, and per-project run guards held across a consolidation run.
//! Constructed once by the composition root and injected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

/// Process-wide advisory locks.
#[derive(Default)]
pub struct AdvisoryLocks {
    memory_locks: DashMap<String, Arc<Mutex<()>>>,
    project_guards: DashMap<String, Arc<AtomicBool>>,
}

impl AdvisoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock serializing writes to one memory id. Callers hold the
    /// returned mutex for the duration of the write.
    pub fn memory(&self, memory_id: &str) -> Arc<Mutex<()>> {
        self.memory_locks
            .entry(memory_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Try to take the per-project run guard without blocking. Returns
    /// None when a consolidation run already holds it.
    pub fn try_project(&self, project_id: &str) -> Option<ProjectGuard> {
        let flag = self
            .project_guards
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();

        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(ProjectGuard { flag })
        } else {
            None
        }
    }

    /// Whether a consolidation run currently holds the project guard.
    pub fn project_held(&self, project_id: &str) -> bool {
        self.project_guards
            .get(project_id)
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Released on drop.
pub struct ProjectGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
