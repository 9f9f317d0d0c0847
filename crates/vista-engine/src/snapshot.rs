use std::sync::{Arc, RwLock};

use crate::artifact::Artifact;

/// Holder of the live [`Artifact`].
///
/// Readers get an `Arc` to a complete artifact or `None` before the first
/// successful cycle. A swap replaces the pointer under a short write lock
/// and performs no I/O.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Artifact>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `artifact`, returning the one it replaced.
    pub fn swap(&self, artifact: Artifact) -> Option<Arc<Artifact>> {
        let next = Arc::new(artifact);
        self.current
            .write()
            .expect("lock poisoned")
            .replace(next)
    }

    /// The live artifact, if any cycle has succeeded yet.
    pub fn read(&self) -> Option<Arc<Artifact>> {
        self.current.read().expect("lock poisoned").clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.current.read().expect("lock poisoned").is_some()
    }
}
