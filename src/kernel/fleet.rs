use super::error::KernelError;
use super::handle::RoverHandle;
use super::operation::Operation;
use super::rover::{Dispatch, RoverStatus};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of running rovers, keyed by name. Each rover keeps its own
/// task, so work on one never waits on another.
#[derive(Clone, Default)]
pub struct Fleet {
    rovers: Arc<DashMap<String, RoverHandle>>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle, replacing any rover with the same name.
    pub fn insert(&self, handle: RoverHandle) -> Option<RoverHandle> {
        let name = handle.name().to_string();
        info!(rover = %name, "Rover joined fleet");
        self.rovers.insert(name, handle)
    }

    pub fn remove(&self, name: &str) -> Option<RoverHandle> {
        self.rovers.remove(name).map(|(_, handle)| handle)
    }

    pub fn get(&self, name: &str) -> Option<RoverHandle> {
        self.rovers.get(name).map(|entry| entry.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rovers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.rovers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rovers.is_empty()
    }

    /// Dispatches to the named rover. An unknown name is reported as
    /// unavailable.
    pub async fn dispatch(&self, name: &str, operation: Operation) -> Result<Dispatch, KernelError> {
        // Clone out of the map so no shard lock is held across the await.
        let handle = self.get(name).ok_or(KernelError::RoverUnavailable)?;
        handle.dispatch(operation).await
    }

    /// Status of every reachable rover, sorted by name.
    pub async fn statuses(&self) -> Vec<RoverStatus> {
        let handles: Vec<RoverHandle> = self.rovers.iter().map(|e| e.value().clone()).collect();

        let mut statuses = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(status) = handle.status().await {
                statuses.push(status);
            }
        }
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}
