//! Resource management

use crate::error::DataServerError;

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] provides a simple way to allocate various resources
/// to tasks. Resource management is performed using a Tokio Semaphore for each type of resource.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for tasks.
    tasks: Option<Semaphore>,

    /// Single permit serialising dataset access.
    dataset_reads: Arc<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(task_limit: Option<usize>) -> Self {
        Self {
            tasks: task_limit.map(Semaphore::new),
            dataset_reads: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire a task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit>, DataServerError> {
        optional_acquire(&self.tasks).await
    }

    /// Acquire the global dataset read lock.
    ///
    /// The permit is owned so that it can move into the blocking task that reads the dataset,
    /// and is released when that task finishes.
    pub async fn dataset_read(&self) -> Result<OwnedSemaphorePermit, DataServerError> {
        Ok(self.dataset_reads.clone().acquire_owned().await?)
    }
}

/// Acquire a permit on an optional Semaphore, if present.
async fn optional_acquire(
    sem: &Option<Semaphore>,
) -> Result<Option<SemaphorePermit>, DataServerError> {
    if let Some(sem) = sem {
        sem.acquire().await.map(Some).map_err(|err| err.into())
    } else {
        Ok(None)
    }
}
