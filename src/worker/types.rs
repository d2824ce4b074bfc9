use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::stats::Stats;
use crate::tasks::{ContainerRuntime, DockerError, State, Task};

/// A worker node: a FIFO of submitted tasks, the authoritative task store
/// and the runtime the tasks are executed on.
///
/// All state sits behind its own lock so request handlers and the driver
/// loop can share one `Arc<Worker>`.
pub struct Worker {
    pub name: String,
    pub(super) queue: Mutex<VecDeque<Task>>,
    pub(super) db: RwLock<HashMap<Uuid, Task>>,
    pub(super) stats: RwLock<Stats>,
    pub(super) runtime: Arc<dyn ContainerRuntime>,
    /// Held for the whole of a dispatch so at most one start/stop runs.
    pub(super) dispatch: Mutex<()>,
}

/// The HTTP control plane bound to one worker.
pub struct TaskServer {
    pub worker: Arc<Worker>,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("no tasks in the queue")]
    NoTasksInQueue,

    #[error("task {task_id}: invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        task_id: Uuid,
        from: State,
        to: State,
    },

    #[error("task {task_id}: {source}")]
    Docker {
        task_id: Uuid,
        #[source]
        source: DockerError,
    },
}

pub type WorkerResult<T> = Result<T, WorkerError>;
