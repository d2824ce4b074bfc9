use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sysinfo::System;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::stats::Stats;
use super::types::{Worker, WorkerError, WorkerResult};
use crate::tasks::{
    ContainerRuntime, DockerError, DockerResult, State, Task, docker, new_config,
    valid_state_transition,
};

impl Worker {
    pub fn new(name: &str, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Worker {
            name: name.to_string(),
            queue: Mutex::new(VecDeque::new()),
            db: RwLock::new(HashMap::new()),
            stats: RwLock::new(Stats::default()),
            runtime,
            dispatch: Mutex::new(()),
        }
    }

    /// Queues `task` for the driver loop. Transitions are checked at dispatch.
    pub async fn add_task(&self, task: Task) {
        self.queue.lock().await.push_back(task);
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn get_tasks(&self) -> Vec<Task> {
        self.db.read().await.values().cloned().collect()
    }

    pub async fn get_task(&self, id: Uuid) -> Option<Task> {
        self.db.read().await.get(&id).cloned()
    }

    pub async fn task_count(&self) -> usize {
        self.db.read().await.len()
    }

    pub async fn stats(&self) -> Stats {
        self.stats.read().await.clone()
    }

    /// Dequeues one task and drives it towards its requested state.
    ///
    /// A task seen for the first time is stored as dequeued before the
    /// transition check, so its own state is both source and target.
    pub async fn run_task(&self) -> WorkerResult<DockerResult> {
        let _dispatch = self.dispatch.lock().await;

        let task_queued = self
            .queue
            .lock()
            .await
            .pop_front()
            .ok_or(WorkerError::NoTasksInQueue)?;

        let task_persisted = self
            .db
            .write()
            .await
            .entry(task_queued.id)
            .or_insert_with(|| task_queued.clone())
            .clone();

        let invalid = WorkerError::InvalidStateTransition {
            task_id: task_queued.id,
            from: task_persisted.state,
            to: task_queued.state,
        };

        if !valid_state_transition(task_persisted.state, task_queued.state) {
            return Err(invalid);
        }

        match task_queued.state {
            State::Scheduled => self.start_task(task_queued).await,
            State::Completed => self.stop_task(task_persisted).await,
            _ => Err(invalid),
        }
    }

    async fn start_task(&self, mut task: Task) -> WorkerResult<DockerResult> {
        task.start_time = Some(Utc::now());
        let config = new_config(&task);

        let mut result = docker::run(self.runtime.as_ref(), &config).await;
        task.container_id = result.container_id.clone();

        if let Some(source) = result.error.take() {
            let task_id = task.id;
            task.state = State::Failed;
            task.end_time = Some(Utc::now());
            self.persist(task).await;
            return Err(WorkerError::Docker { task_id, source });
        }

        task.state = State::Running;
        self.persist(task).await;
        Ok(result)
    }

    async fn stop_task(&self, mut task: Task) -> WorkerResult<DockerResult> {
        let task_id = task.id;
        let Some(container_id) = task.container_id.clone() else {
            let source = DockerError::NoContainer(task_id);
            return Err(WorkerError::Docker { task_id, source });
        };

        let mut result = docker::stop(self.runtime.as_ref(), &container_id).await;
        if let Some(source) = result.error.take() {
            return Err(WorkerError::Docker { task_id, source });
        }

        task.state = State::Completed;
        task.finish_time = Some(Utc::now());
        self.persist(task).await;
        Ok(result)
    }

    async fn persist(&self, task: Task) {
        self.db.write().await.insert(task.id, task);
    }
}

/// Dispatches at most one queued task per tick until `shutdown` fires.
pub async fn run_tasks(worker: Arc<Worker>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        match worker.run_task().await {
            Ok(result) => info!(
                worker = %worker.name,
                action = result.action.as_deref().unwrap_or_default(),
                container_id = result.container_id.as_deref().unwrap_or_default(),
                "task dispatched"
            ),
            Err(WorkerError::NoTasksInQueue) => debug!(worker = %worker.name, "no tasks in queue"),
            Err(e) => error!(worker = %worker.name, error = %e, "task dispatch failed"),
        }
    }

    info!(worker = %worker.name, "task loop stopped");
}

/// Refreshes the worker's host stats snapshot every `period`.
pub async fn collect_stats(
    worker: Arc<Worker>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sys = System::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let task_count = worker.task_count().await;
        let stats = Stats::collect(&mut sys, task_count);
        debug!(
            worker = %worker.name,
            cpu_usage = stats.cpu_usage,
            mem_used_percent = stats.mem_used_percent(),
            task_count,
            "stats collected"
        );
        *worker.stats.write().await = stats;
    }

    info!(worker = %worker.name, "stats loop stopped");
}
