use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    #[default]
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl State {
    pub const ALL: [State; 5] = [
        State::Pending,
        State::Scheduled,
        State::Running,
        State::Completed,
        State::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Completed | State::Failed)
    }
}

/// One container's desired and observed lifecycle.
///
/// Every field defaults when missing from a request body, so a bare
/// `{"id": "..."}` addresses an existing task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Task {
    pub id: Uuid,
    pub container_id: Option<String>,
    pub name: String,
    pub state: State,
    pub image: String,
    /// Fractional cores.
    pub cpu: f64,
    /// Bytes.
    pub memory: i64,
    /// Bytes.
    pub disk: i64,
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    /// Port specs such as `80/tcp`.
    pub exposed_ports: Vec<String>,
    pub port_bindings: HashMap<String, String>,
    pub restart_policy: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(name: &str, image: &str) -> Self {
        Task {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image: image.to_string(),
            state: State::Scheduled,
            ..Default::default()
        }
    }
}

/// A request to move `task` to `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEvent {
    pub id: Uuid,
    pub state: State,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub task: Task,
}

impl TaskEvent {
    pub fn new(state: State, task: Task) -> Self {
        TaskEvent {
            id: Uuid::new_v4(),
            state,
            timestamp: Utc::now(),
            task,
        }
    }

    /// The task to enqueue: the embedded snapshot with the requested state.
    pub fn into_task(self) -> Task {
        Task {
            state: self.state,
            ..self.task
        }
    }
}

/// Container settings derived from a [`Task`] at dispatch time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub name: String,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub exposed_ports: Vec<String>,
    pub cmd: Vec<String>,
    pub image: String,
    pub cpu: f64,
    pub memory: i64,
    pub disk: i64,
    pub env: Vec<String>,
    pub restart_policy: String,
}

pub fn new_config(task: &Task) -> Config {
    Config {
        name: task.name.clone(),
        attach_stdout: true,
        attach_stderr: true,
        exposed_ports: task.exposed_ports.clone(),
        cmd: task.cmd.clone(),
        image: task.image.clone(),
        cpu: task.cpu,
        memory: task.memory,
        disk: task.disk,
        env: task.env.clone(),
        restart_policy: task.restart_policy.clone(),
        ..Default::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("error pulling image {image}: {source}")]
    Pull {
        image: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("error creating container: {0}")]
    Create(#[source] bollard::errors::Error),

    #[error("error starting container {container_id}: {source}")]
    Start {
        container_id: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("error stopping container {container_id}: {source}")]
    Stop {
        container_id: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("error removing container {container_id}: {source}")]
    Remove {
        container_id: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("task {0} has no container")]
    NoContainer(Uuid),
}

/// Outcome of a start or stop against the container runtime.
///
/// `container_id` is filled in as soon as the runtime assigns one, even when
/// a later phase fails, so the caller can still clean up.
#[derive(Debug, Default)]
pub struct DockerResult {
    pub error: Option<DockerError>,
    pub action: Option<String>,
    pub container_id: Option<String>,
    pub result: Option<String>,
}
