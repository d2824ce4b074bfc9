//! Task model, state machine and the container runtime adapter.

pub mod docker;
pub mod runtime;
pub mod state;
pub mod types;

pub use runtime::ContainerRuntime;
pub use state::valid_state_transition;
pub use types::{Config, DockerError, DockerResult, State, Task, TaskEvent, new_config};
