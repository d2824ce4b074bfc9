//! The worker engine and its HTTP control plane.

pub mod api;
pub mod stats;
pub mod types;
pub mod worker;

pub use api::router;
pub use stats::Stats;
pub use types::{TaskServer, Worker, WorkerError, WorkerResult};
pub use worker::{collect_stats, run_tasks};
