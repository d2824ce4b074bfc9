//! Worker node of a small container orchestrator.
//!
//! Tasks arrive over HTTP, wait in a queue, and are driven one at a time
//! through their lifecycle as Docker containers.

pub mod cli;
pub mod logging;
pub mod tasks;
pub mod worker;
