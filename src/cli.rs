//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;

/// Cube worker - runs tasks as containers and reports on them over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "cube-worker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address the task server binds to
    #[arg(long, env = "CUBE_HOST", default_value = "localhost")]
    pub host: String,

    /// Port the task server listens on
    #[arg(short, long, env = "CUBE_PORT", default_value_t = 5555)]
    pub port: u16,

    /// Worker name, used in logs
    #[arg(short, long, env = "CUBE_WORKER_NAME", default_value = "worker-1")]
    pub name: String,

    /// Seconds between task queue polls
    #[arg(long, env = "CUBE_POLL_INTERVAL", default_value_t = 10)]
    pub poll_interval: u64,

    /// Seconds between host stats refreshes
    #[arg(long, env = "CUBE_STATS_INTERVAL", default_value_t = 15)]
    pub stats_interval: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval.max(1))
    }
}
