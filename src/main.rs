use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use cube_worker::cli::Cli;
use cube_worker::logging;
use cube_worker::tasks::docker::DockerClient;
use cube_worker::worker::{TaskServer, Worker, collect_stats, run_tasks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let docker = DockerClient::connect().context("connecting to docker")?;
    if let Err(e) = docker.ping().await {
        warn!(error = %e, "docker daemon did not answer ping");
    }

    let worker = Arc::new(Worker::new(&cli.name, Arc::new(docker)));
    info!(worker = %worker.name, "starting worker");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks_loop = tokio::spawn(run_tasks(
        worker.clone(),
        cli.poll_interval(),
        shutdown_rx.clone(),
    ));
    let stats_loop = tokio::spawn(collect_stats(
        worker.clone(),
        cli.stats_interval(),
        shutdown_rx,
    ));

    let server = TaskServer::new(worker, &cli.host, cli.port);
    server
        .start_server(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            let _ = shutdown_tx.send(true);
        })
        .await
        .with_context(|| format!("serving on {}:{}", cli.host, cli.port))?;

    let (tasks_result, stats_result) = tokio::join!(tasks_loop, stats_loop);
    if let Err(e) = tasks_result {
        error!(error = %e, "task loop aborted");
    }
    if let Err(e) = stats_result {
        error!(error = %e, "stats loop aborted");
    }
    Ok(())
}
