use std::future::Future;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use super::stats::Stats;
use super::types::{TaskServer, Worker};
use crate::tasks::{State, Task, TaskEvent};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrResponse {
    pub error: String,
}

/// Builds the worker's control-plane routes.
pub fn router(worker: Arc<Worker>) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks).post(start_task))
        .route("/tasks/", delete(missing_task_id))
        .route("/tasks/{id}", delete(stop_task))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}

impl TaskServer {
    pub fn new(worker: Arc<Worker>, address: &str, port: u16) -> Self {
        Self {
            worker,
            address: address.to_string(),
            port,
        }
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn start_server<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = format!("{}:{}", self.address, self.port);
        let listener = TcpListener::bind(&address).await?;
        info!(worker = %self.worker.name, %address, "task server listening");

        axum::serve(listener, router(self.worker))
            .with_graceful_shutdown(shutdown)
            .await
    }
}

// Decoded by hand so every malformed body is a 400 with a JSON error.
async fn start_task(AxumState(worker): AxumState<Arc<Worker>>, body: Bytes) -> Response {
    let event: TaskEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejected task event");
            let error = format!("error decoding task event: {e}");
            return (StatusCode::BAD_REQUEST, Json(ErrResponse { error })).into_response();
        }
    };

    worker.add_task(event.clone().into_task()).await;
    info!(task_id = %event.task.id, state = ?event.state, "task queued");

    (StatusCode::OK, Json(event)).into_response()
}

async fn get_tasks(AxumState(worker): AxumState<Arc<Worker>>) -> Json<Vec<Task>> {
    Json(worker.get_tasks().await)
}

async fn missing_task_id() -> StatusCode {
    warn!("stop requested without a task id");
    StatusCode::BAD_REQUEST
}

/// Queues a request to complete the task; the container stops later.
async fn stop_task(
    AxumState(worker): AxumState<Arc<Worker>>,
    Path(id): Path<String>,
) -> StatusCode {
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(e) => {
            warn!(task_id = %id, error = %e, "invalid task id");
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(task) = worker.get_task(id).await else {
        warn!(task_id = %id, "task not found");
        return StatusCode::NOT_FOUND;
    };

    worker
        .add_task(Task {
            state: State::Completed,
            ..task
        })
        .await;
    info!(task_id = %id, "task queued to stop");

    StatusCode::NO_CONTENT
}

async fn get_stats(AxumState(worker): AxumState<Arc<Worker>>) -> Json<Stats> {
    Json(worker.stats().await)
}
