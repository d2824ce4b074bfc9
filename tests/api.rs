//! Control-plane tests: the axum router is driven in-process against a
//! worker whose runtime always succeeds.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use bollard::errors::Error;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use cube_worker::tasks::{Config, ContainerRuntime, State, Task, TaskEvent};
use cube_worker::worker::{Stats, Worker, router};

struct NoopRuntime;

#[async_trait]
impl ContainerRuntime for NoopRuntime {
    async fn pull_image(&self, _image: &str) -> Result<(), Error> {
        Ok(())
    }
    async fn create_container(&self, config: &Config) -> Result<String, Error> {
        Ok(format!("{}-container", config.name))
    }
    async fn start_container(&self, _container_id: &str) -> Result<(), Error> {
        Ok(())
    }
    async fn container_logs(&self, _container_id: &str) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }
    async fn stop_container(&self, _container_id: &str) -> Result<(), Error> {
        Ok(())
    }
    async fn remove_container(&self, _container_id: &str) -> Result<(), Error> {
        Ok(())
    }
}

fn setup() -> (Arc<Worker>, Router) {
    let worker = Arc::new(Worker::new("api-test", Arc::new(NoopRuntime)));
    let app = router(worker.clone());
    (worker, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn lists_no_tasks_on_start() {
    let (_worker, app) = setup();

    let (status, body) = send(&app, Method::GET, "/tasks", None).await;

    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn post_echoes_event_and_queues_task() {
    let (worker, app) = setup();
    let event = TaskEvent::new(State::Scheduled, Task::new("web", "busybox"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(serde_json::to_string(&event).unwrap()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let echoed: TaskEvent = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed, event);
    assert_eq!(worker.queue_len().await, 1);
    assert!(worker.get_tasks().await.is_empty());
}

#[tokio::test]
async fn post_rejects_unknown_fields() {
    let (worker, app) = setup();
    let body = json!({
        "id": Uuid::new_v4(),
        "state": "Scheduled",
        "task": { "id": Uuid::new_v4(), "image": "busybox" },
        "priority": 1
    });

    let (status, body) = send(&app, Method::POST, "/tasks", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].as_str().unwrap().starts_with("error decoding task event"));
    assert_eq!(worker.queue_len().await, 0);
}

#[tokio::test]
async fn post_rejects_malformed_json() {
    let (_worker, app) = setup();

    let (status, body) = send(&app, Method::POST, "/tasks", Some("{not json".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].is_string());
}

#[tokio::test]
async fn delete_unknown_task_is_not_found() {
    let (_worker, app) = setup();

    let uri = format!("/tasks/{}", Uuid::new_v4());
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_a_valid_uuid() {
    let (_worker, app) = setup();

    let (bad, _) = send(&app, Method::DELETE, "/tasks/not-a-uuid", None).await;
    let (missing, _) = send(&app, Method::DELETE, "/tasks/", None).await;

    assert_eq!(bad, StatusCode::BAD_REQUEST);
    assert_eq!(missing, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_queues_completion_of_running_task() {
    let (worker, app) = setup();
    let task = Task::new("web", "busybox");
    worker.add_task(task.clone()).await;
    worker.run_task().await.unwrap();

    let uri = format!("/tasks/{}", task.id);
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    // Stopping is asynchronous: the task is still running until dispatch.
    assert_eq!(worker.get_task(task.id).await.unwrap().state, State::Running);
    assert_eq!(worker.queue_len().await, 1);

    worker.run_task().await.unwrap();
    let stopped = worker.get_task(task.id).await.unwrap();
    assert_eq!(stopped.state, State::Completed);
    assert_eq!(stopped.container_id.as_deref(), Some("web-container"));
}

#[tokio::test]
async fn submitted_then_listed() {
    let (worker, app) = setup();
    let event = TaskEvent::new(State::Scheduled, Task::new("job", "busybox"));
    send(&app, Method::POST, "/tasks", Some(serde_json::to_string(&event).unwrap())).await;
    worker.run_task().await.unwrap();

    let (status, body) = send(&app, Method::GET, "/tasks", None).await;

    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, event.task.id);
    assert_eq!(tasks[0].state, State::Running);
}

#[tokio::test]
async fn stats_snapshot_is_served() {
    let (_worker, app) = setup();

    let (status, body) = send(&app, Method::GET, "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    let stats: Stats = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats.task_count, 0);
}
