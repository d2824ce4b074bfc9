use std::collections::HashMap;
use std::pin::pin;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config as ContainerConfig, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
        StartContainerOptions,
    },
    errors::Error,
    image::CreateImageOptions,
    models::{HostConfig, RestartPolicy, RestartPolicyNameEnum},
};
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use super::runtime::ContainerRuntime;
use super::types::{Config, DockerError, DockerResult};

impl DockerResult {
    pub fn with_error(err: DockerError, container_id: Option<String>) -> Self {
        DockerResult {
            container_id,
            action: None,
            result: None,
            error: Some(err),
        }
    }

    pub fn success(container_id: String, action: &str) -> Self {
        DockerResult {
            container_id: Some(container_id),
            action: Some(action.to_string()),
            result: Some("success".to_string()),
            error: None,
        }
    }
}

/// Translates a task's runtime config into a container create request.
///
/// Resource values are passed through as-is: memory is a byte ceiling and
/// fractional cores become nano-CPUs.
pub fn container_config(config: &Config) -> ContainerConfig<String> {
    let restart_policy = RestartPolicy {
        name: Some(
            config
                .restart_policy
                .parse::<RestartPolicyNameEnum>()
                .unwrap_or(RestartPolicyNameEnum::NO),
        ),
        maximum_retry_count: None,
    };

    let host_config = HostConfig {
        restart_policy: Some(restart_policy),
        memory: Some(config.memory),
        nano_cpus: Some((config.cpu * 1_000_000_000.0) as i64),
        publish_all_ports: Some(true),
        ..Default::default()
    };

    ContainerConfig {
        image: Some(config.image.clone()),
        cmd: (!config.cmd.is_empty()).then(|| config.cmd.clone()),
        env: Some(config.env.clone()),
        exposed_ports: Some(
            config
                .exposed_ports
                .iter()
                .map(|port| (port.clone(), HashMap::new()))
                .collect(),
        ),
        attach_stdin: Some(config.attach_stdin),
        attach_stdout: Some(config.attach_stdout),
        attach_stderr: Some(config.attach_stderr),
        tty: Some(false),
        host_config: Some(host_config),
        ..Default::default()
    }
}

/// Pins an untagged image reference to `latest`.
///
/// The daemon pulls every tag of a repository when the reference names
/// neither a tag nor a digest.
pub fn pull_reference(image: &str) -> String {
    let name = image.rsplit('/').next().unwrap_or(image);
    if name.contains(':') || name.contains('@') {
        image.to_string()
    } else {
        format!("{image}:latest")
    }
}

/// Pulls the image, then creates and starts a container for `config`.
pub async fn run(runtime: &dyn ContainerRuntime, config: &Config) -> DockerResult {
    if let Err(source) = runtime.pull_image(&config.image).await {
        let image = config.image.clone();
        return DockerResult::with_error(DockerError::Pull { image, source }, None);
    }

    let container_id = match runtime.create_container(config).await {
        Ok(id) => id,
        Err(e) => return DockerResult::with_error(DockerError::Create(e), None),
    };
    debug!(container_id = %container_id, name = %config.name, "container created");

    if let Err(source) = runtime.start_container(&container_id).await {
        let err = DockerError::Start {
            container_id: container_id.clone(),
            source,
        };
        return DockerResult::with_error(err, Some(container_id));
    }

    // Output is best-effort; the container is already running.
    match runtime.container_logs(&container_id).await {
        Ok(lines) => {
            for line in lines {
                info!(container_id = %container_id, "{}", line.trim_end());
            }
        }
        Err(e) => warn!(container_id = %container_id, error = %e, "could not read container logs"),
    }

    DockerResult::success(container_id, "start")
}

/// Stops the container, then force-removes it along with its volumes.
pub async fn stop(runtime: &dyn ContainerRuntime, container_id: &str) -> DockerResult {
    if let Err(source) = runtime.stop_container(container_id).await {
        let err = DockerError::Stop {
            container_id: container_id.to_string(),
            source,
        };
        return DockerResult::with_error(err, Some(container_id.to_string()));
    }

    // A failed removal still leaves the container stopped.
    if let Err(source) = runtime.remove_container(container_id).await {
        let err = DockerError::Remove {
            container_id: container_id.to_string(),
            source,
        };
        return DockerResult::with_error(err, Some(container_id.to_string()));
    }

    DockerResult::success(container_id.to_string(), "stop")
}

/// [`ContainerRuntime`] backed by the local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerClient {
    client: Docker,
}

impl DockerClient {
    /// Connects using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self, Error> {
        Ok(DockerClient {
            client: Docker::connect_with_local_defaults()?,
        })
    }

    pub async fn ping(&self) -> Result<(), Error> {
        self.client.ping().await.map(|_| ())
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn pull_image(&self, image: &str) -> Result<(), Error> {
        let options = CreateImageOptions {
            from_image: pull_reference(image),
            ..Default::default()
        };
        let mut stream = pin!(self.client.create_image(Some(options), None, None));

        while let Some(msg) = stream.next().await {
            if let Some(status) = msg?.status {
                debug!(image, %status, "pulling image");
            }
        }

        Ok(())
    }

    async fn create_container(&self, config: &Config) -> Result<String, Error> {
        let options = (!config.name.is_empty()).then(|| CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        });

        let response = self
            .client
            .create_container(options, container_config(config))
            .await?;

        Ok(response.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<(), Error> {
        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
    }

    async fn container_logs(&self, container_id: &str) -> Result<Vec<String>, Error> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut stream = pin!(self.client.logs(container_id, Some(options)));

        let mut lines = Vec::new();
        while let Some(frame) = stream.next().await {
            lines.push(frame?.to_string());
        }

        Ok(lines)
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), Error> {
        self.client.stop_container(container_id, None).await
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), Error> {
        let options = RemoveContainerOptions {
            v: true,
            force: true,
            link: false,
        };
        self.client
            .remove_container(container_id, Some(options))
            .await
    }
}
