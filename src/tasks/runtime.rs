use async_trait::async_trait;
use bollard::errors::Error;

use super::types::Config;

/// The primitive calls the worker makes against a container runtime.
///
/// The create/start/stop/remove protocol lives in [`super::docker`] and is
/// written once against this trait.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str) -> Result<(), Error>;

    /// Returns the runtime-assigned container ID.
    async fn create_container(&self, config: &Config) -> Result<String, Error>;

    async fn start_container(&self, container_id: &str) -> Result<(), Error>;

    /// Combined stdout/stderr output produced so far, one entry per frame.
    async fn container_logs(&self, container_id: &str) -> Result<Vec<String>, Error>;

    async fn stop_container(&self, container_id: &str) -> Result<(), Error>;

    /// Forced removal, including attached volumes but not linked containers.
    async fn remove_container(&self, container_id: &str) -> Result<(), Error>;
}
