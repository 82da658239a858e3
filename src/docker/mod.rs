//! Container metadata from the docker engine API.
//!
//! The sampling engine only needs a human-readable column label per container. It is
//! derived from the container's command line and configured CPU shares, which are
//! fetched once at startup through `GET /containers/{id}/json`.
mod client;
mod connector;
mod error;
mod label;
mod models;

pub use client::{DEFAULT_DOCKER_HOST, DockerClient, DockerHost, DockerInspector};
pub use connector::{TcpConnector, UnixConnector};
pub use error::{Error, Result};
pub use label::ContainerMetadata;
pub use models::ContainerInspect;

use crate::container::ContainerID;

/// Source of runtime metadata for discovered containers.
pub trait MetadataProvider {
    /// Looks up the command line and CPU shares of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be reached or does not know the container.
    fn metadata(
        &self,
        id: &ContainerID,
    ) -> impl Future<Output = Result<ContainerMetadata>> + Send;
}
