use crate::container::ContainerID;
use crate::{cgroup, config, docker};

/// Errors that abort the process before or while monitoring.
///
/// Per-container read failures are not part of this type: they only close the affected
/// monitor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(#[from] config::Error),
    #[error("failed to discover containers: {0}")]
    Discovery(#[from] cgroup::Error),
    #[error("metadata unavailable for container `{id}`: {source}")]
    MetadataUnavailable {
        id: ContainerID,
        #[source]
        source: docker::Error,
    },
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}
