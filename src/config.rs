//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cgroup::CgroupLayout;
use crate::docker::{self, DEFAULT_DOCKER_HOST, DockerHost};
use crate::monitor::{DEFAULT_CLOSED_SENTINEL, SupervisorSettings};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cgroup directory `{path}` doesn't exist")]
    MissingCgroupRoot { path: PathBuf },
    #[error("cgroup path `{path}` is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("failed to check cgroup path `{path}`: {source}")]
    ExistenceCheck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    DockerHost(#[from] docker::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Prints a synchronized per-second CPU usage series for every running docker container.
#[derive(Debug, Clone, Parser)]
#[command(name = "cpuacct-monitor", version, about)]
pub struct Config {
    /// Path to the cpuacct cgroup directory holding one subdirectory per container.
    /// Overrides the layout default.
    #[arg(long, env = "CPUACCT_CGROUP_PATH")]
    pub cgroup_path: Option<PathBuf>,

    /// Expect the systemd naming scheme (`docker-<id>.scope` below `system.slice`).
    #[arg(long, env = "CPUACCT_USE_SYSTEMD")]
    pub use_systemd: bool,

    /// Docker host (unix socket or tcp endpoint).
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_DOCKER_HOST)]
    pub docker_host: String,

    /// Sampling period in milliseconds.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// How long a tick waits for a container's sample, in milliseconds.
    /// Defaults to the sampling period.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub sample_timeout_ms: Option<u64>,

    /// Placeholder printed for containers that are no longer running.
    #[arg(long, default_value = DEFAULT_CLOSED_SENTINEL)]
    pub sentinel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cgroup_path: None,
            use_systemd: false,
            docker_host: DEFAULT_DOCKER_HOST.to_owned(),
            interval_ms: 1000,
            sample_timeout_ms: None,
            sentinel: DEFAULT_CLOSED_SENTINEL.to_owned(),
        }
    }
}

impl Config {
    pub fn layout(&self) -> CgroupLayout {
        if self.use_systemd {
            CgroupLayout::Systemd
        } else {
            CgroupLayout::Docker
        }
    }

    /// Returns the accounting root, i.e. the explicit path or the layout default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCgroupRoot`] if the path does not exist and
    /// [`Error::NotADirectory`] if it is not a directory.
    pub fn cgroup_root(&self) -> Result<PathBuf> {
        let path = self
            .cgroup_path
            .clone()
            .unwrap_or_else(|| self.layout().default_root().to_path_buf());

        let exists = path.try_exists().map_err(|source| Error::ExistenceCheck {
            path: path.clone(),
            source,
        })?;
        if !exists {
            return Err(Error::MissingCgroupRoot { path });
        }
        if !path.is_dir() {
            return Err(Error::NotADirectory { path });
        }

        Ok(path)
    }

    /// # Errors
    ///
    /// Returns [`Error::DockerHost`] if the endpoint scheme is not supported.
    pub fn docker_host(&self) -> Result<DockerHost> {
        Ok(self.docker_host.parse()?)
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        let interval = Duration::from_millis(self.interval_ms);
        SupervisorSettings {
            interval,
            sample_timeout: self
                .sample_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(interval),
            closed_sentinel: self.sentinel.clone(),
        }
    }
}
