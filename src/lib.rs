use std::path::Path;

use cgroup::CgroupLayout;
use container::ContainerHandle;
use docker::{DockerInspector, MetadataProvider};
use lifecycle::Shutdown;
use monitor::Supervisor;

/// Cpuacct Monitor: prints a synchronized CPU usage time series for running containers.
///
/// The containers present at startup are discovered through the cpuacct cgroup
/// hierarchy and labelled from docker metadata. One monitor task per container samples
/// its cumulative CPU-time counter whenever the supervisor's clock ticks, and the
/// supervisor prints one row per tick until the process is interrupted.
pub mod cgroup;
pub mod config;
pub mod container;
pub mod docker;
pub mod error;
pub mod fsutil;
pub mod lifecycle;
pub mod monitor;

pub use error::{Error, Result};

/// Discovers the containers below `root` and resolves their column labels.
///
/// The returned handles keep the discovery order.
///
/// # Errors
///
/// - [`Error::Discovery`] if `root` cannot be listed.
/// - [`Error::MetadataUnavailable`] if the metadata of any container cannot be fetched.
pub async fn resolve_containers<P>(
    root: impl AsRef<Path>,
    layout: CgroupLayout,
    provider: &P,
) -> Result<Vec<ContainerHandle>>
where
    P: MetadataProvider,
{
    let discovered = cgroup::discover(root, layout)?;
    let mut handles = Vec::with_capacity(discovered.len());

    for container in discovered {
        let metadata =
            provider
                .metadata(&container.id)
                .await
                .map_err(|source| Error::MetadataUnavailable {
                    id: container.id.clone(),
                    source,
                })?;
        let label = metadata.label();
        log::debug!(
            "Container `{}`: command=`{}`, cpu_shares={}, label={}",
            container.id,
            metadata.command,
            metadata.cpu_shares,
            label
        );
        handles.push(ContainerHandle::new(container.id, label, container.source));
    }

    Ok(handles)
}

/// Runs the monitor until SIGINT, SIGTERM or SIGQUIT.
///
/// # Errors
///
/// Possible errors include:
/// - [`Error::ConfigurationInvalid`] if the cgroup root is missing or the docker host
///   is not supported.
/// - [`Error::Discovery`] or [`Error::MetadataUnavailable`] during startup.
/// - [`Error::Signal`] if signal handlers cannot be installed.
/// - [`Error::Output`] if stdout cannot be written.
pub async fn run(config: config::Config) -> Result<()> {
    let root = config.cgroup_root()?;
    log::debug!("Final cgroup root: {}", root.display());
    let host = config.docker_host()?;
    log::debug!("Docker host: {:?}", host);

    let inspector = DockerInspector::new(&host);
    let handles = resolve_containers(&root, config.layout(), &inspector).await?;
    if handles.is_empty() {
        log::warn!("No containers found below `{}`", root.display());
    }

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_handler(shutdown.clone()).map_err(Error::Signal)?;

    let supervisor = Supervisor::spawn(
        handles,
        config.supervisor_settings(),
        std::io::stdout(),
        &shutdown,
    );
    let rows = lifecycle::run_until_stopped(supervisor, &shutdown)
        .await
        .map_err(Error::Output)?;
    log::info!("Stopped after {} rows", rows);

    Ok(())
}
