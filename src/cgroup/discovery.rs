use std::path::Path;

use crate::container::{self, ContainerID};
use crate::fsutil;

use super::Result;
use super::usage::UsageSource;

/// Default cpuacct hierarchy used by docker's cgroupfs driver.
pub const DOCKER_CGROUP_PATH: &str = "/sys/fs/cgroup/cpuacct/docker";
/// Default cpuacct hierarchy used by docker's systemd driver.
pub const SYSTEMD_CGROUP_PATH: &str = "/sys/fs/cgroup/cpuacct/system.slice";

/// Naming scheme of the per-container directories below the accounting root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CgroupLayout {
    /// One directory per container, named after the container id.
    #[default]
    Docker,
    /// Systemd scopes named `docker-<id>.scope` next to unrelated services.
    Systemd,
}

impl CgroupLayout {
    /// Accounting root used when no explicit path is configured.
    pub fn default_root(&self) -> &'static Path {
        match self {
            Self::Docker => Path::new(DOCKER_CGROUP_PATH),
            Self::Systemd => Path::new(SYSTEMD_CGROUP_PATH),
        }
    }
}

/// A container directory found below the accounting root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredContainer {
    pub id: ContainerID,
    pub source: UsageSource,
}

/// Enumerates the containers below `root` once, in file-name order.
///
/// Directories are skipped if they do not match the layout, no container id can be
/// derived from their name, or they contain no CPU accounting file.
///
/// # Errors
///
/// Returns [`super::Error::ReadDir`] if `root` cannot be listed.
pub fn discover(root: impl AsRef<Path>, layout: CgroupLayout) -> Result<Vec<DiscoveredContainer>> {
    let root = root.as_ref();
    let mut containers = Vec::new();

    for (name, dir) in fsutil::list_subdirectories(root)? {
        let Some(name) = name.to_str() else {
            log::debug!("Skipping non UTF-8 directory `{}`", dir.display());
            continue;
        };

        if layout == CgroupLayout::Systemd && !container::is_systemd_scope(name) {
            continue;
        }

        let id = match ContainerID::from_dir_name(name, layout) {
            Ok(id) => id,
            Err(err) => {
                log::debug!("Skipping `{}`: {}", dir.display(), err);
                continue;
            }
        };

        let Some(source) = UsageSource::detect(&dir) else {
            log::debug!("Skipping `{}`: no cpu accounting file", dir.display());
            continue;
        };

        log::debug!(
            "Discovered container `{}` at `{}`",
            id,
            source.path().display()
        );
        containers.push(DiscoveredContainer { id, source });
    }

    Ok(containers)
}
