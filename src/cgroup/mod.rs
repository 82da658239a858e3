//! CPU accounting through the Linux cgroup filesystem.
//!
//! This module finds the per-container accounting directories below a cgroup root and
//! reads their cumulative CPU-time counters.
//!
//! # Key Components
//!
//! - [`CgroupLayout`]: How container directories are named below the root.
//! - [`discover`]: One-shot enumeration of the containers present at startup.
//! - [`UsageSource`]: Locator of one container's counter file, implementing [`UsageReader`].
//!
//! # Supported Files
//!
//! - `cpuacct.usage` (cgroup v1, nanoseconds)
//! - `cpu.stat` (cgroup v2, `usage_usec`)
mod discovery;
mod error;
mod usage;

pub use discovery::{
    CgroupLayout, DOCKER_CGROUP_PATH, DiscoveredContainer, SYSTEMD_CGROUP_PATH, discover,
};
pub use error::{Error, ParseError, Result};
pub use usage::{UsageReader, UsageSample, UsageSource};
