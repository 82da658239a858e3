use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::cgroup::{CgroupLayout, UsageSource};

mod error;
mod utils;

pub use error::{Error, Result};
pub use utils::is_systemd_scope;

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use cpuacct_monitor::container::{ContainerID, Error};
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or its length exceeds
    /// [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Derives the container id from the name of its accounting directory.
    ///
    /// With the default layout the directory is named after the container. Systemd
    /// wraps the id into a scope name (`docker-<id>.scope`), so the 64-character hex
    /// id is extracted from it instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingContainerID`] if the systemd scope name does not embed
    /// a full id, or [`Error::InvalidContainerID`] if the directory name is not a
    /// valid id.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cpuacct_monitor::cgroup::CgroupLayout;
    /// # use cpuacct_monitor::container::ContainerID;
    /// let id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
    /// let scope = format!("docker-{id}.scope");
    /// let parsed = ContainerID::from_dir_name(&scope, CgroupLayout::Systemd).unwrap();
    /// assert_eq!(parsed.as_ref(), id);
    /// ```
    pub fn from_dir_name(name: &str, layout: CgroupLayout) -> Result<Self> {
        match layout {
            CgroupLayout::Docker => Self::new(name),
            CgroupLayout::Systemd => utils::find_full_id(name)
                .ok_or_else(|| Error::MissingContainerID(name.to_owned()))
                .and_then(Self::new),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A container selected for monitoring at startup.
///
/// Handles are immutable for the lifetime of the process. The slot a handle occupies
/// in the output is fixed by its position in the discovery order.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    id: ContainerID,
    label: String,
    source: UsageSource,
}

impl ContainerHandle {
    pub fn new(id: ContainerID, label: impl Into<String>, source: UsageSource) -> Self {
        Self {
            id,
            label: label.into(),
            source,
        }
    }

    pub fn id(&self) -> &ContainerID {
        &self.id
    }

    /// Column header printed for this container.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Locator of the container's cumulative CPU-time counter.
    pub fn source(&self) -> &UsageSource {
        &self.source
    }
}
