use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when listing a directory fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to list directory `{path}`: {source}")]
pub struct ReadDirError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cpuacct_monitor::fsutil;
/// let reader = fsutil::open_file_reader("/sys/fs/cgroup/cpuacct/docker/cpuacct.usage")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Lists the immediate subdirectories of `path` as `(file name, full path)` pairs,
/// sorted by file name.
///
/// Symlinks are not followed.
///
/// # Errors
///
/// Returns a [`ReadDirError`] if the directory or one of its entries cannot be read.
pub fn list_subdirectories(
    path: impl AsRef<Path>,
) -> Result<Vec<(OsString, PathBuf)>, ReadDirError> {
    let path = path.as_ref();
    let to_err = |source| ReadDirError {
        path: path.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path).map_err(to_err)? {
        let entry = entry.map_err(to_err)?;
        if entry.file_type().map_err(to_err)?.is_dir() {
            dirs.push((entry.file_name(), entry.path()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(dirs)
}
