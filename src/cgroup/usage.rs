//! Point-in-time reads of a container's cumulative CPU-time counter.
//!
//! Two accounting formats are understood:
//!
//! - **cgroup v1** `cpuacct.usage`: a single integer, in nanoseconds.
//! - **cgroup v2** `cpu.stat`: whitespace-separated key/value lines. The `usage_usec`
//!   entry is converted to nanoseconds.
//!
//! Every read re-opens the file by path and reads it once. A container that exits
//! takes its cgroup directory with it, so a missing file surfaces as
//! [`Error::SourceUnavailable`] rather than as stale data from a still-open
//! descriptor.
//!
//! # Examples
//!
//! ```rust
//! use cpuacct_monitor::cgroup::{UsageReader, UsageSource};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("cpuacct.usage"), "1500000000\n").unwrap();
//!
//! let mut source = UsageSource::detect(dir.path()).unwrap();
//! assert_eq!(source.read_usage().unwrap().usage_ns, 1_500_000_000);
//! ```

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::error::{Error, ParseError, Result};
use crate::fsutil;

const CPUACCT_USAGE_FILE: &str = "cpuacct.usage";
const CPU_STAT_FILE: &str = "cpu.stat";
const CPU_STAT_USAGE_KEY: &str = "usage_usec";
const NANOS_PER_MICRO: u64 = 1_000;

/// One reading of a cumulative CPU-time counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSample {
    /// Cumulative CPU time in nanoseconds. Non-decreasing while the cgroup lives.
    pub usage_ns: u64,
    /// Wall-clock instant the counter was read.
    pub taken_at: Instant,
}

impl UsageSample {
    pub fn new(usage_ns: u64) -> Self {
        Self {
            usage_ns,
            taken_at: Instant::now(),
        }
    }
}

/// Reads the current cumulative CPU-time counter of one container.
///
/// Implementations perform a single read without retrying. Any failure is terminal for
/// the monitor that owns the reader.
pub trait UsageReader: Send + 'static {
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the accounting source is gone or
    /// unreadable, and [`Error::Parse`] if its content is malformed.
    fn read_usage(&mut self) -> Result<UsageSample>;
}

/// Location and format of a container's accounting source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageSource {
    /// cgroup v1 `cpuacct.usage` file.
    CpuAcct(PathBuf),
    /// cgroup v2 `cpu.stat` file.
    CpuStat(PathBuf),
}

impl UsageSource {
    /// Picks the accounting file inside a container's cgroup directory, preferring
    /// `cpuacct.usage` over `cpu.stat`.
    ///
    /// Returns `None` if the directory contains neither.
    pub fn detect(dir: impl AsRef<Path>) -> Option<Self> {
        let dir = dir.as_ref();
        let cpuacct = dir.join(CPUACCT_USAGE_FILE);
        if cpuacct.is_file() {
            return Some(Self::CpuAcct(cpuacct));
        }

        let cpu_stat = dir.join(CPU_STAT_FILE);
        if cpu_stat.is_file() {
            return Some(Self::CpuStat(cpu_stat));
        }

        None
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::CpuAcct(path) | Self::CpuStat(path) => path,
        }
    }
}

impl UsageReader for UsageSource {
    fn read_usage(&mut self) -> Result<UsageSample> {
        let path = self.path();
        let mut reader = fsutil::open_file_reader(path)?;
        let parsed = match self {
            Self::CpuAcct(_) => parse_cpuacct_usage(&mut reader),
            Self::CpuStat(_) => parse_cpu_stat_usage(&mut reader),
        };

        parsed
            .map(UsageSample::new)
            .map_err(|err| into_source_error(path, err))
    }
}

fn into_source_error(path: &Path, err: ParseError) -> Error {
    match err {
        ParseError::Io(source) => Error::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        },
        source => Error::Parse {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Parses the single nanosecond counter of a `cpuacct.usage` file.
fn parse_cpuacct_usage<R: BufRead>(buf: &mut R) -> std::result::Result<u64, ParseError> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    let value = line.trim();

    value
        .parse::<u64>()
        .map_err(|source| ParseError::InvalidValue {
            value: value.to_owned(),
            line: 1,
            source,
        })
}

/// Parses the `usage_usec` entry of a `cpu.stat` file and returns it in nanoseconds.
fn parse_cpu_stat_usage<R: BufRead>(buf: &mut R) -> std::result::Result<u64, ParseError> {
    let mut line = String::new();
    let mut lineno = 0;

    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        let mut parts = line.split_whitespace();
        if let (Some(CPU_STAT_USAGE_KEY), Some(value)) = (parts.next(), parts.next()) {
            let usec = value
                .parse::<u64>()
                .map_err(|source| ParseError::InvalidValue {
                    value: value.to_owned(),
                    line: lineno,
                    source,
                })?;
            return Ok(usec.saturating_mul(NANOS_PER_MICRO));
        }

        line.clear();
    }

    Err(ParseError::MissingField {
        field: CPU_STAT_USAGE_KEY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpuacct_usage() {
        let usage = parse_cpuacct_usage(&mut "2500000000\n".as_bytes()).unwrap();
        assert_eq!(usage, 2_500_000_000);
    }

    #[test]
    fn test_parse_cpuacct_usage_invalid() {
        let err = parse_cpuacct_usage(&mut "abc\n".as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidValue { value, line, .. } => {
                assert_eq!(value, "abc");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_cpuacct_usage_empty() {
        let err = parse_cpuacct_usage(&mut "".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_cpu_stat_usage() {
        let data = "\
usage_usec 1500000
user_usec 1000000
system_usec 500000
nr_periods 0
";
        let usage = parse_cpu_stat_usage(&mut data.as_bytes()).unwrap();
        assert_eq!(usage, 1_500_000_000);
    }

    #[test]
    fn test_parse_cpu_stat_usage_not_first_line() {
        let data = "nr_periods 3\nusage_usec 42\n";
        let usage = parse_cpu_stat_usage(&mut data.as_bytes()).unwrap();
        assert_eq!(usage, 42_000);
    }

    #[test]
    fn test_parse_cpu_stat_usage_missing() {
        let data = "user_usec 60\nsystem_usec 40\n";
        let err = parse_cpu_stat_usage(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField {
                field: CPU_STAT_USAGE_KEY
            }
        ));
    }

    #[test]
    fn test_parse_cpu_stat_usage_invalid_value_reports_line() {
        let data = "nr_periods 0\nusage_usec -1\n";
        let err = parse_cpu_stat_usage(&mut data.as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidValue { value, line, .. } => {
                assert_eq!(value, "-1");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_detect_prefers_cpuacct_usage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CPU_STAT_FILE), "usage_usec 1\n").unwrap();
        assert_eq!(
            UsageSource::detect(dir.path()),
            Some(UsageSource::CpuStat(dir.path().join(CPU_STAT_FILE)))
        );

        std::fs::write(dir.path().join(CPUACCT_USAGE_FILE), "1\n").unwrap();
        assert_eq!(
            UsageSource::detect(dir.path()),
            Some(UsageSource::CpuAcct(dir.path().join(CPUACCT_USAGE_FILE)))
        );
    }

    #[test]
    fn test_detect_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(UsageSource::detect(dir.path()), None);
    }

    #[test]
    fn test_read_usage_rereads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CPUACCT_USAGE_FILE);
        std::fs::write(&path, "100\n").unwrap();
        let mut source = UsageSource::CpuAcct(path.clone());
        assert_eq!(source.read_usage().unwrap().usage_ns, 100);

        std::fs::write(&path, "250\n").unwrap();
        assert_eq!(source.read_usage().unwrap().usage_ns, 250);
    }

    #[test]
    fn test_read_usage_removed_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CPUACCT_USAGE_FILE);
        std::fs::write(&path, "100\n").unwrap();
        let mut source = UsageSource::CpuAcct(path.clone());
        std::fs::remove_file(&path).unwrap();

        match source.read_usage().unwrap_err() {
            Error::SourceUnavailable { path: err_path, source } => {
                assert_eq!(err_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_usage_malformed_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CPUACCT_USAGE_FILE);
        std::fs::write(&path, "garbage\n").unwrap();
        let mut source = UsageSource::CpuAcct(path);

        assert!(matches!(source.read_usage(), Err(Error::Parse { .. })));
    }
}
