/// Marker that identifies commands whose worker count is passed on the command line.
const ISOLATION_MARKER: &str = "Isolation";
const NB_CPUS_FLAG: &str = "nb-cpus=";

/// Runtime metadata of a container, as reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetadata {
    /// Entrypoint and arguments joined by spaces.
    pub command: String,
    /// Configured relative CPU weight.
    pub cpu_shares: i64,
}

impl ContainerMetadata {
    /// Number of workers/CPUs the container was started with.
    ///
    /// Defaults to `1`. Commands containing `Isolation` may override it with an
    /// `-nb-cpus=<N>` (or `--nb-cpus=<N>`) argument.
    pub fn worker_count(&self) -> u32 {
        if !self.command.contains(ISOLATION_MARKER) {
            return 1;
        }

        self.command
            .split_whitespace()
            .filter_map(|arg| arg.trim_start_matches('-').strip_prefix(NB_CPUS_FLAG))
            .find_map(|value| value.parse::<u32>().ok())
            .unwrap_or(1)
    }

    /// Column header for this container, e.g. `cpu-2-512`.
    pub fn label(&self) -> String {
        format!("cpu-{}-{}", self.worker_count(), self.cpu_shares)
    }
}
