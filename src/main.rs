use clap::Parser;

/// Entry point for the cpuacct monitor.
///
/// Discovers the containers below the cpuacct cgroup hierarchy, labels each one from its
/// docker metadata, and prints one row of CPU usage percentages per sampling period
/// until interrupted.
///
/// # Errors
///
/// Returns an error if startup fails (e.g., missing cgroup directory or unreachable
/// docker daemon).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cargo run -- --use-systemd --docker-host unix:///var/run/docker.sock
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = cpuacct_monitor::config::Config::parse();
    cpuacct_monitor::run(config).await?;
    Ok(())
}
