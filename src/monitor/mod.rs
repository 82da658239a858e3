//! Synchronized per-tick CPU sampling.
//!
//! Every container gets its own [`ContainerMonitor`] task owning its [`MonitorState`].
//! The [`Supervisor`] advances a fixed-period clock and, on each tick, asks every live
//! monitor for exactly one sample over a request/reply handoff, then emits one [`Row`].
//!
//! ```text
//! Supervisor --SampleRequest--> ContainerMonitor --read--> UsageReader
//!     ^                               |
//!     +---------SampleReply-----------+
//! ```
mod output;
mod state;
mod supervisor;
mod task;

pub use output::{DEFAULT_CLOSED_SENTINEL, Field, Row, RowWriter, TIMEOUT_SENTINEL};
pub use state::MonitorState;
pub use supervisor::{Supervisor, SupervisorSettings, Tick};
pub use task::{ContainerMonitor, RequestError, SampleReply, SampleRequest};
