use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::cgroup::UsageReader;
use crate::container::ContainerID;
use crate::lifecycle::ShutdownListener;

use super::state::MonitorState;

/// A request for one sample, answered on its own reply channel.
#[derive(Debug)]
pub struct SampleRequest {
    pub tick: u64,
    /// Set when the monitor's previous sample was delivered too late to serve as a
    /// baseline.
    pub resync: bool,
    pub reply: oneshot::Sender<SampleReply>,
}

/// Answer to a [`SampleRequest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReply {
    /// Tick of the request this reply belongs to.
    pub tick: u64,
    /// CPU usage since the previous tick, in percent of one core. `None` if the sample
    /// only re-established the baseline.
    pub percentage: Option<f64>,
}

/// Why a sample request could not be handed to a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The monitor is closed and will never answer again.
    Closed,
    /// The monitor has not picked up its previous request yet.
    Busy,
}

/// Handle to the sampling task of one container.
///
/// The task reads the container's counter only when asked to, so every reading belongs
/// to exactly one request. A request already taken off the queue is answered even if
/// stop arrives meanwhile. The task closes for good once its accounting source becomes
/// unavailable, stop is triggered while it is idle, or nobody waits for its reply.
#[derive(Debug)]
pub struct ContainerMonitor {
    id: ContainerID,
    requests: mpsc::Sender<SampleRequest>,
    task: JoinHandle<()>,
}

impl ContainerMonitor {
    /// Spawns the sampling task for one container.
    pub fn spawn<R>(
        id: ContainerID,
        reader: R,
        interval: Duration,
        shutdown: ShutdownListener,
    ) -> Self
    where
        R: UsageReader,
    {
        let (requests, rx) = mpsc::channel(1);
        let task = tokio::spawn(monitor_task(
            id.clone(),
            reader,
            MonitorState::new(interval),
            rx,
            shutdown,
        ));

        Self { id, requests, task }
    }

    pub fn id(&self) -> &ContainerID {
        &self.id
    }

    /// Returns true once the task stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Hands a sample request for `tick` to the task without waiting. With `resync` the
    /// task discards its previous sample as a baseline.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Closed`] if the task is gone, or [`RequestError::Busy`]
    /// if it still holds an unanswered request.
    pub fn request_sample(
        &self,
        tick: u64,
        resync: bool,
    ) -> Result<oneshot::Receiver<SampleReply>, RequestError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .try_send(SampleRequest {
                tick,
                resync,
                reply,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Closed(_) => RequestError::Closed,
                mpsc::error::TrySendError::Full(_) => RequestError::Busy,
            })?;

        Ok(rx)
    }

    /// Waits for the task to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`tokio::task::JoinError`] if the task panicked.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        drop(self.requests);
        self.task.await
    }
}

async fn monitor_task<R>(
    id: ContainerID,
    mut reader: R,
    mut state: MonitorState,
    mut requests: mpsc::Receiver<SampleRequest>,
    mut shutdown: ShutdownListener,
) where
    R: UsageReader,
{
    loop {
        let mut request = tokio::select! {
            biased;
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
            _ = shutdown.triggered() => break,
        };
        let tick = request.tick;

        let read = tokio::select! {
            biased;
            read = tokio::task::spawn_blocking(move || {
                let result = reader.read_usage();
                (reader, result)
            }) => read,
            _ = request.reply.closed() => {
                log::debug!(
                    "abandoning sample of container `{}` for tick {}: nobody is waiting",
                    id,
                    tick
                );
                break;
            }
        };

        let (returned, result) = match read {
            Ok(read) => read,
            Err(err) => {
                log::error!("usage reader of container `{}` failed: {}", id, err);
                break;
            }
        };
        reader = returned;

        let sample = match result {
            Ok(sample) => sample,
            Err(err) => {
                log::warn!("closing monitor of container `{}`: {}", id, err);
                // A dropped reply must never be followed by an open queue.
                requests.close();
                break;
            }
        };

        let percentage = state.observe(tick, sample, request.resync);
        if request
            .reply
            .send(SampleReply { tick, percentage })
            .is_err()
        {
            log::trace!(
                "discarding sample of container `{}` for tick {}",
                id,
                tick
            );
        }
    }

    requests.close();
    log::debug!("monitor of container `{}` closed", id);
}
