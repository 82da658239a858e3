use std::time::Duration;

use crate::cgroup::UsageSample;

/// Per-container sampling state, owned by exactly one monitor task.
#[derive(Debug, Clone)]
pub struct MonitorState {
    /// Last sample and the tick it was taken for.
    previous: Option<(u64, UsageSample)>,
    interval: Duration,
}

impl MonitorState {
    /// Creates the state for a monitor sampled once per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            previous: None,
            interval,
        }
    }

    /// Records `sample`, taken for `tick`, and returns the CPU usage since the previous
    /// tick as a percentage of one core over the nominal interval.
    ///
    /// The first sample only establishes the baseline and yields `0.0`. A counter that
    /// went backwards (the cgroup was recreated) also yields `0.0` and rebases.
    ///
    /// Returns `None` and rebases if the previous sample does not belong to the tick
    /// right before `tick`, or if `resync` says it was taken late.
    pub fn observe(&mut self, tick: u64, sample: UsageSample, resync: bool) -> Option<f64> {
        let percentage = match self.previous {
            None => Some(0.0),
            Some((previous_tick, previous))
                if !resync && previous_tick.checked_add(1) == Some(tick) =>
            {
                let delta = sample.usage_ns.saturating_sub(previous.usage_ns);
                if let Some(drift) = sample.taken_at.checked_duration_since(previous.taken_at) {
                    log::trace!(
                        "usage delta={}ns over {}ns (nominal {}ns)",
                        delta,
                        drift.as_nanos(),
                        self.interval.as_nanos()
                    );
                }
                Some(delta as f64 / self.interval.as_nanos() as f64 * 100.0)
            }
            Some((previous_tick, _)) => {
                log::debug!(
                    "rebasing at tick {} (previous sample from tick {}, resync={})",
                    tick,
                    previous_tick,
                    resync
                );
                None
            }
        };
        self.previous = Some((tick, sample));

        percentage
    }

    pub fn previous(&self) -> Option<&UsageSample> {
        self.previous.as_ref().map(|(_, sample)| sample)
    }
}
