use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::{Instant, MissedTickBehavior};

use crate::container::ContainerHandle;
use crate::lifecycle::{Shutdown, ShutdownListener};

use super::output::{DEFAULT_CLOSED_SENTINEL, Field, Row, RowWriter};
use super::task::{ContainerMonitor, RequestError, SampleReply};

/// Timing and output options of the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSettings {
    /// Nominal tick period. Percentages are computed against it.
    pub interval: Duration,
    /// How long a tick waits for monitor replies.
    pub sample_timeout: Duration,
    /// Placeholder printed for closed monitors.
    pub closed_sentinel: String,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            sample_timeout: Duration::from_secs(1),
            closed_sentinel: DEFAULT_CLOSED_SENTINEL.to_owned(),
        }
    }
}

/// One sampling round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub index: u64,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct Slot {
    label: String,
    monitor: ContainerMonitor,
    closed: bool,
    /// Reply of a request that missed its tick and is still outstanding.
    overdue: Option<oneshot::Receiver<SampleReply>>,
    /// The last request missed its tick, so its sample is no baseline.
    resync: bool,
}

enum Pending {
    Reply(oneshot::Receiver<SampleReply>),
    Closed,
    Busy,
}

impl Slot {
    /// Sends the request for `tick` unless the monitor is closed or still busy.
    fn request(&mut self, tick: u64) -> Pending {
        if self.closed {
            return Pending::Closed;
        }

        if let Some(overdue) = self.overdue.as_mut() {
            match overdue.try_recv() {
                Err(TryRecvError::Empty) => return Pending::Busy,
                Err(TryRecvError::Closed) => {
                    self.overdue = None;
                    self.closed = true;
                    return Pending::Closed;
                }
                Ok(late) => {
                    log::debug!(
                        "dropping late sample of container `{}` for tick {}",
                        self.monitor.id(),
                        late.tick
                    );
                    self.overdue = None;
                }
            }
        }

        match self.monitor.request_sample(tick, self.resync) {
            Ok(rx) => {
                self.resync = false;
                Pending::Reply(rx)
            }
            Err(RequestError::Closed) => {
                self.closed = true;
                Pending::Closed
            }
            Err(RequestError::Busy) => Pending::Busy,
        }
    }
}

/// Drives the fixed-period clock and collects one row of samples per tick.
///
/// Slots keep the order in which monitors were added. A slot never disappears, so every
/// row has one field per container known at startup.
#[derive(Debug)]
pub struct Supervisor<W> {
    slots: Vec<Slot>,
    settings: SupervisorSettings,
    out: RowWriter<W>,
}

impl<W: Write> Supervisor<W> {
    pub fn new(settings: SupervisorSettings, out: W) -> Self {
        let out = RowWriter::new(out, settings.closed_sentinel.clone());
        Self {
            slots: Vec::new(),
            settings,
            out,
        }
    }

    /// Spawns one monitor per handle, in order, reading each handle's accounting source.
    pub fn spawn(
        handles: impl IntoIterator<Item = ContainerHandle>,
        settings: SupervisorSettings,
        out: W,
        shutdown: &Shutdown,
    ) -> Self {
        let mut supervisor = Self::new(settings, out);
        for handle in handles {
            let monitor = ContainerMonitor::spawn(
                handle.id().clone(),
                handle.source().clone(),
                supervisor.settings.interval,
                shutdown.listener(),
            );
            supervisor.add_monitor(handle.label(), monitor);
        }

        supervisor
    }

    /// Appends a column backed by `monitor`.
    pub fn add_monitor(&mut self, label: impl Into<String>, monitor: ContainerMonitor) {
        self.slots.push(Slot {
            label: label.into(),
            monitor,
            closed: false,
            overdue: None,
            resync: false,
        });
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.label.as_str())
    }

    /// Number of monitors that have not closed yet.
    pub fn live_monitors(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.closed).count()
    }

    /// Writes the header, then emits one row per tick until `shutdown` is triggered.
    ///
    /// Stop is observed between ticks. A row whose requests went out is always
    /// completed, which takes at most the sample timeout. Returns the number of rows
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub async fn run(&mut self, mut shutdown: ShutdownListener) -> std::io::Result<u64> {
        let labels: Vec<String> = self.labels().map(str::to_owned).collect();
        self.out.write_header(labels.iter().map(String::as_str))?;

        let start = Instant::now();
        let mut clock = tokio::time::interval_at(start, self.settings.interval);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut index = 0;
        loop {
            let fired = tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                fired = clock.tick() => fired,
            };
            let tick = Tick {
                index,
                elapsed: fired.duration_since(start),
            };

            let row = self.collect_row(tick).await;
            self.out.write_row(&row)?;
            log::trace!("emitted row for tick {}", tick.index);
            index += 1;
        }

        log::debug!("tick loop stopped after {} rows", index);
        Ok(index)
    }

    /// Requests one sample from every live monitor and waits for the replies.
    ///
    /// All requests are issued before any reply is awaited, and every reply shares the
    /// same deadline, so a slow monitor delays the row by at most the sample timeout.
    ///
    /// A monitor that still works on an overdue request gets no new one and reports
    /// `timeout`. Once its late reply is in, the reply is dropped and the next request
    /// asks it to resync its baseline.
    pub async fn collect_row(&mut self, tick: Tick) -> Row {
        let deadline = Instant::now() + self.settings.sample_timeout;

        let pending: Vec<Pending> = self
            .slots
            .iter_mut()
            .map(|slot| slot.request(tick.index))
            .collect();

        let mut fields = Vec::with_capacity(pending.len());
        for (slot, pending) in self.slots.iter_mut().zip(pending) {
            let field = match pending {
                Pending::Closed => Field::Closed,
                Pending::Busy => {
                    log::warn!(
                        "container `{}` is still busy with an earlier sample at tick {}",
                        slot.monitor.id(),
                        tick.index
                    );
                    Field::Timeout
                }
                Pending::Reply(mut rx) => {
                    let reply = tokio::time::timeout_at(deadline, &mut rx).await;
                    match reply {
                        Ok(Ok(reply)) => {
                            debug_assert_eq!(reply.tick, tick.index);
                            match reply.percentage {
                                Some(percentage) => Field::Usage(percentage),
                                None => Field::Timeout,
                            }
                        }
                        Ok(Err(_)) => {
                            slot.closed = true;
                            Field::Closed
                        }
                        Err(_) => {
                            log::warn!(
                                "container `{}` did not answer tick {} within {:?}",
                                slot.monitor.id(),
                                tick.index,
                                self.settings.sample_timeout
                            );
                            slot.overdue = Some(rx);
                            slot.resync = true;
                            Field::Timeout
                        }
                    }
                }
            };
            fields.push(field);
        }

        Row {
            tick: tick.index,
            elapsed_secs: tick.elapsed.as_secs(),
            fields,
        }
    }

    pub fn writer(&self) -> &W {
        self.out.get_ref()
    }

    /// Consumes the supervisor and hands back its monitors for shutdown.
    pub fn into_monitors(self) -> Vec<ContainerMonitor> {
        self.slots.into_iter().map(|slot| slot.monitor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::{self, UsageReader, UsageSample};
    use crate::container::ContainerID;
    use std::sync::{Arc, Mutex};

    /// Reader whose next counter value is controlled by the test.
    #[derive(Clone)]
    struct SharedCounter(Arc<Mutex<Option<u64>>>);

    impl SharedCounter {
        fn new(value: u64) -> Self {
            Self(Arc::new(Mutex::new(Some(value))))
        }

        fn set(&self, value: u64) {
            *self.0.lock().unwrap() = Some(value);
        }

        fn remove(&self) {
            *self.0.lock().unwrap() = None;
        }
    }

    impl UsageReader for SharedCounter {
        fn read_usage(&mut self) -> cgroup::Result<UsageSample> {
            self.0
                .lock()
                .unwrap()
                .map(UsageSample::new)
                .ok_or_else(|| cgroup::Error::SourceUnavailable {
                    path: "/removed/cpuacct.usage".into(),
                    source: std::io::ErrorKind::NotFound.into(),
                })
        }
    }

    /// Counter of a container using exactly one core, measured in wall-clock time.
    /// The read with index `stall_at` blocks for `stall` first.
    struct OneCoreReader {
        started: std::time::Instant,
        reads: usize,
        stall_at: usize,
        stall: Duration,
    }

    impl OneCoreReader {
        fn new(stall_at: usize, stall: Duration) -> Self {
            Self {
                started: std::time::Instant::now(),
                reads: 0,
                stall_at,
                stall,
            }
        }
    }

    impl UsageReader for OneCoreReader {
        fn read_usage(&mut self) -> cgroup::Result<UsageSample> {
            if self.reads == self.stall_at {
                std::thread::sleep(self.stall);
            }
            self.reads += 1;
            Ok(UsageSample::new(self.started.elapsed().as_nanos() as u64))
        }
    }

    /// Reader that blocks far longer than the sample timeout.
    struct HungReader;

    impl UsageReader for HungReader {
        fn read_usage(&mut self) -> cgroup::Result<UsageSample> {
            std::thread::sleep(Duration::from_secs(1));
            Ok(UsageSample::new(0))
        }
    }

    fn tick(index: u64) -> Tick {
        Tick {
            index,
            elapsed: Duration::from_secs(index),
        }
    }

    fn settings(sample_timeout: Duration) -> SupervisorSettings {
        SupervisorSettings {
            interval: Duration::from_secs(1),
            sample_timeout,
            closed_sentinel: DEFAULT_CLOSED_SENTINEL.to_owned(),
        }
    }

    fn add<R: UsageReader>(
        supervisor: &mut Supervisor<Vec<u8>>,
        shutdown: &Shutdown,
        name: &str,
        reader: R,
    ) {
        let monitor = ContainerMonitor::spawn(
            ContainerID::new(name).unwrap(),
            reader,
            Duration::from_secs(1),
            shutdown.listener(),
        );
        supervisor.add_monitor(name, monitor);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closed_column_keeps_its_slot() {
        let shutdown = Shutdown::new();
        let mut supervisor = Supervisor::new(settings(Duration::from_secs(5)), Vec::new());
        let a = SharedCounter::new(0);
        let b = SharedCounter::new(0);
        add(&mut supervisor, &shutdown, "a", a.clone());
        add(&mut supervisor, &shutdown, "b", b.clone());

        let row = supervisor.collect_row(tick(0)).await;
        assert_eq!(row.fields, vec![Field::Usage(0.0), Field::Usage(0.0)]);

        a.set(1_000_000_000);
        b.set(500_000_000);
        let row = supervisor.collect_row(tick(1)).await;
        assert_eq!(row.fields, vec![Field::Usage(100.0), Field::Usage(50.0)]);

        a.remove();
        b.set(1_000_000_000);
        let row = supervisor.collect_row(tick(2)).await;
        assert_eq!(row.fields, vec![Field::Closed, Field::Usage(50.0)]);
        assert_eq!(supervisor.live_monitors(), 1);

        a.set(9_000_000_000);
        b.set(1_250_000_000);
        let row = supervisor.collect_row(tick(3)).await;
        assert_eq!(row.elapsed_secs, 3);
        assert_eq!(row.fields, vec![Field::Closed, Field::Usage(25.0)]);

        shutdown.trigger();
        for monitor in supervisor.into_monitors() {
            monitor.join().await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hung_monitor_times_out_without_stalling_others() {
        let shutdown = Shutdown::new();
        let mut supervisor = Supervisor::new(settings(Duration::from_millis(200)), Vec::new());
        add(&mut supervisor, &shutdown, "hung", HungReader);
        add(&mut supervisor, &shutdown, "ok", SharedCounter::new(0));

        let started = std::time::Instant::now();
        let row = supervisor.collect_row(tick(0)).await;
        assert_eq!(row.fields, vec![Field::Timeout, Field::Usage(0.0)]);
        assert!(started.elapsed() < Duration::from_secs(2));

        // While the read is still running no new request is sent and the column is
        // reported without waiting.
        let started = std::time::Instant::now();
        let row = supervisor.collect_row(tick(1)).await;
        assert_eq!(row.fields, vec![Field::Timeout, Field::Usage(0.0)]);
        let row = supervisor.collect_row(tick(2)).await;
        assert_eq!(row.fields, vec![Field::Timeout, Field::Usage(0.0)]);
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(supervisor.live_monitors(), 2);

        shutdown.trigger();
        for monitor in supervisor.into_monitors() {
            monitor.join().await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_writes_header_and_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let mut supervisor = Supervisor::new(
            SupervisorSettings {
                interval: Duration::from_millis(100),
                ..settings(Duration::from_millis(100))
            },
            Vec::new(),
        );
        add(&mut supervisor, &shutdown, "cpu-1-0", SharedCounter::new(0));

        let stopper = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                shutdown.trigger();
            })
        };
        let rows = supervisor.run(shutdown.listener()).await.unwrap();
        stopper.await.unwrap();

        let output = String::from_utf8(supervisor.writer().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "time cpu-1-0");
        assert_eq!(lines.len() as u64, rows + 1);
        assert!(rows >= 1);
        assert!(lines[1].starts_with("0 "));
        assert!(output.ends_with('\n'));

        for monitor in supervisor.into_monitors() {
            monitor.join().await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_sample_is_not_used_as_baseline() {
        let period = Duration::from_millis(400);
        let shutdown = Shutdown::new();
        let mut supervisor = Supervisor::new(
            SupervisorSettings {
                interval: period,
                ..settings(period)
            },
            Vec::new(),
        );
        let monitor = ContainerMonitor::spawn(
            ContainerID::new("busy").unwrap(),
            OneCoreReader::new(1, Duration::from_millis(600)),
            period,
            shutdown.listener(),
        );
        supervisor.add_monitor("busy", monitor);

        let mut clock = tokio::time::interval(period);
        let mut rows = Vec::new();
        for index in 0..6 {
            clock.tick().await;
            rows.push(supervisor.collect_row(tick(index)).await.fields);
        }

        // Tick 1 stalls past the deadline, tick 2 finds the read still running and tick
        // 3 only re-establishes the baseline.
        assert_eq!(rows[0], vec![Field::Usage(0.0)]);
        assert_eq!(rows[1], vec![Field::Timeout]);
        assert_eq!(rows[2], vec![Field::Timeout]);
        assert_eq!(rows[3], vec![Field::Timeout]);
        for row in &rows[4..] {
            match row.as_slice() {
                [Field::Usage(percentage)] => {
                    assert!(
                        (80.0..120.0).contains(percentage),
                        "one busy core reported as {percentage}%"
                    );
                }
                other => panic!("unexpected row {other:?}"),
            }
        }

        shutdown.trigger();
        for monitor in supervisor.into_monitors() {
            monitor.join().await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_during_collection_completes_the_row() {
        struct SlowReader;

        impl UsageReader for SlowReader {
            fn read_usage(&mut self) -> cgroup::Result<UsageSample> {
                std::thread::sleep(Duration::from_millis(300));
                Ok(UsageSample::new(0))
            }
        }

        let shutdown = Shutdown::new();
        let mut supervisor = Supervisor::new(settings(Duration::from_secs(1)), Vec::new());
        add(&mut supervisor, &shutdown, "a", SlowReader);

        let listener = shutdown.listener();
        let runner = tokio::spawn(async move {
            let rows = supervisor.run(listener).await;
            (rows, supervisor)
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let (rows, supervisor) = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert_eq!(rows.unwrap(), 1);
        let output = String::from_utf8(supervisor.writer().clone()).unwrap();
        assert_eq!(output, "time a\n0 0.00%\n");

        for monitor in supervisor.into_monitors() {
            monitor.join().await.unwrap();
        }
    }
}
