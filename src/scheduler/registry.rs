use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::metrics::SchedulerMetrics;

use super::interval::interval_from;
use super::{CronJob, SchedulerError};

/// Point-in-time view of a registered job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub interval_ms: u64,
    pub running: bool,
    pub ticks: u64,
    /// Milliseconds since epoch of the last finished tick
    pub last_tick_ms: Option<i64>,
}

struct RunningJob {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct JobSlot {
    name: String,
    job: Arc<dyn CronJob>,
    /// Serializes ticks of this job
    tick_lock: Mutex<()>,
    interval: watch::Sender<Duration>,
    running: Mutex<Option<RunningJob>>,
    ticks: AtomicU64,
    last_tick_ms: AtomicI64,
}

impl JobSlot {
    async fn tick(&self) {
        let _guard = self.tick_lock.lock().await;

        let started = Instant::now();
        self.job.run().await;
        let elapsed = started.elapsed();

        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.last_tick_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
        SchedulerMetrics::record_tick(&self.name, elapsed);
    }

    fn current_interval(&self) -> Duration {
        *self.interval.borrow()
    }

    async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    async fn status(&self) -> JobStatus {
        let last = self.last_tick_ms.load(Ordering::Relaxed);
        JobStatus {
            name: self.name.clone(),
            interval_ms: self.current_interval().as_millis() as u64,
            running: self.is_running().await,
            ticks: self.ticks.load(Ordering::Relaxed),
            last_tick_ms: (last > 0).then_some(last),
        }
    }
}

async fn run_loop(slot: Arc<JobSlot>, mut stop_rx: oneshot::Receiver<()>) {
    tracing::info!(
        job = %slot.name,
        interval_ms = slot.current_interval().as_millis() as u64,
        "Cron job started"
    );

    loop {
        slot.tick().await;

        // Read after the tick so an update applies to this sleep
        let interval = slot.current_interval();
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(job = %slot.name, "Cron job stopped");
}

/// Registry of named cron jobs and their run loops.
///
/// ```ignore
/// let scheduler = SchedulerRegistry::new();
/// scheduler.register("send-notifications", Duration::from_secs(5), job)?;
/// scheduler.start("send-notifications").await;
/// scheduler.update_interval("send-notifications", 10, "minute").await?;
/// scheduler.stop("send-notifications").await?;
/// ```
#[derive(Default)]
pub struct SchedulerRegistry {
    jobs: DashMap<String, Arc<JobSlot>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stopped job under the lowercase form of `name`.
    ///
    /// A zero interval is rejected with `InvalidIntervalNumber(0)`.
    pub fn register(
        &self,
        name: &str,
        interval: Duration,
        job: Arc<dyn CronJob>,
    ) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidIntervalNumber(0));
        }

        let key = name.to_lowercase();
        match self.jobs.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SchedulerError::AlreadyRegistered(key))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let (interval, _) = watch::channel(interval);
                entry.insert(Arc::new(JobSlot {
                    name: key,
                    job,
                    tick_lock: Mutex::new(()),
                    interval,
                    running: Mutex::new(None),
                    ticks: AtomicU64::new(0),
                    last_tick_ms: AtomicI64::new(0),
                }));
                Ok(())
            }
        }
    }

    fn slot(&self, name: &str) -> Option<Arc<JobSlot>> {
        self.jobs
            .get(&name.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    fn require(&self, name: &str) -> Result<Arc<JobSlot>, SchedulerError> {
        self.slot(name)
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))
    }

    /// Start the run loop of `name`.
    ///
    /// Returns `false` without side effects when the job is unknown or
    /// already running.
    pub async fn start(&self, name: &str) -> bool {
        let Some(slot) = self.slot(name) else {
            tracing::warn!(job = %name, "Cannot start unknown cron job");
            return false;
        };

        let mut running = slot.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                tracing::info!(job = %slot.name, "Cron job already running");
                return false;
            }
            // The previous loop died without being stopped
            SchedulerMetrics::job_stopped();
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(slot.clone(), stop_rx));
        *running = Some(RunningJob { stop_tx, handle });
        SchedulerMetrics::job_started();
        true
    }

    /// Signal the run loop of `name` and wait for it to exit.
    ///
    /// A tick in progress completes first. A job that is not running yields
    /// `NotRunning` immediately. The job reports as stopped as soon as the
    /// signal is sent.
    pub async fn stop(&self, name: &str) -> Result<(), SchedulerError> {
        let slot = self.require(name)?;

        // Release the slot before waiting so status reads are not blocked
        let taken = slot.running.lock().await.take();
        let Some(RunningJob { stop_tx, handle }) = taken else {
            return Err(SchedulerError::NotRunning(slot.name.clone()));
        };

        let _ = stop_tx.send(());
        if let Err(e) = handle.await {
            if e.is_panic() {
                tracing::error!(job = %slot.name, "Cron job loop panicked");
            }
        }
        SchedulerMetrics::job_stopped();
        Ok(())
    }

    /// Stop `name` if it is running, then start it.
    pub async fn restart(&self, name: &str) -> Result<(), SchedulerError> {
        self.require(name)?;

        match self.stop(name).await {
            Ok(()) | Err(SchedulerError::NotRunning(_)) => {}
            Err(e) => return Err(e),
        }
        self.start(name).await;
        Ok(())
    }

    /// Set the interval of `name` to `number` units of `base`.
    ///
    /// Applies from the next sleep; a sleep in progress keeps its length.
    /// On error the interval is unchanged.
    pub async fn update_interval(
        &self,
        name: &str,
        number: i64,
        base: &str,
    ) -> Result<Duration, SchedulerError> {
        let slot = self.require(name)?;
        let interval = interval_from(number, base)?;

        slot.interval.send_replace(interval);
        tracing::info!(
            job = %slot.name,
            interval_secs = interval.as_secs(),
            "Cron job interval updated"
        );
        Ok(interval)
    }

    /// Run a single tick of `name` now, waiting for any tick in progress.
    pub async fn run_once(&self, name: &str) -> Result<(), SchedulerError> {
        self.require(name)?.tick().await;
        Ok(())
    }

    /// Start every listed job, returning how many were started.
    pub async fn start_all<S: AsRef<str>>(&self, names: &[S]) -> usize {
        let mut started = 0;
        for name in names {
            if self.start(name.as_ref()).await {
                started += 1;
            }
        }
        started
    }

    /// Stop every running job.
    pub async fn shutdown(&self) {
        let slots: Vec<Arc<JobSlot>> = self.jobs.iter().map(|e| e.value().clone()).collect();
        for slot in slots {
            match self.stop(&slot.name).await {
                Ok(()) | Err(SchedulerError::NotRunning(_)) => {}
                Err(e) => tracing::warn!(job = %slot.name, error = %e, "Failed to stop cron job"),
            }
        }
        tracing::info!("Scheduler shut down");
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.slot(name).map(|slot| slot.current_interval())
    }

    pub async fn is_running(&self, name: &str) -> bool {
        match self.slot(name) {
            Some(slot) => slot.is_running().await,
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(&name.to_lowercase())
    }

    /// Status of every job, sorted by name
    pub async fn jobs(&self) -> Vec<JobStatus> {
        let slots: Vec<Arc<JobSlot>> = self.jobs.iter().map(|e| e.value().clone()).collect();

        let mut statuses = Vec::with_capacity(slots.len());
        for slot in slots {
            statuses.push(slot.status().await);
        }
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts ticks and tracks how many run at once.
    #[derive(Default)]
    struct CountingJob {
        work: Duration,
        ticks: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl CountingJob {
        fn taking(work: Duration) -> Arc<Self> {
            Arc::new(Self {
                work,
                ..Default::default()
            })
        }

        fn ticks(&self) -> usize {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CronJob for CountingJob {
        async fn run(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry_with(job: Arc<CountingJob>, interval: Duration) -> SchedulerRegistry {
        let registry = SchedulerRegistry::new();
        registry.register("counter", interval, job).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_register_lowercases_and_rejects_duplicates() {
        let registry = SchedulerRegistry::new();
        registry
            .register("Send-Notifications", Duration::from_secs(5), CountingJob::taking(Duration::ZERO))
            .unwrap();

        assert!(registry.contains("send-notifications"));
        assert_eq!(
            registry.register("send-notifications", Duration::from_secs(1), CountingJob::taking(Duration::ZERO)),
            Err(SchedulerError::AlreadyRegistered("send-notifications".to_string()))
        );
    }

    #[tokio::test]
    async fn test_register_rejects_zero_interval() {
        let registry = SchedulerRegistry::new();

        assert_eq!(
            registry.register("counter", Duration::ZERO, CountingJob::taking(Duration::ZERO)),
            Err(SchedulerError::InvalidIntervalNumber(0))
        );
        assert!(!registry.contains("counter"));
    }

    #[tokio::test]
    async fn test_start_unknown_job_is_a_no_op() {
        let registry = SchedulerRegistry::new();
        assert!(!registry.start("missing").await);
        assert!(!registry.is_running("missing").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_one_loop() {
        let job = CountingJob::taking(Duration::ZERO);
        let registry = registry_with(job.clone(), Duration::from_secs(10));

        assert!(registry.start("counter").await);
        assert!(!registry.start("counter").await);

        tokio::time::sleep(Duration::from_secs(25)).await;
        // Ticks at 0s, 10s and 20s from a single loop
        assert_eq!(job.ticks(), 3);

        registry.stop("counter").await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_not_running_returns_promptly() {
        let registry = registry_with(CountingJob::taking(Duration::ZERO), Duration::from_secs(1));

        let result = tokio::time::timeout(Duration::from_secs(1), registry.stop("counter")).await;
        assert_eq!(
            result.expect("stop must not block"),
            Err(SchedulerError::NotRunning("counter".to_string()))
        );
        assert_eq!(
            registry.stop("missing").await,
            Err(SchedulerError::JobNotFound("missing".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_tick_in_progress() {
        let job = CountingJob::taking(Duration::from_secs(5));
        let registry = registry_with(job.clone(), Duration::from_secs(60));

        registry.start("counter").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.ticks(), 0);

        registry.stop("counter").await.unwrap();
        assert_eq!(job.ticks(), 1);
        assert!(!registry.is_running("counter").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_readable_while_stop_waits() {
        let job = CountingJob::taking(Duration::from_secs(20));
        let registry = Arc::new(registry_with(job.clone(), Duration::from_secs(60)));

        registry.start("counter").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let stopping = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.stop("counter").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Tick still has ~19s to go; status must not wait for it
        let statuses = tokio::time::timeout(Duration::from_secs(1), registry.jobs())
            .await
            .expect("jobs() must not wait for the stop");
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].running);
        assert!(!tokio::time::timeout(Duration::from_secs(1), registry.is_running("counter"))
            .await
            .expect("is_running() must not wait for the stop"));
        assert_eq!(job.ticks(), 0);

        stopping.await.unwrap().unwrap();
        assert_eq!(job.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_job_does_not_tick() {
        let job = CountingJob::taking(Duration::ZERO);
        let registry = registry_with(job.clone(), Duration::from_secs(1));

        registry.start("counter").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        registry.stop("counter").await.unwrap();
        let ticks = job.ticks();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(job.ticks(), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart() {
        let job = CountingJob::taking(Duration::ZERO);
        let registry = registry_with(job.clone(), Duration::from_secs(60));

        // Restart of a stopped job just starts it
        registry.restart("counter").await.unwrap();
        assert!(registry.is_running("counter").await);

        registry.restart("counter").await.unwrap();
        assert!(registry.is_running("counter").await);

        assert_eq!(
            registry.restart("missing").await,
            Err(SchedulerError::JobNotFound("missing".to_string()))
        );
        registry.shutdown().await;
        assert!(!registry.is_running("counter").await);
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_interval_unchanged() {
        let registry = registry_with(CountingJob::taking(Duration::ZERO), Duration::from_secs(5));

        assert_eq!(
            registry.update_interval("counter", 10, "minute").await,
            Ok(Duration::from_secs(600))
        );
        assert_eq!(
            registry.update_interval("counter", 0, "minute").await,
            Err(SchedulerError::InvalidIntervalNumber(0))
        );
        assert_eq!(
            registry.update_interval("counter", 3, "fortnight").await,
            Err(SchedulerError::UnknownIntervalBase("fortnight".to_string()))
        );
        assert_eq!(
            registry.update_interval("missing", 0, "fortnight").await,
            Err(SchedulerError::JobNotFound("missing".to_string()))
        );
        assert_eq!(registry.interval("counter"), Some(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_update_applies_from_next_sleep() {
        let job = CountingJob::taking(Duration::ZERO);
        let registry = registry_with(job.clone(), Duration::from_secs(10));

        registry.start("counter").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.ticks(), 1);

        registry.update_interval("counter", 1, "minute").await.unwrap();

        // The sleep in progress still ends at 10s
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(job.ticks(), 2);

        // Next tick is 60s after the one at 10s
        tokio::time::sleep(Duration::from_secs(55)).await;
        assert_eq!(job.ticks(), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(job.ticks(), 3);

        registry.stop("counter").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_of_one_job_never_overlap() {
        let job = CountingJob::taking(Duration::from_secs(3));
        let registry = Arc::new(registry_with(job.clone(), Duration::from_secs(1)));

        registry.start("counter").await;
        let manual: Vec<_> = (0..3)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.run_once("counter").await })
            })
            .collect();
        for handle in manual {
            handle.await.unwrap().unwrap();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        registry.stop("counter").await.unwrap();

        assert!(job.ticks() >= 4);
        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_statuses() {
        let registry = registry_with(CountingJob::taking(Duration::ZERO), Duration::from_secs(5));
        registry
            .register("another", Duration::from_secs(1), CountingJob::taking(Duration::ZERO))
            .unwrap();

        registry.run_once("counter").await.unwrap();
        registry.start("another").await;

        let statuses = registry.jobs().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "another");
        assert!(statuses[0].running);
        assert_eq!(statuses[1].name, "counter");
        assert_eq!(statuses[1].ticks, 1);
        assert_eq!(statuses[1].interval_ms, 5_000);
        assert!(statuses[1].last_tick_ms.is_some());

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_all() {
        let registry = registry_with(CountingJob::taking(Duration::ZERO), Duration::from_secs(5));
        let started = registry.start_all(&["counter", "missing"]).await;
        assert_eq!(started, 1);
        registry.shutdown().await;
    }
}
