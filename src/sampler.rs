//! Background sampler for process-level resource gauges.
//!
//! The sampler runs as one long-lived tokio task. Every interval it reads the
//! open file descriptor count, the thread count and the cumulative CPU time of
//! the running process from procfs and writes them into the process gauges.
//! A failed reading is logged and skipped; the loop only ends when the owning
//! [`SamplerHandle`] is shut down.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::ProcessMetrics;
use crate::process::{
    count_open_fds, cpu_utilization_percent, logical_cpu_count, parse_proc_stat, PROC_SELF,
};

/// Errors raised by the system sampler.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("cannot determine the number of logical CPUs")]
    CpuCountUnavailable,

    #[error("sampling interval must be a positive duration")]
    InvalidInterval,

    #[error("failed to read process statistics: {0}")]
    Io(#[from] std::io::Error),
}

/// Cumulative CPU time observed at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct CpuReading {
    pub cpu_time_seconds: f64,
    pub at: Instant,
}

/// Periodically samples the running process into [`ProcessMetrics`].
pub struct SystemSampler {
    metrics: ProcessMetrics,
    interval: Duration,
    cpu_count: usize,
    proc_path: PathBuf,
    previous: Option<CpuReading>,
}

impl SystemSampler {
    /// Creates a sampler for the current process.
    ///
    /// Fails if the logical CPU count cannot be determined; this is a startup
    /// precondition and is not retried.
    pub fn new(metrics: ProcessMetrics, interval: Duration) -> Result<Self, SamplerError> {
        Self::with_cpu_count(metrics, interval, PROC_SELF, logical_cpu_count())
    }

    /// Creates a sampler reading from an arbitrary procfs process directory.
    pub fn with_cpu_count(
        metrics: ProcessMetrics,
        interval: Duration,
        proc_path: impl Into<PathBuf>,
        cpu_count: Option<usize>,
    ) -> Result<Self, SamplerError> {
        let cpu_count = match cpu_count {
            Some(n) if n > 0 => n,
            _ => return Err(SamplerError::CpuCountUnavailable),
        };
        if interval.is_zero() {
            return Err(SamplerError::InvalidInterval);
        }

        Ok(Self {
            metrics,
            interval,
            cpu_count,
            proc_path: proc_path.into(),
            previous: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// Takes one sample. The first successful tick only seeds the CPU
    /// baseline; later ticks also publish the utilization percentage.
    pub fn tick(&mut self) -> Result<(), SamplerError> {
        let open_fds = count_open_fds(&self.proc_path)?;
        let stat = parse_proc_stat(&self.proc_path)?;

        self.metrics.open_fds.set(open_fds as f64);
        self.metrics.threads.set(stat.num_threads as f64);

        let reading = CpuReading {
            cpu_time_seconds: stat.cpu_time_seconds,
            at: Instant::now(),
        };
        if let Some(percent) = self.record_cpu(reading) {
            debug!(
                "Sampled process: fds={} threads={} cpu={:.2}%",
                open_fds, stat.num_threads, percent
            );
        } else {
            debug!(
                "Sampled process: fds={} threads={} (cpu baseline seeded)",
                open_fds, stat.num_threads
            );
        }
        Ok(())
    }

    /// Stores `reading` as the new baseline and, if there was a previous one,
    /// publishes the utilization over the elapsed interval.
    pub fn record_cpu(&mut self, reading: CpuReading) -> Option<f64> {
        let percent = self.previous.map(|prev| {
            let cpu_delta = (reading.cpu_time_seconds - prev.cpu_time_seconds).max(0.0);
            let wall_delta = reading.at.saturating_duration_since(prev.at).as_secs_f64();
            cpu_utilization_percent(cpu_delta, wall_delta, self.cpu_count)
        });

        if let Some(p) = percent {
            self.metrics.cpu_utilization_percentage.set(p);
        }
        self.previous = Some(reading);
        percent
    }

    /// Runs the sampling loop until `shutdown` flips or its sender is dropped.
    ///
    /// Shutdown is only observed while sleeping, so gauges always hold the
    /// values of the last complete tick.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "System sampler started (interval {:?}, {} logical CPUs)",
            self.interval, self.cpu_count
        );

        loop {
            if let Err(e) = self.tick() {
                warn!("Error collecting system metrics: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("System sampler stopped");
    }

    /// Spawns the sampling loop on the current runtime.
    pub fn spawn(self) -> SamplerHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SamplerHandle { shutdown: tx, task }
    }
}

/// Owned handle to a running sampler task.
pub struct SamplerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("System sampler task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use std::path::Path;
    use tempfile::tempdir;

    fn process_metrics() -> ProcessMetrics {
        ProcessMetrics::new(&MetricRegistry::new()).unwrap()
    }

    /// Writes a fake /proc/<pid> directory with `fds` descriptors.
    fn write_proc_fixture(dir: &Path, utime: u64, threads: u64, fds: usize) {
        let stat = format!(
            "42 (svc) S 1 42 42 0 -1 4194304 100 0 0 0 {} 0 0 0 20 0 {} 0 12345 12345678 1234",
            utime, threads
        );
        let fd_dir = dir.join("fd");
        std::fs::create_dir_all(&fd_dir).unwrap();
        for i in 0..fds {
            std::fs::write(fd_dir.join(i.to_string()), "").unwrap();
        }
        // stat appears last and atomically so a concurrent tick never sees a
        // half-written fixture.
        std::fs::write(dir.join("stat.tmp"), stat).unwrap();
        std::fs::rename(dir.join("stat.tmp"), dir.join("stat")).unwrap();
    }

    #[test]
    fn test_unknown_cpu_count_is_fatal() {
        let result = SystemSampler::with_cpu_count(
            process_metrics(),
            Duration::from_secs(1),
            PROC_SELF,
            None,
        );
        assert!(matches!(result, Err(SamplerError::CpuCountUnavailable)));

        let result = SystemSampler::with_cpu_count(
            process_metrics(),
            Duration::from_secs(1),
            PROC_SELF,
            Some(0),
        );
        assert!(matches!(result, Err(SamplerError::CpuCountUnavailable)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result =
            SystemSampler::with_cpu_count(process_metrics(), Duration::ZERO, PROC_SELF, Some(2));
        assert!(matches!(result, Err(SamplerError::InvalidInterval)));
    }

    #[test]
    fn test_cpu_percent_from_consecutive_readings() {
        let metrics = process_metrics();
        let mut sampler = SystemSampler::with_cpu_count(
            metrics.clone(),
            Duration::from_secs(10),
            PROC_SELF,
            Some(4),
        )
        .unwrap();

        let t0 = Instant::now();
        let first = sampler.record_cpu(CpuReading {
            cpu_time_seconds: 100.0,
            at: t0,
        });
        assert_eq!(first, None);
        assert_eq!(metrics.cpu_utilization_percentage.get(), 0.0);

        let second = sampler.record_cpu(CpuReading {
            cpu_time_seconds: 102.0,
            at: t0 + Duration::from_secs(10),
        });
        assert!((second.unwrap() - 5.0).abs() < 1e-9);
        assert!((metrics.cpu_utilization_percentage.get() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_sets_gauges_from_procfs() {
        let dir = tempdir().unwrap();
        write_proc_fixture(dir.path(), 100, 9, 3);

        let metrics = process_metrics();
        let mut sampler = SystemSampler::with_cpu_count(
            metrics.clone(),
            Duration::from_secs(1),
            dir.path(),
            Some(2),
        )
        .unwrap();

        sampler.tick().unwrap();
        assert_eq!(metrics.open_fds.get(), 3.0);
        assert_eq!(metrics.threads.get(), 9.0);
        assert!(sampler.previous.is_some());
    }

    #[test]
    fn test_tick_error_leaves_gauges_untouched() {
        let dir = tempdir().unwrap();
        let metrics = process_metrics();
        metrics.threads.set(5.0);

        let mut sampler = SystemSampler::with_cpu_count(
            metrics.clone(),
            Duration::from_secs(1),
            dir.path(),
            Some(2),
        )
        .unwrap();

        assert!(sampler.tick().is_err());
        assert_eq!(metrics.threads.get(), 5.0);
        assert!(sampler.previous.is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_tick_on_real_process() {
        let metrics = process_metrics();
        let mut sampler =
            SystemSampler::new(metrics.clone(), Duration::from_secs(1)).unwrap();

        sampler.tick().unwrap();
        assert!(metrics.open_fds.get() > 0.0);
        assert!(metrics.threads.get() >= 1.0);
    }

    #[tokio::test]
    async fn test_loop_survives_failed_ticks_and_shuts_down() {
        let dir = tempdir().unwrap();
        let metrics = process_metrics();
        let sampler = SystemSampler::with_cpu_count(
            metrics.clone(),
            Duration::from_millis(10),
            dir.path(),
            Some(1),
        )
        .unwrap();

        // No fixture yet: the first ticks fail.
        let handle = sampler.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(metrics.threads.get(), 0.0);

        write_proc_fixture(dir.path(), 10, 4, 2);
        let deadline = Instant::now() + Duration::from_secs(5);
        while metrics.threads.get() != 4.0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(metrics.threads.get(), 4.0);
        assert_eq!(metrics.open_fds.get(), 2.0);

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("sampler did not stop");
    }
}
