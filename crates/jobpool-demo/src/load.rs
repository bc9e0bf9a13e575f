//! Synthetic load: sleep jobs, a retrying producer and an exit collector.

use crate::config::DemoConfig;
use anyhow::anyhow;
use core::fmt;
use core::time::Duration;
use crossbeam_channel::Receiver;
use jobpool::{Dispatcher, Job, JobExit, JobOutcome, WorkerId};
use rand::Rng;
use std::collections::BTreeMap;
use std::thread;
use std::time::Instant;

/// Simulates a slow synchronous task by sleeping.
pub struct SleepJob {
    pub seq: usize,
    duration: Duration,
    fail: bool,
}

impl SleepJob {
    pub const fn new(seq: usize, duration: Duration, fail: bool) -> Self {
        Self {
            seq,
            duration,
            fail,
        }
    }
}

impl Job for SleepJob {
    fn run(&mut self, worker: WorkerId) {
        tracing::trace!("Worker {worker} running job {} for {:?}", self.seq, self.duration);
        thread::sleep(self.duration);
        if self.fail {
            panic!("synthetic failure in job {}", self.seq);
        }
    }
}

/// Aggregated result of one demo run.
#[derive(Debug, Default)]
pub struct Summary {
    pub submitted: usize,
    /// Submissions bounced by backpressure before being accepted.
    pub rejections: usize,
    pub completed: usize,
    pub panicked: usize,
    pub per_worker: BTreeMap<WorkerId, usize>,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "submitted {} jobs in {:?} ({} completed, {} panicked, {} rejections retried)",
            self.submitted, self.elapsed, self.completed, self.panicked, self.rejections
        )?;
        for (worker, count) in &self.per_worker {
            writeln!(f, "  worker {worker:>3}: {count} jobs")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Tally {
    completed: usize,
    panicked: usize,
    per_worker: BTreeMap<WorkerId, usize>,
}

/// Runs one full demo: start the pool, submit every job (retrying on a full
/// queue), wait for every exit, then stop all workers.
pub fn drive(config: &DemoConfig) -> anyhow::Result<Summary> {
    let (exit_tx, exit_rx) = crossbeam_channel::bounded(config.pool.max_workers);
    let pool = Dispatcher::new(config.pool.clone(), Some(exit_tx))?;
    pool.run()?;

    let start = Instant::now();
    let expected = config.job_count;
    let collector = thread::Builder::new()
        .name(String::from("jobpool-demo-exits"))
        .spawn(move || collect(&exit_rx, expected))?;

    let mut rng = rand::rng();
    let mut rejections = 0;
    for seq in 0..config.job_count {
        let fail = config
            .panic_every
            .is_some_and(|n| (seq + 1) % n.get() == 0);
        let duration = rng.random_range(config.min_job..=config.max_job);
        let mut job = SleepJob::new(seq, duration, fail);

        loop {
            match pool.try_enqueue(job) {
                Ok(()) => break,
                Err(full) => {
                    rejections += 1;
                    job = full.into_inner();
                    thread::sleep(config.retry_backoff);
                }
            }
        }
    }
    tracing::debug!("All {} jobs accepted", config.job_count);

    let tally = collector
        .join()
        .map_err(|_| anyhow!("exit collector thread panicked"))?;

    for worker in pool.workers() {
        worker.stop()?;
    }

    Ok(Summary {
        submitted: config.job_count,
        rejections,
        completed: tally.completed,
        panicked: tally.panicked,
        per_worker: tally.per_worker,
        elapsed: start.elapsed(),
    })
}

fn collect(exits: &Receiver<JobExit<SleepJob>>, expected: usize) -> Tally {
    let mut tally = Tally::default();

    for _ in 0..expected {
        let Ok(exit) = exits.recv() else {
            break;
        };
        *tally.per_worker.entry(exit.worker).or_default() += 1;
        match exit.outcome {
            JobOutcome::Completed => tally.completed += 1,
            JobOutcome::Panicked { message } => {
                tracing::warn!("Job {} failed on worker {}: {message}", exit.job.seq, exit.worker);
                tally.panicked += 1;
            }
        }
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobpool::PoolConfig;

    fn config(workers: usize, pending: usize, jobs: usize, panic_every: usize) -> DemoConfig {
        DemoConfig {
            pool: PoolConfig::new(workers, pending).with_thread_name("demo-test"),
            job_count: jobs,
            min_job: Duration::ZERO,
            max_job: Duration::from_millis(2),
            panic_every: core::num::NonZeroUsize::new(panic_every),
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn every_job_is_accounted_for() {
        let summary = drive(&config(3, 2, 40, 0)).unwrap();
        assert_eq!(summary.submitted, 40);
        assert_eq!(summary.completed, 40);
        assert_eq!(summary.panicked, 0);
        assert_eq!(summary.per_worker.values().sum::<usize>(), 40);
        assert!(summary.per_worker.len() <= 3);
    }

    #[test]
    fn failures_are_counted_without_losing_workers() {
        let summary = drive(&config(2, 4, 30, 5)).unwrap();
        assert_eq!(summary.panicked, 6);
        assert_eq!(summary.completed, 24);
        // Both workers keep taking jobs after the failures.
        assert_eq!(summary.per_worker.len(), 2);
        assert_eq!(summary.per_worker.values().sum::<usize>(), 30);
    }

    #[test]
    fn single_worker_outlives_repeated_failures() {
        // The collector only returns once all 12 exits arrive, which a dead
        // worker could never deliver.
        let summary = drive(&config(1, 2, 12, 3)).unwrap();
        assert_eq!(summary.panicked, 4);
        assert_eq!(summary.completed, 8);
        assert_eq!(summary.per_worker.get(&WorkerId::new(1)), Some(&12));
    }
}
