//! The dispatcher: worker roster, pending-job queue and pairing loop.
//!
//! Producers push jobs with [`Dispatcher::try_enqueue`], which never blocks.
//! A single pairing thread repeatedly takes one idle worker off the
//! free-worker channel, then one job off the pending queue, and hands the job
//! to that worker. Pairings happen strictly one at a time.
//!
//! All coordination goes through bounded `crossbeam-channel` hand-offs:
//!
//! - free-worker channel, capacity `max_workers`
//! - pending-job channel, capacity `max_pending_jobs`
//! - optional job-exit sink, owned by the caller
//!
//! plus an internal, unbounded "returned" channel on which a worker that was
//! stopped while being paired gives its job back.

use crate::{
    config::PoolConfig,
    error::{Error, QueueFull, Result},
    job::{Job, JobExit, WorkerId},
    pool::worker::Worker,
};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, unbounded};
use std::sync::OnceLock;
use std::thread;

/// A fixed-size pool of workers fed from a bounded pending-job queue.
///
/// The dispatcher is not `Clone`; share it behind an `Arc` when several
/// producers need to enqueue.
pub struct Dispatcher<J: Job> {
    config: PoolConfig,
    free_tx: Sender<Worker<J>>,
    free_rx: Receiver<Worker<J>>,
    pending_tx: Sender<J>,
    pending_rx: Receiver<J>,
    returned_tx: Sender<J>,
    returned_rx: Receiver<J>,
    exits: Option<Sender<JobExit<J>>>,
    workers: OnceLock<Vec<Worker<J>>>,
}

impl<J: Job> Dispatcher<J> {
    /// Allocates the pool's channels. No thread is started until
    /// [`run`](Self::run).
    ///
    /// When `exits` is `None`, workers skip the job-exit announcement
    /// entirely. When it is `Some`, each worker blocks on `exits.send` after
    /// every job, so the caller must keep draining it (or size it
    /// generously).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: PoolConfig, exits: Option<Sender<JobExit<J>>>) -> Result<Self> {
        config.validate()?;

        let (free_tx, free_rx) = bounded(config.max_workers);
        let (pending_tx, pending_rx) = bounded(config.max_pending_jobs);
        let (returned_tx, returned_rx) = unbounded();

        Ok(Self {
            config,
            free_tx,
            free_rx,
            pending_tx,
            pending_rx,
            returned_tx,
            returned_rx,
            exits,
            workers: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Creates and starts `max_workers` workers numbered from 1, fills the
    /// free-worker channel with them, then launches the pairing loop.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRunning`] on a second call.
    /// - [`Error::Spawn`] if a thread could not be created. Workers started
    ///   before the failure are stopped again.
    pub fn run(&self) -> Result<()> {
        if self.workers.get().is_some() {
            return Err(Error::AlreadyRunning);
        }

        let mut roster = Vec::with_capacity(self.config.max_workers);
        for no in 1..=self.config.max_workers {
            let worker = Worker::new(
                WorkerId::new(no),
                &self.config.thread_name,
                self.free_tx.clone(),
                self.exits.clone(),
                self.returned_tx.clone(),
            );
            if let Err(e) = worker.start() {
                abandon(&roster);
                return Err(e);
            }
            roster.push(worker);
        }

        // Lost a race against a concurrent `run`.
        if let Err(roster) = self.workers.set(roster) {
            abandon(&roster);
            return Err(Error::AlreadyRunning);
        }
        let roster = self.workers();

        for worker in roster {
            // The channel holds exactly `max_workers` entries.
            let _ = self.free_tx.try_send(worker.clone());
        }

        let pairing = Pairing {
            free: self.free_rx.clone(),
            pending: self.pending_rx.clone(),
            returned: self.returned_rx.clone(),
        };
        if let Err(e) = thread::Builder::new()
            .name(format!("{}-dispatch", self.config.thread_name))
            .spawn(move || pairing.run())
        {
            abandon(roster);
            return Err(Error::Spawn {
                context: format!("pairing loop: {e}"),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Dispatcher running with {} workers and {} pending slots",
            self.config.max_workers,
            self.config.max_pending_jobs
        );

        Ok(())
    }

    /// Places `job` on the pending queue without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] with the job when the queue already holds
    /// `max_pending_jobs` undispatched jobs. The pool never retries on the
    /// caller's behalf.
    pub fn try_enqueue(&self, job: J) -> core::result::Result<(), QueueFull<J>> {
        match self.pending_tx.try_send(job) {
            Ok(()) => Ok(()),
            // The dispatcher holds a receiver, so the queue cannot disconnect
            // while `self` is alive.
            Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => Err(QueueFull(job)),
        }
    }

    /// The worker roster, in ordinal order. Empty before [`run`](Self::run).
    ///
    /// Stopping workers is the caller's job; the dispatcher never stops one
    /// on its own.
    pub fn workers(&self) -> &[Worker<J>] {
        self.workers.get().map_or(&[], Vec::as_slice)
    }

    /// Looks up a worker by its 1-based ordinal.
    pub fn worker(&self, no: usize) -> Option<&Worker<J>> {
        no.checked_sub(1).and_then(|idx| self.workers().get(idx))
    }

    /// Number of jobs waiting in the pending queue.
    pub fn pending_jobs(&self) -> usize {
        self.pending_rx.len()
    }

    /// Number of workers currently sitting in the free-worker channel.
    ///
    /// A worker already taken by the pairing loop but not yet handed a job is
    /// not counted here, although its [`state`](Worker::state) is still idle.
    pub fn idle_workers(&self) -> usize {
        self.free_rx.len()
    }
}

/// Receivers owned by the pairing thread.
struct Pairing<J: Job> {
    free: Receiver<Worker<J>>,
    pending: Receiver<J>,
    returned: Receiver<J>,
}

impl<J: Job> Pairing<J> {
    fn run(self) {
        // A job whose hand-off failed because the chosen worker had stopped.
        let mut carried: Option<J> = None;

        loop {
            let Some(worker) = self.next_live_worker() else {
                break;
            };

            let job = match carried.take() {
                Some(job) => job,
                None => match self.next_job() {
                    Some(job) => job,
                    None => break,
                },
            };

            if let Err(job) = worker.hand_off(job) {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {} gone during hand-off, re-pairing job", worker.id());
                carried = Some(job);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Pairing loop exiting");
    }

    /// Blocks for the next free worker, discarding any that were stopped
    /// while idle. `None` once no worker can ever become free again.
    fn next_live_worker(&self) -> Option<Worker<J>> {
        loop {
            let worker = self.free.recv().ok()?;
            if !worker.is_stopped() {
                return Some(worker);
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("Skipping stopped worker {}", worker.id());
        }
    }

    /// Blocks for the next job. Jobs given back by stopped workers go first.
    /// `None` once the dispatcher has been dropped.
    fn next_job(&self) -> Option<J> {
        if let Ok(job) = self.returned.try_recv() {
            return Some(job);
        }
        select! {
            recv(self.returned) -> job => job.ok(),
            recv(self.pending) -> job => job.ok(),
        }
    }
}

fn abandon<J: Job>(workers: &[Worker<J>]) {
    for worker in workers {
        let _ = worker.stop();
    }
}
