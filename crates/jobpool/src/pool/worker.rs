//! A single long-lived worker thread.
//!
//! A [`Worker`] owns one execution loop. The loop waits on two events at once:
//! a job arriving in the worker's private, unbuffered inbox, or the worker's
//! stop signal. Each job is run to completion inside a panic boundary, after
//! which the worker announces the exit (if an exit sink was configured) and
//! then puts itself back on the shared free-worker channel, always in that
//! order.

use crate::{
    error::{Error, Result},
    job::{Job, JobExit, WorkerId, WorkerState, execute},
};
use core::fmt;
use crossbeam_channel::{Receiver, Sender, bounded, select};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

/// Handle to a pool worker.
///
/// Handles are cheap to clone and every clone refers to the same loop, so the
/// dispatcher can pass a worker through the free-worker channel while the
/// caller keeps its own copy in the roster.
pub struct Worker<J: Job> {
    inner: Arc<WorkerInner<J>>,
}

struct WorkerInner<J: Job> {
    id: WorkerId,
    thread_name: String,
    inbox: Sender<J>,
    stop_tx: Sender<()>,
    stopped: AtomicBool,
    state: AtomicU8,
    // Taken by the first `start`; `None` afterwards.
    parts: Mutex<Option<LoopParts<J>>>,
}

/// Everything the execution loop owns exclusively.
struct LoopParts<J: Job> {
    inbox: Receiver<J>,
    stop: Receiver<()>,
    free: Sender<Worker<J>>,
    exits: Option<Sender<JobExit<J>>>,
    returned: Sender<J>,
}

impl<J: Job> Worker<J> {
    /// Creates a worker that is not yet running.
    ///
    /// - `free`: shared channel on which the worker announces it is idle.
    /// - `exits`: optional job-exit sink. `None` skips the announcement.
    /// - `returned`: where a job received after `stop` is handed back so the
    ///   dispatcher can give it to a live worker.
    pub(crate) fn new(
        id: WorkerId,
        thread_name: &str,
        free: Sender<Worker<J>>,
        exits: Option<Sender<JobExit<J>>>,
        returned: Sender<J>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(1);

        Self {
            inner: Arc::new(WorkerInner {
                id,
                thread_name: format!("{thread_name}-{id}"),
                inbox: inbox_tx,
                stop_tx,
                stopped: AtomicBool::new(false),
                state: AtomicU8::new(WorkerState::Idle as u8),
                parts: Mutex::new(Some(LoopParts {
                    inbox: inbox_rx,
                    stop: stop_rx,
                    free,
                    exits,
                    returned,
                })),
            }),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.inner.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether the stop signal has been raised. The loop may still be
    /// finishing its current job.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Launches the execution loop on its own thread and returns immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if the loop was started before.
    /// - [`Error::Spawn`] if the thread could not be created.
    pub fn start(&self) -> Result<()> {
        let Some(parts) = self.inner.parts.lock().take() else {
            return Err(Error::AlreadyStarted { worker: self.id() });
        };

        let worker = self.clone();
        thread::Builder::new()
            .name(self.inner.thread_name.clone())
            .spawn(move || worker.run_loop(parts))
            .map_err(|e| Error::Spawn {
                context: format!("worker {}: {e}", self.id()),
            })?;

        Ok(())
    }

    /// Raises the stop signal.
    ///
    /// The worker accepts no further jobs. A job that is already running
    /// completes and its exit is still announced, but the worker does not
    /// return to the free set afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStopped`] on every call after the first.
    pub fn stop(&self) -> Result<()> {
        if self
            .inner
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyStopped { worker: self.id() });
        }

        // Capacity 1 and guarded by the flag above, so this never fills.
        let _ = self.inner.stop_tx.try_send(());
        Ok(())
    }

    /// Hands `job` to the worker, blocking until the loop receives it.
    ///
    /// Gives the job back if the loop has terminated.
    pub(crate) fn hand_off(&self, job: J) -> core::result::Result<(), J> {
        self.inner.inbox.send(job).map_err(|e| e.into_inner())
    }

    fn set_state(&self, state: WorkerState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }

    fn run_loop(self, parts: LoopParts<J>) {
        let LoopParts {
            inbox,
            stop,
            free,
            exits,
            returned,
        } = parts;
        let id = self.id();

        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {id} started");

        loop {
            select! {
                recv(stop) -> _ => break,
                recv(inbox) -> msg => {
                    let Ok(mut job) = msg else { break };

                    // Lost the race against `stop`: the job must go to a live
                    // worker instead.
                    if self.is_stopped() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Worker {id} stopped, returning job to dispatcher");
                        if returned.send(job).is_err() {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("Worker {id} dropped a job, pairing loop is gone");
                        }
                        break;
                    }

                    self.set_state(WorkerState::Executing);
                    let outcome = execute(&mut job, id);

                    #[cfg(feature = "tracing")]
                    if let crate::job::JobOutcome::Panicked { message } = &outcome {
                        tracing::warn!("Job panicked on worker {id}: {message}");
                    }

                    if let Some(exits) = &exits {
                        if exits.send(JobExit { job, worker: id, outcome }).is_err() {
                            #[cfg(feature = "tracing")]
                            tracing::trace!("Worker {id} exit sink disconnected");
                        }
                    }

                    if self.is_stopped() {
                        break;
                    }
                    self.set_state(WorkerState::Idle);
                    if free.send(self.clone()).is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(WorkerState::Stopped);

        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {id} stopped");
    }
}

impl<J: Job> Clone for Worker<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: Job> fmt::Debug for Worker<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Tally(Arc<AtomicUsize>);

    impl Job for Tally {
        fn run(&mut self, _worker: WorkerId) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    struct Channels {
        free: Receiver<Worker<Tally>>,
        exits: Receiver<JobExit<Tally>>,
        returned: Receiver<Tally>,
    }

    fn worker(exit_capacity: usize) -> (Worker<Tally>, Channels) {
        let (free_tx, free_rx) = bounded(1);
        let (exit_tx, exit_rx) = bounded(exit_capacity);
        let (ret_tx, ret_rx) = unbounded();
        let worker = Worker::new(WorkerId::new(1), "test", free_tx, Some(exit_tx), ret_tx);
        (
            worker,
            Channels {
                free: free_rx,
                exits: exit_rx,
                returned: ret_rx,
            },
        )
    }

    fn wait_for_state(worker: &Worker<Tally>, state: WorkerState) {
        let deadline = Instant::now() + TIMEOUT;
        while worker.state() != state {
            assert!(Instant::now() < deadline, "worker never reached {state:?}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn starting_twice_is_rejected() {
        let (worker, _chans) = worker(1);
        worker.start().unwrap();
        assert_eq!(
            worker.start(),
            Err(Error::AlreadyStarted {
                worker: WorkerId::new(1)
            })
        );
        worker.stop().unwrap();
    }

    #[test]
    fn stopping_twice_is_a_reported_fault() {
        let (worker, _chans) = worker(1);
        worker.start().unwrap();
        assert!(worker.stop().is_ok());
        assert_eq!(
            worker.stop(),
            Err(Error::AlreadyStopped {
                worker: WorkerId::new(1)
            })
        );
        wait_for_state(&worker, WorkerState::Stopped);
    }

    #[test]
    fn runs_job_then_announces_exit_before_free() {
        // A rendezvous exit sink keeps the worker parked until we read the
        // exit, so the free channel must still be empty at that point.
        let (worker, chans) = worker(0);
        worker.start().unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        assert!(worker.hand_off(Tally(Arc::clone(&count))).is_ok());

        thread::sleep(Duration::from_millis(20));
        assert!(chans.free.is_empty());

        let exit = chans.exits.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(exit.worker, WorkerId::new(1));
        assert!(exit.outcome.is_completed());
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);

        let again = chans.free.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(again.id(), worker.id());
        assert_eq!(worker.state(), WorkerState::Idle);
        worker.stop().unwrap();
    }

    #[test]
    fn stopped_worker_never_runs_a_handed_off_job() {
        let (worker, chans) = worker(1);
        worker.start().unwrap();
        worker.stop().unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        // Either the loop is already gone and the job comes straight back,
        // or the loop receives it, sees the stop flag and returns it.
        if worker.hand_off(Tally(Arc::clone(&count))).is_ok() {
            chans.returned.recv_timeout(TIMEOUT).unwrap();
        }

        wait_for_state(&worker, WorkerState::Stopped);
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(chans.exits.is_empty());
        assert!(worker.hand_off(Tally(count)).is_err());
    }
}
