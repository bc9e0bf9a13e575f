use core::fmt;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// A unit of work executed by a pool worker.
///
/// The pool treats a job as opaque: it is moved into the pending queue,
/// handed to exactly one worker, run to completion on that worker's thread,
/// and moved back out on the job-exit notification. Any state the job needs
/// (inputs, results, counters) lives inside the implementing type.
///
/// `run` may block for as long as it likes; the worker is dedicated to the
/// job until it returns. A panic inside `run` is caught by the worker and
/// reported as [`JobOutcome::Panicked`].
///
/// # Example
///
/// ```
/// use jobpool::{Job, WorkerId};
///
/// struct Greet(&'static str);
///
/// impl Job for Greet {
///     fn run(&mut self, worker: WorkerId) {
///         println!("worker {worker} greets {}", self.0);
///     }
/// }
/// ```
pub trait Job: Send + 'static {
    /// Executes the job on the worker identified by `worker`.
    fn run(&mut self, worker: WorkerId);
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&mut self, worker: WorkerId) {
        (**self).run(worker);
    }
}

/// The 1-based ordinal of a worker, unique within one dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(usize);

impl WorkerId {
    pub const fn new(no: usize) -> Self {
        Self(no)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single worker.
///
/// `Idle` covers both "waiting in the free-worker channel" and "selected by
/// the pairing loop, waiting for the hand-off". `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Executing = 1,
    Stopped = 2,
}

impl WorkerState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Executing,
            _ => Self::Stopped,
        }
    }
}

/// How a job execution ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// `run` returned normally.
    Completed,
    /// `run` panicked. The worker survived and went back to the idle set.
    Panicked {
        /// The panic payload when it was a string, otherwise a placeholder.
        message: String,
    },
}

impl JobOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Payload of the job-exit notification.
pub struct JobExit<J> {
    /// The job, moved back out of the pool.
    pub job: J,
    /// The worker that executed it.
    pub worker: WorkerId,
    pub outcome: JobOutcome,
}

impl<J> fmt::Debug for JobExit<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobExit")
            .field("worker", &self.worker)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Runs `job` inside a panic boundary so a faulty job cannot take its worker
/// down with it.
pub(crate) fn execute<J: Job>(job: &mut J, worker: WorkerId) -> JobOutcome {
    match catch_unwind(AssertUnwindSafe(|| job.run(worker))) {
        Ok(()) => JobOutcome::Completed,
        Err(payload) => JobOutcome::Panicked {
            message: panic_message(payload.as_ref()),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}
