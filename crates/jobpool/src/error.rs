//! Error types for the job pool.
//!
//! The pool has a deliberately small failure surface:
//!
//! - `InvalidConfig`: the [`PoolConfig`](crate::PoolConfig) cannot describe a
//!   working pool (for example zero workers).
//! - `AlreadyStarted`: a worker's loop was started a second time.
//! - `AlreadyStopped`: a worker's stop signal was raised a second time.
//! - `AlreadyRunning`: a dispatcher was started a second time.
//! - `Spawn`: the operating system refused to create a thread.
//!
//! Backpressure is *not* an error in this sense. A full pending queue is an
//! expected outcome of [`Dispatcher::try_enqueue`](crate::Dispatcher::try_enqueue)
//! and is reported through [`QueueFull`], which returns the rejected job to
//! the caller.

use crate::job::WorkerId;
use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for pool construction and worker lifecycle misuse.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The pool configuration was rejected before any thread was created.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The worker's execution loop is already running.
    #[error("Worker {worker} was already started")]
    AlreadyStarted { worker: WorkerId },

    /// The worker's stop signal has already been raised.
    #[error("Worker {worker} was already stopped")]
    AlreadyStopped { worker: WorkerId },

    /// The dispatcher's roster and pairing loop already exist.
    #[error("Dispatcher is already running")]
    AlreadyRunning,

    /// A worker or pairing thread could not be spawned.
    #[error("Failed to spawn thread: {context}")]
    Spawn { context: String },
}

/// Returned by [`Dispatcher::try_enqueue`](crate::Dispatcher::try_enqueue)
/// when the pending queue is at capacity.
///
/// Carries the rejected job so the caller can retry, drop or escalate it.
pub struct QueueFull<J>(pub J);

impl<J> QueueFull<J> {
    /// Recovers the job that was not accepted.
    pub fn into_inner(self) -> J {
        self.0
    }
}

impl<J> fmt::Debug for QueueFull<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<J> fmt::Display for QueueFull<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pending job queue is full")
    }
}

impl<J> std::error::Error for QueueFull<J> {}
