//! A fixed-size concurrent job-execution pool.
//!
//! A [`Dispatcher`] owns a roster of long-lived [`Worker`] threads, a bounded
//! pending-job queue and a single pairing thread that matches one idle worker
//! with one pending job at a time. Producers submit with
//! [`Dispatcher::try_enqueue`], which never blocks and hands the job back in
//! [`QueueFull`] when the queue is at capacity.
//!
//! Every execution ends with an optional [`JobExit`] notification followed by
//! the worker rejoining the idle set. A panicking job is reported as
//! [`JobOutcome::Panicked`] and does not cost the pool a worker.
//!
//! ```
//! use jobpool::{Dispatcher, Job, PoolConfig, WorkerId};
//!
//! struct Square(u64, u64);
//!
//! impl Job for Square {
//!     fn run(&mut self, _worker: WorkerId) {
//!         self.1 = self.0 * self.0;
//!     }
//! }
//!
//! let (exits_tx, exits_rx) = crossbeam_channel::bounded(4);
//! let pool = Dispatcher::new(PoolConfig::new(2, 4), Some(exits_tx)).unwrap();
//! pool.run().unwrap();
//!
//! assert!(pool.try_enqueue(Square(7, 0)).is_ok());
//! let exit = exits_rx.recv().unwrap();
//! assert_eq!(exit.job.1, 49);
//!
//! for worker in pool.workers() {
//!     worker.stop().unwrap();
//! }
//! ```

mod config;
mod error;
mod job;
mod pool;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::job::{Job, JobExit, JobOutcome, WorkerId, WorkerState};
pub use crate::pool::*;
