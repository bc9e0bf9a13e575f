use crate::error::{Error, Result};

/// Default prefix for worker and pairing thread names.
pub const DEFAULT_THREAD_NAME: &str = "jobpool";

/// Sizing for a [`Dispatcher`](crate::Dispatcher).
///
/// Both capacities are fixed for the lifetime of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, and the capacity of the free-worker channel.
    pub max_workers: usize,
    /// Capacity of the pending-job queue. Zero makes the queue a rendezvous:
    /// a job is only accepted while the pairing loop is waiting for one.
    pub max_pending_jobs: usize,
    /// Prefix for thread names. Workers are named `{thread_name}-{no}` and
    /// the pairing loop `{thread_name}-dispatch`.
    pub thread_name: String,
}

impl PoolConfig {
    pub fn new(max_workers: usize, max_pending_jobs: usize) -> Self {
        Self {
            max_workers,
            max_pending_jobs,
            thread_name: String::from(DEFAULT_THREAD_NAME),
        }
    }

    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Checks that the configuration describes a usable pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_workers` is zero or the
    /// thread name prefix is empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: String::from("max_workers must be greater than 0"),
            });
        }
        if self.thread_name.is_empty() {
            return Err(Error::InvalidConfig {
                reason: String::from("thread_name must not be empty"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        let err = PoolConfig::new(0, 4).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn zero_pending_jobs_is_allowed() {
        assert!(PoolConfig::new(1, 0).validate().is_ok());
    }

    #[test]
    fn empty_thread_name_is_rejected() {
        let err = PoolConfig::new(2, 2)
            .with_thread_name("")
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidConfig {
                reason: "thread_name must not be empty".into()
            }
        );
    }
}
