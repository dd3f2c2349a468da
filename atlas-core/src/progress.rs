//! Progress reporting for asynchronous jobs.
//!
//! The job runner calls a [`ProgressListener`] after every status write.
//! Library callers can use [`NoopListener`], [`TracingListener`], or any
//! `Fn(&JobStatus)` closure.

use tracing::{info, warn};

use crate::job::{JobState, JobStatus};

/// Receives every status snapshot a job publishes, in order.
pub trait ProgressListener: Send + Sync {
    fn on_status(&self, status: &JobStatus);
}

impl<F> ProgressListener for F
where
    F: Fn(&JobStatus) + Send + Sync,
{
    fn on_status(&self, status: &JobStatus) {
        self(status);
    }
}

/// Listener that ignores all updates.
#[derive(Debug, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_status(&self, _status: &JobStatus) {}
}

/// Listener that logs each update as a `tracing` event.
#[derive(Debug, Default)]
pub struct TracingListener;

impl ProgressListener for TracingListener {
    fn on_status(&self, status: &JobStatus) {
        match status.status {
            JobState::Failed => warn!(
                job = %status.id,
                progress = status.progress,
                error = status.error.as_deref().unwrap_or_default(),
                "Job failed"
            ),
            state => info!(
                job = %status.id,
                state = %state,
                progress = status.progress,
                step = status.current_step.as_deref().unwrap_or_default(),
                "Job progress"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn closures_are_listeners() {
        let seen = Mutex::new(Vec::new());
        let listener = |s: &JobStatus| seen.lock().unwrap().push(s.progress);
        let mut status = JobStatus::pending("j");
        listener.on_status(&status);
        status.progress = 10.0;
        listener.on_status(&status);
        NoopListener.on_status(&status);
        TracingListener.on_status(&status);
        assert_eq!(*seen.lock().unwrap(), [0.0, 10.0]);
    }
}
