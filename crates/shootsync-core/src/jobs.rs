//! Job tracking and cancellation.
//!
//! A full scan runs as a job; its [`CancelToken`] is checked before each
//! per-file pipeline is launched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Unique identifier for a job.
pub type JobId = u64;

/// Token for checking and signaling job cancellation.
///
/// Clone this token to share cancellation state across threads.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    job_id: JobId,
}

impl CancelToken {
    /// Create a new cancel token for the given job ID.
    pub fn new(job_id: JobId) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            job_id,
        }
    }

    /// A token that is never tracked by a manager.
    pub fn detached() -> Self {
        Self::new(0)
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Request cancellation of this job.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Get the job ID associated with this token.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

/// Manager for tracking and cancelling long-running jobs.
#[derive(Debug, Default)]
pub struct JobManager {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, CancelToken>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new job and return its cancel token.
    pub fn start_job(&self) -> CancelToken {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new(job_id);
        self.jobs.write().insert(job_id, token.clone());
        token
    }

    /// Cancel a job by its ID.
    ///
    /// Returns true if the job was found and cancelled.
    pub fn cancel_job(&self, job_id: JobId) -> bool {
        match self.jobs.read().get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel all running jobs, returning how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let jobs = self.jobs.read();
        for token in jobs.values() {
            token.cancel();
        }
        jobs.len()
    }

    /// Remove a completed job from tracking.
    pub fn complete_job(&self, job_id: JobId) {
        self.jobs.write().remove(&job_id);
    }

    /// Get the number of active jobs.
    pub fn active_job_count(&self) -> usize {
        self.jobs.read().len()
    }
}
