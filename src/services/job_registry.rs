//! In-memory registry of job records.
//!
//! The registry lock guards only the id → handle map. Each handle carries its
//! own short-lived lock over the job record; it is never held across a stage,
//! so readers see a consistent snapshot without waiting on pipeline work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Job, JobStatus};

/// Shared handle to one registered job.
pub struct JobHandle {
    id: Uuid,
    job: RwLock<Job>,
    claimed: AtomicBool,
    status_tx: watch::Sender<JobStatus>,
}

impl JobHandle {
    fn new(job: Job) -> Self {
        let (status_tx, _) = watch::channel(job.status);
        Self {
            id: job.id,
            job: RwLock::new(job),
            claimed: AtomicBool::new(false),
            status_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Consistent copy of the current record.
    pub async fn snapshot(&self) -> Job {
        self.job.read().await.clone()
    }

    pub async fn is_canceled(&self) -> bool {
        self.job.read().await.canceled
    }

    /// Set the cancellation flag. Returns `true` the first time.
    pub async fn request_cancel(&self) -> bool {
        self.job.write().await.request_cancel()
    }

    /// Claim the single execution slot. Only the first caller gets `true`.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Mutate the record. Only the owning execution calls this.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Job) -> R) -> R {
        let mut job = self.job.write().await;
        f(&mut job)
    }

    /// Announce a status to waiters.
    pub fn publish(&self, status: JobStatus) {
        self.status_tx.send_replace(status);
    }

    /// Resolve once a terminal status has been published.
    pub async fn wait_terminal(&self) -> JobStatus {
        let mut rx = self.status_tx.subscribe();
        let published = rx.wait_for(JobStatus::is_terminal).await.map(|s| *s);
        match published {
            Ok(status) => status,
            // the sender lives as long as `self`, so this is unreachable in practice
            Err(_) => self.job.read().await.status,
        }
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("claimed", &self.is_claimed())
            .finish_non_exhaustive()
    }
}

/// Concurrency-safe map from job id to job handle.
///
/// Records are never evicted.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, Arc<JobHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job. Ids must be unique.
    pub async fn insert(&self, job: Job) -> DomainResult<Arc<JobHandle>> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(DomainError::DuplicateJob(job.id));
        }
        let handle = Arc::new(JobHandle::new(job));
        jobs.insert(handle.id(), Arc::clone(&handle));
        Ok(handle)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Arc<JobHandle>> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DomainError::JobNotFound(id))
    }

    /// Every registered handle, in no particular order.
    pub async fn list(&self) -> Vec<Arc<JobHandle>> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
