use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ripshelf_domain::{
    CollectionItem, ContentType, DriveId, Identification, Job, JobId, JobStatus, NewWantedItem,
    WantedItem,
};

use crate::error::StoreError;

/// Which artifact-path field to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    Rip,
    Encode,
    Final,
}

/// The single durable source of truth for jobs, collection, wanted items and
/// settings. All status transitions are validated here; workers never mutate
/// a job except through these methods.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Create a pending job for a freshly detected disc.
    async fn create_job(&self, drive_id: &DriveId, disc_label: &str) -> Result<Job, StoreError>;

    async fn get_job(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Jobs in `status`, oldest `updated_at` first (pipeline fairness).
    async fn jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    /// Oldest pending job bound to `drive`, by creation order.
    async fn pending_job_for_drive(&self, drive: &DriveId) -> Result<Option<Job>, StoreError>;

    /// Most recently touched jobs, newest first.
    async fn recent_jobs(&self, limit: usize, include_archived: bool)
        -> Result<Vec<Job>, StoreError>;

    async fn counts_by_status(&self) -> Result<HashMap<JobStatus, usize>, StoreError>;

    /// Transition a job. Rejects edges absent from the lifecycle graph with
    /// [`StoreError::InvalidTransition`]; bumps `updated_at`.
    async fn update_job_status(
        &self,
        id: JobId,
        new_status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<Job, StoreError>;

    /// Write the identification fields as one unit. Does not change status.
    async fn update_job_identification(
        &self,
        id: JobId,
        ident: &Identification,
    ) -> Result<Job, StoreError>;

    async fn set_job_path(
        &self,
        id: JobId,
        field: PathField,
        value: &Path,
    ) -> Result<Job, StoreError>;

    async fn add_to_collection(
        &self,
        content_type: ContentType,
        title: &str,
        year: Option<i32>,
        catalog_id: Option<i64>,
        final_path: &Path,
    ) -> Result<CollectionItem, StoreError>;

    async fn get_collection(&self) -> Result<Vec<CollectionItem>, StoreError>;

    async fn remove_from_collection(&self, id: i64) -> Result<(), StoreError>;

    async fn add_to_wanted(&self, item: &NewWantedItem) -> Result<WantedItem, StoreError>;

    async fn get_wanted(&self) -> Result<Vec<WantedItem>, StoreError>;

    async fn remove_from_wanted(&self, id: i64) -> Result<(), StoreError>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ── Shared mutation helpers ───────────────────────────────────────────────────
//
// Both backends funnel job mutations through these so the transition guard
// and timestamp behavior cannot drift between them.

pub(crate) fn apply_status(
    job: &mut Job,
    new_status: JobStatus,
    error_message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if !job.status.can_transition_to(new_status) {
        return Err(StoreError::InvalidTransition {
            from: job.status,
            to: new_status,
        });
    }
    job.status = new_status;
    if let Some(message) = error_message {
        job.error_message = Some(message.to_string());
    }
    job.updated_at = now;
    Ok(())
}

pub(crate) fn apply_identification(
    job: &mut Job,
    ident: &Identification,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    ident.validate()?;
    job.content_type = ident.content_type;
    job.identified_title = ident.title.clone();
    job.identified_year = ident.year;
    job.catalog_id = ident.catalog_id;
    job.confidence = ident.confidence;
    job.poster_ref = ident.poster_ref.clone();
    job.updated_at = now;
    Ok(())
}

pub(crate) fn apply_path(job: &mut Job, field: PathField, value: &Path, now: DateTime<Utc>) {
    let value: PathBuf = value.to_path_buf();
    match field {
        PathField::Rip => job.rip_path = Some(value),
        PathField::Encode => job.encode_path = Some(value),
        PathField::Final => job.final_path = Some(value),
    }
    job.updated_at = now;
}

/// Oldest `updated_at` first, id as the tie-break so coarse clocks stay FIFO.
pub(crate) fn sort_oldest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then(a.id.as_i64().cmp(&b.id.as_i64()))
    });
}

pub(crate) fn sort_newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then(b.id.as_i64().cmp(&a.id.as_i64()))
    });
}
