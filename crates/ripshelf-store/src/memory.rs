use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ripshelf_domain::{
    CollectionItem, ContentType, DriveId, Identification, Job, JobId, JobStatus, NewWantedItem,
    WantedItem,
};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{
    apply_identification, apply_path, apply_status, sort_newest_first, sort_oldest_first, JobStore,
    PathField,
};

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<i64, Job>,
    next_job_id: i64,
    collection: Vec<CollectionItem>,
    next_collection_id: i64,
    wanted: Vec<WantedItem>,
    next_wanted_id: i64,
    settings: HashMap<String, String>,
}

/// In-memory implementation of [`JobStore`].
///
/// All data is lost on process exit. Suitable for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, drive_id: &DriveId, disc_label: &str) -> Result<Job, StoreError> {
        let mut guard = self.inner.write().await;
        guard.next_job_id += 1;
        let job = Job::new(
            JobId::new(guard.next_job_id),
            drive_id.clone(),
            disc_label.to_string(),
            Utc::now(),
        );
        guard.jobs.insert(job.id.as_i64(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.jobs.get(&id.as_i64()).cloned())
    }

    async fn jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<Job> = guard
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        sort_oldest_first(&mut jobs);
        Ok(jobs)
    }

    async fn pending_job_for_drive(&self, drive: &DriveId) -> Result<Option<Job>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && &j.drive_id == drive)
            .min_by_key(|j| (j.created_at, j.id.as_i64()))
            .cloned())
    }

    async fn recent_jobs(
        &self,
        limit: usize,
        include_archived: bool,
    ) -> Result<Vec<Job>, StoreError> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<Job> = guard
            .jobs
            .values()
            .filter(|j| include_archived || j.status != JobStatus::Archived)
            .cloned()
            .collect();
        sort_newest_first(&mut jobs);
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn counts_by_status(&self) -> Result<HashMap<JobStatus, usize>, StoreError> {
        let guard = self.inner.read().await;
        let mut counts = HashMap::new();
        for job in guard.jobs.values() {
            *counts.entry(job.status).or_default() += 1;
        }
        Ok(counts)
    }

    async fn update_job_status(
        &self,
        id: JobId,
        new_status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<Job, StoreError> {
        let mut guard = self.inner.write().await;
        let job = guard
            .jobs
            .get_mut(&id.as_i64())
            .ok_or(StoreError::JobNotFound(id))?;
        apply_status(job, new_status, error_message, Utc::now())?;
        Ok(job.clone())
    }

    async fn update_job_identification(
        &self,
        id: JobId,
        ident: &Identification,
    ) -> Result<Job, StoreError> {
        let mut guard = self.inner.write().await;
        let job = guard
            .jobs
            .get_mut(&id.as_i64())
            .ok_or(StoreError::JobNotFound(id))?;
        apply_identification(job, ident, Utc::now())?;
        Ok(job.clone())
    }

    async fn set_job_path(
        &self,
        id: JobId,
        field: PathField,
        value: &Path,
    ) -> Result<Job, StoreError> {
        let mut guard = self.inner.write().await;
        let job = guard
            .jobs
            .get_mut(&id.as_i64())
            .ok_or(StoreError::JobNotFound(id))?;
        apply_path(job, field, value, Utc::now());
        Ok(job.clone())
    }

    async fn add_to_collection(
        &self,
        content_type: ContentType,
        title: &str,
        year: Option<i32>,
        catalog_id: Option<i64>,
        final_path: &Path,
    ) -> Result<CollectionItem, StoreError> {
        let mut guard = self.inner.write().await;
        guard.next_collection_id += 1;
        let item = CollectionItem {
            id: guard.next_collection_id,
            content_type,
            title: title.to_string(),
            year,
            catalog_id,
            final_path: final_path.to_path_buf(),
            added_at: Utc::now(),
        };
        guard.collection.push(item.clone());
        Ok(item)
    }

    async fn get_collection(&self) -> Result<Vec<CollectionItem>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.collection.clone())
    }

    async fn remove_from_collection(&self, id: i64) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let before = guard.collection.len();
        guard.collection.retain(|item| item.id != id);
        if guard.collection.len() == before {
            return Err(StoreError::CollectionNotFound(id));
        }
        Ok(())
    }

    async fn add_to_wanted(&self, item: &NewWantedItem) -> Result<WantedItem, StoreError> {
        let mut guard = self.inner.write().await;
        guard.next_wanted_id += 1;
        let wanted = WantedItem {
            id: guard.next_wanted_id,
            title: item.title.clone(),
            year: item.year,
            content_type: item.content_type,
            catalog_id: item.catalog_id,
            poster_ref: item.poster_ref.clone(),
            notes: item.notes.clone(),
            added_at: Utc::now(),
        };
        guard.wanted.push(wanted.clone());
        Ok(wanted)
    }

    async fn get_wanted(&self) -> Result<Vec<WantedItem>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.wanted.clone())
    }

    async fn remove_from_wanted(&self, id: i64) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let before = guard.wanted.len();
        guard.wanted.retain(|item| item.id != id);
        if guard.wanted.len() == before {
            return Err(StoreError::WantedNotFound(id));
        }
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
