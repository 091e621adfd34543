use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use ripshelf_domain::{
    CollectionItem, ContentType, DriveId, Identification, Job, JobId, JobStatus, NewWantedItem,
    WantedItem,
};

use crate::error::StoreError;
use crate::store::{
    apply_identification, apply_path, apply_status, sort_newest_first, sort_oldest_first, JobStore,
    PathField,
};

const JOBS: TableDefinition<i64, &[u8]> = TableDefinition::new("jobs");
const COLLECTION: TableDefinition<i64, &[u8]> = TableDefinition::new("collection");
const WANTED: TableDefinition<i64, &[u8]> = TableDefinition::new("wanted");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");
const META: TableDefinition<&str, i64> = TableDefinition::new("meta");

/// Persistent job store backed by a redb database file.
///
/// redb gives serialized write transactions, which is exactly the
/// single-writer model the pipeline assumes: every mutation below is one
/// begin_write/commit, so workers racing to claim a job see each other's
/// transitions atomically.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

fn internal(e: impl std::fmt::Display) -> StoreError {
    StoreError::Internal(e.to_string())
}

impl RedbStore {
    /// Open (or create) a redb database at `path`.
    ///
    /// Parent directories are created automatically.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(internal)?;
        }
        let db = Database::create(path).map_err(internal)?;

        // Ensure tables exist
        {
            let wtxn = db.begin_write().map_err(internal)?;
            wtxn.open_table(JOBS).map_err(internal)?;
            wtxn.open_table(COLLECTION).map_err(internal)?;
            wtxn.open_table(WANTED).map_err(internal)?;
            wtxn.open_table(SETTINGS).map_err(internal)?;
            wtxn.open_table(META).map_err(internal)?;
            wtxn.commit().map_err(internal)?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    fn all_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(JOBS).map_err(internal)?;
        let mut jobs = Vec::new();
        for entry in table.iter().map_err(internal)? {
            let (_k, v) = entry.map_err(internal)?;
            let job: Job = serde_json::from_slice(v.value())?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Read-modify-write one job inside a single write transaction.
    fn with_job<F>(&self, id: JobId, mutate: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), StoreError>,
    {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let job = {
            let mut table = wtxn.open_table(JOBS).map_err(internal)?;
            let bytes = table
                .get(id.as_i64())
                .map_err(internal)?
                .map(|guard| guard.value().to_vec())
                .ok_or(StoreError::JobNotFound(id))?;
            let mut job: Job = serde_json::from_slice(&bytes)?;
            mutate(&mut job)?;
            let encoded = serde_json::to_vec(&job)?;
            table
                .insert(id.as_i64(), encoded.as_slice())
                .map_err(internal)?;
            job
        };
        wtxn.commit().map_err(internal)?;
        Ok(job)
    }
}

/// Bump and return the counter stored under `key` in the meta table.
fn next_id(
    table: &mut redb::Table<'_, &'static str, i64>,
    key: &str,
) -> Result<i64, StoreError> {
    let current = table
        .get(key)
        .map_err(internal)?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = current + 1;
    table.insert(key, next).map_err(internal)?;
    Ok(next)
}

#[async_trait]
impl JobStore for RedbStore {
    async fn create_job(&self, drive_id: &DriveId, disc_label: &str) -> Result<Job, StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let job = {
            let mut meta = wtxn.open_table(META).map_err(internal)?;
            let id = next_id(&mut meta, "next_job_id")?;
            drop(meta);

            let job = Job::new(
                JobId::new(id),
                drive_id.clone(),
                disc_label.to_string(),
                Utc::now(),
            );
            let encoded = serde_json::to_vec(&job)?;
            let mut table = wtxn.open_table(JOBS).map_err(internal)?;
            table
                .insert(job.id.as_i64(), encoded.as_slice())
                .map_err(internal)?;
            job
        };
        wtxn.commit().map_err(internal)?;
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(JOBS).map_err(internal)?;
        match table.get(id.as_i64()).map_err(internal)? {
            Some(guard) => {
                let job: Job = serde_json::from_slice(guard.value())?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .all_jobs()?
            .into_iter()
            .filter(|j| j.status == status)
            .collect();
        sort_oldest_first(&mut jobs);
        Ok(jobs)
    }

    async fn pending_job_for_drive(&self, drive: &DriveId) -> Result<Option<Job>, StoreError> {
        Ok(self
            .all_jobs()?
            .into_iter()
            .filter(|j| j.status == JobStatus::Pending && &j.drive_id == drive)
            .min_by_key(|j| (j.created_at, j.id.as_i64())))
    }

    async fn recent_jobs(
        &self,
        limit: usize,
        include_archived: bool,
    ) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .all_jobs()?
            .into_iter()
            .filter(|j| include_archived || j.status != JobStatus::Archived)
            .collect();
        sort_newest_first(&mut jobs);
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn counts_by_status(&self) -> Result<HashMap<JobStatus, usize>, StoreError> {
        let mut counts = HashMap::new();
        for job in self.all_jobs()? {
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
        self.with_job(id, |job| apply_status(job, new_status, error_message, Utc::now()))
    }

    async fn update_job_identification(
        &self,
        id: JobId,
        ident: &Identification,
    ) -> Result<Job, StoreError> {
        self.with_job(id, |job| apply_identification(job, ident, Utc::now()))
    }

    async fn set_job_path(
        &self,
        id: JobId,
        field: PathField,
        value: &Path,
    ) -> Result<Job, StoreError> {
        self.with_job(id, |job| {
            apply_path(job, field, value, Utc::now());
            Ok(())
        })
    }

    async fn add_to_collection(
        &self,
        content_type: ContentType,
        title: &str,
        year: Option<i32>,
        catalog_id: Option<i64>,
        final_path: &Path,
    ) -> Result<CollectionItem, StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let item = {
            let mut meta = wtxn.open_table(META).map_err(internal)?;
            let id = next_id(&mut meta, "next_collection_id")?;
            drop(meta);

            let item = CollectionItem {
                id,
                content_type,
                title: title.to_string(),
                year,
                catalog_id,
                final_path: final_path.to_path_buf(),
                added_at: Utc::now(),
            };
            let encoded = serde_json::to_vec(&item)?;
            let mut table = wtxn.open_table(COLLECTION).map_err(internal)?;
            table.insert(item.id, encoded.as_slice()).map_err(internal)?;
            item
        };
        wtxn.commit().map_err(internal)?;
        Ok(item)
    }

    async fn get_collection(&self) -> Result<Vec<CollectionItem>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(COLLECTION).map_err(internal)?;
        let mut items = Vec::new();
        for entry in table.iter().map_err(internal)? {
            let (_k, v) = entry.map_err(internal)?;
            let item: CollectionItem = serde_json::from_slice(v.value())?;
            items.push(item);
        }
        Ok(items)
    }

    async fn remove_from_collection(&self, id: i64) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let removed = {
            let mut table = wtxn.open_table(COLLECTION).map_err(internal)?;
            let existed = table.remove(id).map_err(internal)?.is_some();
            existed
        };
        wtxn.commit().map_err(internal)?;
        if !removed {
            return Err(StoreError::CollectionNotFound(id));
        }
        Ok(())
    }

    async fn add_to_wanted(&self, item: &NewWantedItem) -> Result<WantedItem, StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let wanted = {
            let mut meta = wtxn.open_table(META).map_err(internal)?;
            let id = next_id(&mut meta, "next_wanted_id")?;
            drop(meta);

            let wanted = WantedItem {
                id,
                title: item.title.clone(),
                year: item.year,
                content_type: item.content_type,
                catalog_id: item.catalog_id,
                poster_ref: item.poster_ref.clone(),
                notes: item.notes.clone(),
                added_at: Utc::now(),
            };
            let encoded = serde_json::to_vec(&wanted)?;
            let mut table = wtxn.open_table(WANTED).map_err(internal)?;
            table.insert(wanted.id, encoded.as_slice()).map_err(internal)?;
            wanted
        };
        wtxn.commit().map_err(internal)?;
        Ok(wanted)
    }

    async fn get_wanted(&self) -> Result<Vec<WantedItem>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(WANTED).map_err(internal)?;
        let mut items = Vec::new();
        for entry in table.iter().map_err(internal)? {
            let (_k, v) = entry.map_err(internal)?;
            let item: WantedItem = serde_json::from_slice(v.value())?;
            items.push(item);
        }
        Ok(items)
    }

    async fn remove_from_wanted(&self, id: i64) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        let removed = {
            let mut table = wtxn.open_table(WANTED).map_err(internal)?;
            let existed = table.remove(id).map_err(internal)?.is_some();
            existed
        };
        wtxn.commit().map_err(internal)?;
        if !removed {
            return Err(StoreError::WantedNotFound(id));
        }
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(SETTINGS).map_err(internal)?;
        Ok(table
            .get(key)
            .map_err(internal)?
            .map(|guard| guard.value().to_string()))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(internal)?;
        {
            let mut table = wtxn.open_table(SETTINGS).map_err(internal)?;
            table.insert(key, value).map_err(internal)?;
        }
        wtxn.commit().map_err(internal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> RedbStore {
        RedbStore::open(&dir.path().join("data/ripshelf.redb")).unwrap()
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(dir.path().join("data").is_dir());
        assert!(store.all_jobs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn jobs_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ripshelf.redb");

        let id = {
            let store = RedbStore::open(&path).unwrap();
            let job = store
                .create_job(&DriveId::new("1"), "THE_MATRIX")
                .await
                .unwrap();
            store
                .update_job_status(job.id, JobStatus::Ripping, None)
                .await
                .unwrap();
            job.id
        };

        let store = RedbStore::open(&path).unwrap();
        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Ripping);
        assert_eq!(job.disc_label, "THE_MATRIX");
    }

    #[tokio::test]
    async fn id_counter_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ripshelf.redb");

        let first_id = {
            let store = RedbStore::open(&path).unwrap();
            store.create_job(&DriveId::new("1"), "A").await.unwrap().id
        };
        let store = RedbStore::open(&path).unwrap();
        let second_id = store.create_job(&DriveId::new("1"), "B").await.unwrap().id;
        assert!(second_id.as_i64() > first_id.as_i64());
    }

    #[tokio::test]
    async fn transition_guard_holds_in_redb() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let job = store.create_job(&DriveId::new("1"), "X").await.unwrap();
        let err = store
            .update_job_status(job.id, JobStatus::Encoding, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn missing_job_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let err = store
            .update_job_status(JobId::new(42), JobStatus::Ripping, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::JobNotFound(JobId(42))));
    }

    #[tokio::test]
    async fn wanted_and_collection_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let wanted = store
            .add_to_wanted(&NewWantedItem {
                title: "Ran".into(),
                year: Some(1985),
                content_type: ContentType::Movie,
                catalog_id: Some(11645),
                poster_ref: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(store.get_wanted().await.unwrap().len(), 1);
        store.remove_from_wanted(wanted.id).await.unwrap();
        assert!(store.get_wanted().await.unwrap().is_empty());

        let item = store
            .add_to_collection(
                ContentType::Movie,
                "Ran",
                Some(1985),
                Some(11645),
                Path::new("/Volumes/Movies/Ran (1985)/Ran (1985).mkv"),
            )
            .await
            .unwrap();
        let got = store.get_collection().await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "Ran");
        store.remove_from_collection(item.id).await.unwrap();
        assert!(store.get_collection().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ripshelf.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.set_setting("active_mode", "true").await.unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.get_setting("active_mode").await.unwrap().as_deref(),
            Some("true")
        );
    }
}
