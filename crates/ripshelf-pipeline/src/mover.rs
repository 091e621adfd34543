//! The file mover: carries an encoded artifact into the library, records
//! collection membership and clears the per-job scratch directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ripshelf_domain::{Job, JobStatus};
use ripshelf_driver::Notifier;
use ripshelf_store::{JobStore, PathField};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{paths, Pass, PipelineError, WORKER_IDLE};

pub struct MoveWorker {
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    movies_root: PathBuf,
    workspace_root: PathBuf,
    idle: Duration,
    shutdown: watch::Receiver<bool>,
}

impl MoveWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
        movies_root: PathBuf,
        workspace_root: PathBuf,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            notifier,
            movies_root,
            workspace_root,
            idle: WORKER_IDLE,
            shutdown,
        }
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            match self.pass().await {
                Ok(Pass::Worked) => continue,
                Ok(Pass::Stop) => break,
                Ok(Pass::Idle) => {}
                Err(e) => error!(error = %e, "mover pass failed"),
            }
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.idle) => {}
            }
        }
        info!("mover stopped");
    }

    async fn pass(&mut self) -> Result<Pass, PipelineError> {
        let moving = self.store.jobs_by_status(JobStatus::Moving).await?;
        let Some(job) = moving.into_iter().next() else {
            return Ok(Pass::Idle);
        };

        let Some(encode_path) = job.encode_path.clone() else {
            self.fail(&job, "no encoded artifact recorded").await;
            return Ok(Pass::Worked);
        };

        // An absent root usually means the external volume is unmounted.
        // Leave the job where it is and try again next pass.
        if !self.movies_root.exists() {
            debug!(
                job_id = %job.id,
                root = %self.movies_root.display(),
                "library root absent, holding job"
            );
            return Ok(Pass::Idle);
        }

        let title = display_title(&job);
        let extension = encode_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mkv")
            .to_string();
        let destination =
            paths::movie_destination(&self.movies_root, &title, job.identified_year, &extension);

        if let Some(parent) = destination.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                self.fail(&job, &format!("could not create {}: {}", parent.display(), e))
                    .await;
                return Ok(Pass::Worked);
            }
        }

        match move_file(&encode_path, &destination).await {
            Ok(()) => {
                self.store
                    .set_job_path(job.id, PathField::Final, &destination)
                    .await?;
                self.store
                    .update_job_status(job.id, JobStatus::Complete, None)
                    .await?;
                self.store
                    .add_to_collection(
                        job.content_type,
                        &title,
                        job.identified_year,
                        job.catalog_id,
                        &destination,
                    )
                    .await?;
                info!(job_id = %job.id, destination = %destination.display(), "filed into library");

                self.cleanup_scratch(&job).await;

                self.notifier
                    .notify(
                        "Added to library",
                        &format!("{} is ready", title),
                        0,
                        None,
                    )
                    .await;
            }
            Err(e) => {
                self.fail(&job, &format!("move failed: {}", e)).await;
            }
        }
        Ok(Pass::Worked)
    }

    /// Scratch removal is best effort; a leftover directory is an eyesore,
    /// not a pipeline failure.
    async fn cleanup_scratch(&self, job: &Job) {
        for dir in [
            paths::staging_dir(&self.workspace_root, job.id),
            paths::encoding_dir(&self.workspace_root, job.id),
        ] {
            if !dir.exists() {
                continue;
            }
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                error!(job_id = %job.id, dir = %dir.display(), error = %e, "scratch cleanup failed");
            }
        }
    }

    async fn fail(&self, job: &Job, reason: &str) {
        error!(job_id = %job.id, reason, "move failed");
        if let Err(e) = self
            .store
            .update_job_status(job.id, JobStatus::Failed, Some(reason))
            .await
        {
            error!(job_id = %job.id, error = %e, "could not record move failure");
        }
    }
}

/// What to call the file when identification never produced a title.
fn display_title(job: &Job) -> String {
    if let Some(title) = &job.identified_title {
        return title.clone();
    }
    if !job.disc_label.is_empty() {
        return job.disc_label.clone();
    }
    format!("Disc {}", job.id)
}

/// Rename, falling back to copy+remove since rename cannot cross
/// filesystems and the library usually lives on an external volume.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    if let Err(e) = tokio::fs::remove_file(from).await {
        warn!(from = %from.display(), error = %e, "source removal after copy failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripshelf_domain::{DriveId, JobId};

    #[test]
    fn display_title_prefers_identification() {
        let mut job = Job::new(
            JobId::new(3),
            DriveId::new("1"),
            "THE_MATRIX".into(),
            chrono::Utc::now(),
        );
        assert_eq!(display_title(&job), "THE_MATRIX");
        job.identified_title = Some("The Matrix".into());
        assert_eq!(display_title(&job), "The Matrix");
        job.identified_title = None;
        job.disc_label = String::new();
        assert_eq!(display_title(&job), "Disc 3");
    }
}
