//! Per-drive rip worker: claims the oldest pending job for its drive,
//! selects the main title, rips it into staging and ejects the disc.
//! Never advances a job past ripped.

use std::sync::Arc;
use std::time::Duration;

use ripshelf_domain::{DriveId, JobId, JobStatus};
use ripshelf_driver::{Ripper, TitleInfo};
use ripshelf_store::{JobStore, PathField, StoreError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{paths, Pass, PipelineError, WORKER_IDLE};

/// Titles at least this long are feature candidates.
const MAIN_TITLE_MIN: Duration = Duration::from_secs(60 * 60);

/// The longest title of feature length; failing that, the longest outright.
/// `None` only when the disc has no titles at all.
pub fn select_main_title(titles: &[TitleInfo]) -> Option<&TitleInfo> {
    let feature = titles
        .iter()
        .filter(|t| t.duration >= MAIN_TITLE_MIN)
        .max_by_key(|t| t.duration);
    feature.or_else(|| titles.iter().max_by_key(|t| t.duration))
}

pub struct RipWorker {
    store: Arc<dyn JobStore>,
    ripper: Arc<dyn Ripper>,
    workspace_root: std::path::PathBuf,
    drive: DriveId,
    idle: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RipWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        ripper: Arc<dyn Ripper>,
        workspace_root: std::path::PathBuf,
        drive: DriveId,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            ripper,
            workspace_root,
            drive,
            idle: WORKER_IDLE,
            shutdown,
        }
    }

    /// Shorten the idle sleep; tests use this to keep the loop snappy.
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
                Err(e) => error!(drive_id = %self.drive, error = %e, "rip worker pass failed"),
            }
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.idle) => {}
            }
        }
        info!(drive_id = %self.drive, "rip worker stopped");
    }

    async fn pass(&mut self) -> Result<Pass, PipelineError> {
        let Some(job) = self.store.pending_job_for_drive(&self.drive).await? else {
            return Ok(Pass::Idle);
        };

        // Claim. A rejected transition means the job moved under us.
        match self
            .store
            .update_job_status(job.id, JobStatus::Ripping, None)
            .await
        {
            Ok(_) => {}
            Err(StoreError::InvalidTransition { .. }) => return Ok(Pass::Idle),
            Err(e) => return Err(e.into()),
        }
        info!(job_id = %job.id, drive_id = %self.drive, label = %job.disc_label, "rip started");

        let titles = match self.ripper.scan_titles(&self.drive).await {
            Ok(titles) => titles,
            Err(e) => {
                self.fail(job.id, &format!("disc scan failed: {}", e)).await;
                return Ok(Pass::Worked);
            }
        };

        let Some(main) = select_main_title(&titles) else {
            self.fail(job.id, "disc has no titles").await;
            return Ok(Pass::Worked);
        };
        let title_index = main.index;
        debug!(job_id = %job.id, title_index, duration_secs = main.duration.as_secs(), "main title selected");

        let dest = paths::staging_dir(&self.workspace_root, job.id);
        tokio::fs::create_dir_all(&dest).await?;

        let job_id = job.id;
        let progress = move |percent: f64| {
            debug!(job_id = %job_id, percent, "rip progress");
        };

        // Racing the rip against shutdown drops the subprocess future, which
        // kills the child; the job stays in ripping for the startup sweep.
        let ripped = tokio::select! {
            _ = self.shutdown.changed() => {
                warn!(job_id = %job.id, "shutdown during rip; subprocess terminated");
                return Ok(Pass::Stop);
            }
            result = self.ripper.rip_title(&self.drive, title_index, &dest, &progress) => result,
        };

        match ripped {
            Ok(artifact) => {
                self.store
                    .set_job_path(job.id, PathField::Rip, &artifact)
                    .await?;
                self.store
                    .update_job_status(job.id, JobStatus::Ripped, None)
                    .await?;
                info!(job_id = %job.id, artifact = %artifact.display(), "rip complete");
                if let Err(e) = self.ripper.eject(&self.drive).await {
                    warn!(drive_id = %self.drive, error = %e, "eject failed");
                }
            }
            Err(e) => {
                self.fail(job.id, &e.to_string()).await;
            }
        }
        Ok(Pass::Worked)
    }

    async fn fail(&self, id: JobId, reason: &str) {
        error!(job_id = %id, drive_id = %self.drive, reason, "rip failed");
        if let Err(e) = self
            .store
            .update_job_status(id, JobStatus::Failed, Some(reason))
            .await
        {
            error!(job_id = %id, error = %e, "could not record rip failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(index: u32, secs: u64) -> TitleInfo {
        TitleInfo {
            index,
            name: None,
            duration: Duration::from_secs(secs),
            size_bytes: secs * 1_000_000,
            filename: Some(format!("title_t{:02}.mkv", index)),
        }
    }

    #[test]
    fn longest_feature_length_title_wins() {
        let titles = vec![title(0, 120), title(1, 6332), title(2, 60)];
        assert_eq!(select_main_title(&titles).unwrap().index, 1);
    }

    #[test]
    fn two_features_pick_the_longer() {
        let titles = vec![title(0, 3700), title(1, 7000), title(2, 4000)];
        assert_eq!(select_main_title(&titles).unwrap().index, 1);
    }

    #[test]
    fn no_feature_falls_back_to_longest() {
        let titles = vec![title(0, 120), title(1, 1800), title(2, 60)];
        assert_eq!(select_main_title(&titles).unwrap().index, 1);
    }

    #[test]
    fn exactly_an_hour_counts_as_feature() {
        let titles = vec![title(0, 3600), title(1, 300)];
        assert_eq!(select_main_title(&titles).unwrap().index, 0);
    }

    #[test]
    fn empty_disc_has_no_main_title() {
        assert!(select_main_title(&[]).is_none());
    }
}
