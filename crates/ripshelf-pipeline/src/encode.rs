//! The single encode worker. Exactly one transcode runs at any instant;
//! the claim transition ripped→encoding is the lock, taken through the
//! store so it holds across workers and restarts.

use std::sync::Arc;
use std::time::Duration;

use ripshelf_domain::{JobId, JobStatus};
use ripshelf_driver::{EncodeProgress, Transcoder};
use ripshelf_store::{JobStore, PathField, StoreError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{paths, Pass, PipelineError, WORKER_IDLE};

pub struct EncodeWorker {
    store: Arc<dyn JobStore>,
    transcoder: Arc<dyn Transcoder>,
    workspace_root: std::path::PathBuf,
    idle: Duration,
    shutdown: watch::Receiver<bool>,
}

impl EncodeWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        transcoder: Arc<dyn Transcoder>,
        workspace_root: std::path::PathBuf,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            transcoder,
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
                Err(e) => error!(error = %e, "encode worker pass failed"),
            }
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.idle) => {}
            }
        }
        info!("encode worker stopped");
    }

    async fn pass(&mut self) -> Result<Pass, PipelineError> {
        let ripped = self.store.jobs_by_status(JobStatus::Ripped).await?;
        let Some(job) = ripped.into_iter().next() else {
            return Ok(Pass::Idle);
        };

        match self
            .store
            .update_job_status(job.id, JobStatus::Encoding, None)
            .await
        {
            Ok(_) => {}
            Err(StoreError::InvalidTransition { .. }) => return Ok(Pass::Idle),
            Err(e) => return Err(e.into()),
        }

        let Some(rip_path) = job.rip_path.clone() else {
            self.fail(job.id, "no rip artifact recorded").await;
            return Ok(Pass::Worked);
        };

        let out_dir = paths::encoding_dir(&self.workspace_root, job.id);
        tokio::fs::create_dir_all(&out_dir).await?;
        let output = out_dir.join(format!("job_{}.mkv", job.id));
        info!(job_id = %job.id, input = %rip_path.display(), "encode started");

        let job_id = job.id;
        let progress = move |update: EncodeProgress| {
            debug!(
                job_id = %job_id,
                percent = update.percent,
                fps = update.fps,
                eta = update.eta.as_deref().unwrap_or("-"),
                "encode progress"
            );
        };

        // On shutdown the transcode future is dropped (killing the child)
        // and the claim is handed back so the job is re-picked next start.
        // This checkpoint is the one place a worker retracts progress.
        let encoded = tokio::select! {
            _ = self.shutdown.changed() => {
                match self.store.update_job_status(job.id, JobStatus::Ripped, None).await {
                    Ok(_) => warn!(job_id = %job.id, "shutdown during encode; job returned to ripped"),
                    Err(e) => error!(job_id = %job.id, error = %e, "could not return interrupted encode"),
                }
                return Ok(Pass::Stop);
            }
            result = self.transcoder.encode(&rip_path, &output, &progress) => result,
        };

        match encoded {
            Ok(()) => {
                self.store
                    .set_job_path(job.id, PathField::Encode, &output)
                    .await?;
                self.store
                    .update_job_status(job.id, JobStatus::Encoded, None)
                    .await?;
                info!(job_id = %job.id, output = %output.display(), "encode complete");
            }
            Err(e) => {
                self.fail(job.id, &e.to_string()).await;
            }
        }
        Ok(Pass::Worked)
    }

    async fn fail(&self, id: JobId, reason: &str) {
        error!(job_id = %id, reason, "encode failed");
        if let Err(e) = self
            .store
            .update_job_status(id, JobStatus::Failed, Some(reason))
            .await
        {
            error!(job_id = %id, error = %e, "could not record encode failure");
        }
    }
}
