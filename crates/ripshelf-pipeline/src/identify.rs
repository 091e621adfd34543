//! The identifier: turns an encoded job into a catalog match with a
//! confidence score, or hands it to a human. One job per pass; the catalog
//! is never hit for pre-identified jobs.

use std::sync::Arc;
use std::time::Duration;

use ripshelf_domain::{ContentType, Identification, JobStatus};
use ripshelf_driver::Catalog;
use ripshelf_ident::{best_match, clean_disc_label};
use ripshelf_store::{JobStore, StoreError};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{Pass, PipelineError, WORKER_IDLE};

pub struct IdentifyWorker {
    store: Arc<dyn JobStore>,
    /// None when no catalog token is configured; everything routes to review.
    catalog: Option<Arc<dyn Catalog>>,
    auto_approve_threshold: f64,
    idle: Duration,
    shutdown: watch::Receiver<bool>,
}

impl IdentifyWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        catalog: Option<Arc<dyn Catalog>>,
        auto_approve_threshold: f64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            catalog,
            auto_approve_threshold,
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
                Err(e) => error!(error = %e, "identifier pass failed"),
            }
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.idle) => {}
            }
        }
        info!("identifier stopped");
    }

    async fn pass(&mut self) -> Result<Pass, PipelineError> {
        let encoded = self.store.jobs_by_status(JobStatus::Encoded).await?;
        let Some(job) = encoded.into_iter().next() else {
            return Ok(Pass::Idle);
        };

        match self
            .store
            .update_job_status(job.id, JobStatus::Identifying, None)
            .await
        {
            Ok(_) => {}
            Err(StoreError::InvalidTransition { .. }) => return Ok(Pass::Idle),
            Err(e) => return Err(e.into()),
        }

        // Manual identification beats the catalog.
        if job.is_pre_identified() {
            self.store
                .update_job_status(job.id, JobStatus::Moving, None)
                .await?;
            info!(
                job_id = %job.id,
                title = job.identified_title.as_deref().unwrap_or(""),
                "pre-identified, catalog skipped"
            );
            return Ok(Pass::Worked);
        }

        let cleaned = clean_disc_label(&job.disc_label);
        let candidates = match (&self.catalog, cleaned.is_empty()) {
            (Some(catalog), false) => match catalog.search_movie(&cleaned, None).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "catalog unavailable, routing to review");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        };

        match best_match(&cleaned, &candidates) {
            Some(best) => {
                let ident = Identification {
                    content_type: ContentType::Movie,
                    title: Some(best.candidate.title.clone()),
                    year: best.candidate.year,
                    catalog_id: Some(best.candidate.catalog_id),
                    confidence: Some(best.confidence),
                    poster_ref: best.candidate.poster_ref.clone(),
                };
                self.store.update_job_identification(job.id, &ident).await?;

                if best.confidence >= self.auto_approve_threshold {
                    self.store
                        .update_job_status(job.id, JobStatus::Moving, None)
                        .await?;
                    info!(
                        job_id = %job.id,
                        title = %best.candidate.title,
                        confidence = best.confidence,
                        "identified automatically"
                    );
                } else {
                    self.store
                        .update_job_status(job.id, JobStatus::Review, None)
                        .await?;
                    info!(
                        job_id = %job.id,
                        title = %best.candidate.title,
                        confidence = best.confidence,
                        "low confidence, needs review"
                    );
                }
            }
            None => {
                // Nothing usable; park the best-guess-free job for a human.
                self.store
                    .update_job_identification(job.id, &Identification::unknown())
                    .await?;
                self.store
                    .update_job_status(job.id, JobStatus::Review, None)
                    .await?;
                info!(job_id = %job.id, label = %job.disc_label, "no catalog match, needs review");
            }
        }
        Ok(Pass::Worked)
    }
}
