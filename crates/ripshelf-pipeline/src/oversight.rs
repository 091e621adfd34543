//! Detection and narrow repair of impossible or stuck pipeline states.
//!
//! The startup sweep runs once, before any worker accepts work, and clears
//! transient statuses left behind by a crash or hard stop. The consistency
//! check is read-only and runs on demand from the control surface; the only
//! automatic repair is [`fix_stuck_encoding_jobs`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ripshelf_domain::{JobStatus, DriveId};
use ripshelf_store::JobStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::PipelineError;

/// A rip should never take this long; the disc is a few hours of video.
const STALLED_RIPPING: Duration = Duration::from_secs(4 * 3600);
/// Encodes are slow but bounded.
const STALLED_ENCODING: Duration = Duration::from_secs(8 * 3600);
/// Identification is one catalog round trip.
const STALLED_IDENTIFYING: Duration = Duration::from_secs(3600);

// ── Startup sweep ─────────────────────────────────────────────────────────────

/// What the startup sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Jobs that were mid-rip; the drive state is unknown, so they fail.
    pub ripping_failed: usize,
    /// Jobs that were mid-encode; the partial output is useless, so they go
    /// back to ripped for a fresh encode.
    pub encoding_requeued: usize,
    /// Jobs that were mid-identification; re-identification is free.
    pub identifying_requeued: usize,
}

/// Clear transient statuses left by an unclean stop. Must run before
/// workers start accepting work.
pub async fn startup_sweep(store: &Arc<dyn JobStore>) -> Result<SweepReport, PipelineError> {
    let mut report = SweepReport::default();

    for job in store.jobs_by_status(JobStatus::Ripping).await? {
        store
            .update_job_status(job.id, JobStatus::Failed, Some("reset on startup"))
            .await?;
        warn!(job_id = %job.id, "stale rip failed on startup");
        report.ripping_failed += 1;
    }

    for job in store.jobs_by_status(JobStatus::Encoding).await? {
        store
            .update_job_status(job.id, JobStatus::Ripped, None)
            .await?;
        info!(job_id = %job.id, "interrupted encode returned to queue");
        report.encoding_requeued += 1;
    }

    for job in store.jobs_by_status(JobStatus::Identifying).await? {
        store
            .update_job_status(job.id, JobStatus::Encoded, None)
            .await?;
        info!(job_id = %job.id, "interrupted identification returned to queue");
        report.identifying_requeued += 1;
    }

    Ok(report)
}

// ── Consistency check ─────────────────────────────────────────────────────────

/// One detected inconsistency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// More than one job holds the global encode slot.
    MultipleEncoding { job_ids: Vec<i64> },
    /// More than one rip claims the same drive.
    MultipleRippingOnDrive { drive_id: String, job_ids: Vec<i64> },
    /// A transient status has not moved for far longer than it should take.
    StalledJob {
        job_id: i64,
        status: JobStatus,
        since: DateTime<Utc>,
    },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::MultipleEncoding { job_ids } => {
                write!(f, "multiple jobs encoding at once: {:?}", job_ids)
            }
            Issue::MultipleRippingOnDrive { drive_id, job_ids } => {
                write!(f, "multiple jobs ripping on drive {}: {:?}", drive_id, job_ids)
            }
            Issue::StalledJob { job_id, status, since } => {
                write!(f, "job {} stalled in {} since {}", job_id, status, since)
            }
        }
    }
}

/// Read-only scan for invariant violations and stalled jobs, judged
/// against `now`.
pub async fn consistency_check(
    store: &Arc<dyn JobStore>,
    now: DateTime<Utc>,
) -> Result<Vec<Issue>, PipelineError> {
    let mut issues = Vec::new();

    let encoding = store.jobs_by_status(JobStatus::Encoding).await?;
    if encoding.len() > 1 {
        issues.push(Issue::MultipleEncoding {
            job_ids: encoding.iter().map(|j| j.id.as_i64()).collect(),
        });
    }

    let ripping = store.jobs_by_status(JobStatus::Ripping).await?;
    let mut by_drive: HashMap<DriveId, Vec<i64>> = HashMap::new();
    for job in &ripping {
        by_drive
            .entry(job.drive_id.clone())
            .or_default()
            .push(job.id.as_i64());
    }
    for (drive_id, job_ids) in by_drive {
        if job_ids.len() > 1 {
            issues.push(Issue::MultipleRippingOnDrive {
                drive_id: drive_id.to_string(),
                job_ids,
            });
        }
    }

    for (status, limit) in [
        (JobStatus::Ripping, STALLED_RIPPING),
        (JobStatus::Encoding, STALLED_ENCODING),
        (JobStatus::Identifying, STALLED_IDENTIFYING),
    ] {
        for job in store.jobs_by_status(status).await? {
            let age = now.signed_duration_since(job.updated_at);
            if age.to_std().map_or(false, |age| age > limit) {
                issues.push(Issue::StalledJob {
                    job_id: job.id.as_i64(),
                    status,
                    since: job.updated_at,
                });
            }
        }
    }

    Ok(issues)
}

// ── Bounded repair ────────────────────────────────────────────────────────────

/// Keep the most recently touched encoding job and send every other one
/// back to ripped. Returns how many were reverted.
pub async fn fix_stuck_encoding_jobs(store: &Arc<dyn JobStore>) -> Result<usize, PipelineError> {
    // jobs_by_status is oldest-first, so the keeper is the last entry.
    let mut encoding = store.jobs_by_status(JobStatus::Encoding).await?;
    let Some(keeper) = encoding.pop() else {
        return Ok(0);
    };
    info!(job_id = %keeper.id, "keeping newest encoding job");

    let mut repaired = 0;
    for job in encoding {
        store
            .update_job_status(job.id, JobStatus::Ripped, None)
            .await?;
        warn!(job_id = %job.id, "surplus encoding job returned to ripped");
        repaired += 1;
    }
    Ok(repaired)
}
