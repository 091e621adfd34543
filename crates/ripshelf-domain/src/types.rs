use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Store-assigned job id. Monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl JobId {
    pub fn new(n: i64) -> Self {
        JobId(n)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a host-attached optical drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveId(pub String);

impl DriveId {
    pub fn new(s: impl Into<String>) -> Self {
        DriveId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DriveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Enums ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Unknown,
    Movie,
    TvSeason,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Unknown => write!(f, "unknown"),
            ContentType::Movie => write!(f, "movie"),
            ContentType::TvSeason => write!(f, "tv_season"),
        }
    }
}

/// Pipeline position of a job.
///
/// Transitions:
///   Pending → Ripping → Ripped → Encoding → Encoded → Identifying
///   Identifying → Review | Moving
///   Review → Moving
///   Moving → Complete
///   any non-terminal → Failed
///   Complete | Failed → Archived
///
/// The single sanctioned reversal is Encoding → Ripped, used when an encode
/// is interrupted and its output is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Ripping,
    Ripped,
    Encoding,
    Encoded,
    Identifying,
    Review,
    Moving,
    Complete,
    Failed,
    Archived,
}

impl JobStatus {
    /// Whether `next` is a legal successor of `self` in the lifecycle graph.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Ripping)
                | (Pending, Failed)
                | (Ripping, Ripped)
                | (Ripping, Failed)
                | (Ripped, Encoding)
                | (Ripped, Failed)
                | (Encoding, Encoded)
                | (Encoding, Ripped)
                | (Encoding, Failed)
                | (Encoded, Identifying)
                | (Encoded, Failed)
                | (Identifying, Review)
                | (Identifying, Moving)
                | (Identifying, Failed)
                | (Review, Moving)
                | (Review, Failed)
                | (Moving, Complete)
                | (Moving, Failed)
                | (Complete, Archived)
                | (Failed, Archived)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Archived
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Ripping => "ripping",
            JobStatus::Ripped => "ripped",
            JobStatus::Encoding => "encoding",
            JobStatus::Encoded => "encoded",
            JobStatus::Identifying => "identifying",
            JobStatus::Review => "review",
            JobStatus::Moving => "moving",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

// ── Validation bounds ─────────────────────────────────────────────────────────

pub const YEAR_MIN: i32 = 1800;
pub const YEAR_MAX: i32 = 2100;

/// Settings key for the operator-facing continuous-ingestion flag.
pub const ACTIVE_MODE_KEY: &str = "active_mode";

/// Interpret the stored active-mode setting. Absent means active: a fresh
/// install is expected to ingest whatever shows up.
pub fn active_mode_enabled(value: Option<&str>) -> bool {
    value != Some("false")
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// One inserted disc, from detection through filing. Never deleted; archival
/// is a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub drive_id: DriveId,
    /// Raw volume label read from the disc. May be empty.
    pub disc_label: String,
    pub status: JobStatus,
    pub content_type: ContentType,
    pub identified_title: Option<String>,
    pub identified_year: Option<i32>,
    pub catalog_id: Option<i64>,
    /// Match confidence in [0, 1]. Exactly 1.0 means a human asserted the
    /// identification; the automatic scorer never produces it.
    pub confidence: Option<f64>,
    pub poster_ref: Option<String>,
    pub rip_path: Option<PathBuf>,
    pub encode_path: Option<PathBuf>,
    pub final_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, drive_id: DriveId, disc_label: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            drive_id,
            disc_label,
            status: JobStatus::Pending,
            content_type: ContentType::Unknown,
            identified_title: None,
            identified_year: None,
            catalog_id: None,
            confidence: None,
            poster_ref: None,
            rip_path: None,
            encode_path: None,
            final_path: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A human supplied this job's identity ahead of the identifier stage.
    pub fn is_pre_identified(&self) -> bool {
        self.identified_title.is_some() && self.confidence == Some(1.0)
    }
}

// ── Identification ────────────────────────────────────────────────────────────

/// The identification fields written as one unit. Does not carry status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub content_type: ContentType,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub catalog_id: Option<i64>,
    pub confidence: Option<f64>,
    pub poster_ref: Option<String>,
}

impl Identification {
    /// A human-asserted identification. Confidence is pinned to 1.0.
    pub fn human(
        content_type: ContentType,
        title: impl Into<String>,
        year: Option<i32>,
        catalog_id: Option<i64>,
        poster_ref: Option<String>,
    ) -> Self {
        Self {
            content_type,
            title: Some(title.into()),
            year,
            catalog_id,
            confidence: Some(1.0),
            poster_ref,
        }
    }

    /// The identifier found nothing usable.
    pub fn unknown() -> Self {
        Self {
            content_type: ContentType::Unknown,
            title: None,
            year: None,
            catalog_id: None,
            confidence: Some(0.0),
            poster_ref: None,
        }
    }

    pub fn validate(&self) -> Result<(), crate::DomainError> {
        if let Some(year) = self.year {
            if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
                return Err(crate::DomainError::InvalidYear(year));
            }
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(crate::DomainError::InvalidConfidence(c));
            }
        }
        Ok(())
    }
}

// ── Catalog candidates ────────────────────────────────────────────────────────

/// One search result from the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCandidate {
    pub catalog_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub overview: String,
    pub poster_ref: Option<String>,
    /// Catalog popularity on the catalog's own scale (roughly 0..1000).
    pub popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub catalog_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub overview: String,
    pub poster_ref: Option<String>,
    pub popularity: f64,
    pub runtime_minutes: Option<i64>,
}

// ── Collection ────────────────────────────────────────────────────────────────

/// A successfully filed title. Written only by the mover; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: i64,
    pub content_type: ContentType,
    pub title: String,
    pub year: Option<i32>,
    pub catalog_id: Option<i64>,
    pub final_path: PathBuf,
    pub added_at: DateTime<Utc>,
}

// ── Wanted list ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantedItem {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub content_type: ContentType,
    pub catalog_id: Option<i64>,
    pub poster_ref: Option<String>,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// User-supplied fields for a new wanted entry; the store assigns id and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWantedItem {
    pub title: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub content_type: ContentType,
    pub catalog_id: Option<i64>,
    pub poster_ref: Option<String>,
    pub notes: Option<String>,
}
