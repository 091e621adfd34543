#[cfg(test)]
mod tests {
    use crate::types::*;
    use chrono::Utc;

    fn all_statuses() -> [JobStatus; 11] {
        use JobStatus::*;
        [
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
        ]
    }

    #[test]
    fn forward_edges_are_legal() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Ripping));
        assert!(Ripping.can_transition_to(Ripped));
        assert!(Ripped.can_transition_to(Encoding));
        assert!(Encoding.can_transition_to(Encoded));
        assert!(Encoded.can_transition_to(Identifying));
        assert!(Identifying.can_transition_to(Review));
        assert!(Identifying.can_transition_to(Moving));
        assert!(Review.can_transition_to(Moving));
        assert!(Moving.can_transition_to(Complete));
    }

    #[test]
    fn every_active_status_can_fail() {
        use JobStatus::*;
        for s in [Pending, Ripping, Ripped, Encoding, Encoded, Identifying, Review, Moving] {
            assert!(s.can_transition_to(Failed), "{s} should be allowed to fail");
        }
    }

    #[test]
    fn encoding_can_revert_to_ripped() {
        assert!(JobStatus::Encoding.can_transition_to(JobStatus::Ripped));
    }

    #[test]
    fn no_other_reversals() {
        use JobStatus::*;
        assert!(!Ripped.can_transition_to(Ripping));
        assert!(!Encoded.can_transition_to(Encoding));
        assert!(!Review.can_transition_to(Identifying));
        assert!(!Moving.can_transition_to(Review));
    }

    #[test]
    fn no_stage_skipping() {
        use JobStatus::*;
        assert!(!Pending.can_transition_to(Complete));
        assert!(!Pending.can_transition_to(Ripped));
        assert!(!Ripping.can_transition_to(Encoding));
        assert!(!Ripped.can_transition_to(Encoded));
        assert!(!Encoded.can_transition_to(Moving));
        assert!(!Identifying.can_transition_to(Complete));
    }

    #[test]
    fn only_complete_and_failed_archive() {
        use JobStatus::*;
        assert!(Complete.can_transition_to(Archived));
        assert!(Failed.can_transition_to(Archived));
        for s in all_statuses() {
            if s != Complete && s != Failed {
                assert!(!s.can_transition_to(Archived), "{s} must not archive");
            }
        }
    }

    #[test]
    fn archived_is_a_dead_end() {
        for s in all_statuses() {
            assert!(!JobStatus::Archived.can_transition_to(s));
        }
    }

    #[test]
    fn terminality() {
        use JobStatus::*;
        assert!(Complete.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Archived.is_terminal());
        for s in [Pending, Ripping, Ripped, Encoding, Encoded, Identifying, Review, Moving] {
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&JobStatus::Identifying).unwrap(), "\"identifying\"");
        assert_eq!(
            serde_json::to_string(&ContentType::TvSeason).unwrap(),
            "\"tv_season\""
        );
    }

    #[test]
    fn new_job_starts_pending() {
        let now = Utc::now();
        let job = Job::new(JobId::new(1), DriveId::new("1"), "THE_MATRIX".into(), now);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.content_type, ContentType::Unknown);
        assert!(job.rip_path.is_none());
        assert_eq!(job.created_at, job.updated_at);
        assert!(!job.is_pre_identified());
    }

    #[test]
    fn pre_identified_requires_title_and_full_confidence() {
        let now = Utc::now();
        let mut job = Job::new(JobId::new(1), DriveId::new("1"), String::new(), now);
        job.identified_title = Some("Dune".into());
        job.confidence = Some(0.99);
        assert!(!job.is_pre_identified());
        job.confidence = Some(1.0);
        assert!(job.is_pre_identified());
        job.identified_title = None;
        assert!(!job.is_pre_identified());
    }

    #[test]
    fn identification_year_bounds() {
        let mut ident = Identification::human(ContentType::Movie, "The Matrix", Some(1999), None, None);
        assert!(ident.validate().is_ok());
        ident.year = Some(1799);
        assert!(ident.validate().is_err());
        ident.year = Some(2101);
        assert!(ident.validate().is_err());
        ident.year = Some(1800);
        assert!(ident.validate().is_ok());
        ident.year = Some(2100);
        assert!(ident.validate().is_ok());
        ident.year = None;
        assert!(ident.validate().is_ok());
    }

    #[test]
    fn identification_confidence_bounds() {
        let mut ident = Identification::unknown();
        assert_eq!(ident.confidence, Some(0.0));
        assert!(ident.validate().is_ok());
        ident.confidence = Some(1.5);
        assert!(ident.validate().is_err());
        ident.confidence = Some(-0.1);
        assert!(ident.validate().is_err());
    }

    #[test]
    fn human_identification_pins_confidence() {
        let ident = Identification::human(ContentType::Movie, "Dune", Some(2021), Some(438631), None);
        assert_eq!(ident.confidence, Some(1.0));
        assert_eq!(ident.title.as_deref(), Some("Dune"));
    }

    #[test]
    fn job_round_trips_through_json() {
        let now = Utc::now();
        let mut job = Job::new(JobId::new(7), DriveId::new("disc-a"), "PULP_FICTION_WS".into(), now);
        job.status = JobStatus::Encoded;
        job.rip_path = Some("/ws/staging/job_7/title_t00.mkv".into());
        job.encode_path = Some("/ws/encoding/job_7/out.mkv".into());
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"encoded\""));
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
