pub mod encode;
pub mod error;
pub mod identify;
pub mod mover;
pub mod oversight;
pub mod paths;
pub mod rip;
pub mod supervisor;
pub mod watch;

pub use error::PipelineError;
pub use oversight::{consistency_check, fix_stuck_encoding_jobs, startup_sweep, Issue, SweepReport};
pub use supervisor::{Drivers, Supervisor};

/// How long an idle worker sleeps before looking for work again.
pub(crate) const WORKER_IDLE: std::time::Duration = std::time::Duration::from_secs(3);

/// Outcome of one worker pass, used to pace the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    /// A job was advanced; look for more immediately.
    Worked,
    /// Nothing to do; sleep before the next pass.
    Idle,
    /// Shutdown observed mid-pass; exit the loop.
    Stop,
}
