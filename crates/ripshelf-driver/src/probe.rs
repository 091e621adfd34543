use async_trait::async_trait;
use ripshelf_domain::DriveId;
use tokio::process::Command;
use tracing::debug;

use crate::error::DriverError;
use crate::makemkv::{parse_robot_line, RobotMessage};

/// What a drive reports when asked. An empty label with a present disc is a
/// real state (unlabeled media), distinct from an empty tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscStatus {
    pub present: bool,
    pub label: String,
}

impl DiscStatus {
    pub fn empty() -> Self {
        Self {
            present: false,
            label: String::new(),
        }
    }
}

/// Answers "is there a disc, and what is it called" for one drive.
#[async_trait]
pub trait DiscProbe: Send + Sync + 'static {
    async fn probe(&self, drive: &DriveId) -> Result<DiscStatus, DriverError>;
}

/// Probe backed by `makemkvcon -r info disc:9999`, which lists every drive
/// without touching media. One invocation reports all drives; we pick the
/// record whose index matches.
pub struct MakemkvProbe {
    binary: String,
}

impl Default for MakemkvProbe {
    fn default() -> Self {
        Self {
            binary: "makemkvcon".to_string(),
        }
    }
}

impl MakemkvProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Find the `DRV:` record for `drive` in robot-mode output.
pub fn status_from_output(output: &str, drive: &DriveId) -> DiscStatus {
    for line in output.lines() {
        if let Some(message) = parse_robot_line(line) {
            let present = message.disc_present();
            if let RobotMessage::Drive {
                index, disc_label, ..
            } = message
            {
                if index.to_string() == drive.as_str() {
                    return DiscStatus {
                        present,
                        label: disc_label,
                    };
                }
            }
        }
    }
    DiscStatus::empty()
}

#[async_trait]
impl DiscProbe for MakemkvProbe {
    async fn probe(&self, drive: &DriveId) -> Result<DiscStatus, DriverError> {
        let output = Command::new(&self.binary)
            .args(["-r", "--cache=1", "info", "disc:9999"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DriverError::Spawn {
                tool: self.binary.clone(),
                source: e,
            })?;

        // `info disc:9999` exits non-zero because 9999 is not a disc; the
        // DRV records on stdout are still complete, so only a spawn failure
        // or empty output counts as a probe error.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(DriverError::DiscRead {
                drive_id: drive.to_string(),
                details: "makemkvcon produced no drive records".to_string(),
            });
        }

        let status = status_from_output(&stdout, drive);
        debug!(drive_id = %drive, present = status.present, label = %status.label, "probe");
        Ok(status)
    }
}
