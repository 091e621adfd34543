//! makemkvcon boundary: robot-mode output parsing, title scanning, ripping.
//!
//! In `--robot` mode every line is `TAG:field,field,...` with quoted string
//! fields; quotes and backslashes inside strings are backslash-escaped. The
//! parser below is pure so it can be exercised with golden lines; the
//! subprocess plumbing stays in [`MakemkvRipper`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ripshelf_domain::DriveId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::DriverError;

// ── Robot-mode message grammar ────────────────────────────────────────────────

/// Drive state constant for "disc inserted" in the `DRV:` record.
const DRIVE_STATE_INSERTED: u32 = 2;

/// One parsed line of robot-mode output. Tags we do not act on parse to
/// `None` and are skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotMessage {
    /// `DRV:index,state,enabled,flags,"drive name","disc label"`
    Drive {
        index: u32,
        /// Raw drive state; `2` means a disc is inserted.
        state: u32,
        /// Drive model string. Parsed for completeness; nothing decides on it.
        drive_name: String,
        disc_label: String,
    },
    /// `TCOUT:count`
    TitleCount(u32),
    /// `TINFO:title,attr,code,"value"`
    TitleField { title: u32, attr: u32, value: String },
    /// `PRGV:current,total,max`
    Progress { current: u64, max: u64 },
    /// `MSG:code,flags,count,"message",...`
    Message { code: u32, text: String },
}

impl RobotMessage {
    pub fn disc_present(&self) -> bool {
        matches!(self, RobotMessage::Drive { state, .. } if *state == DRIVE_STATE_INSERTED)
    }
}

/// Parse one robot-mode line. Unknown tags and malformed records yield `None`.
pub fn parse_robot_line(line: &str) -> Option<RobotMessage> {
    let (tag, rest) = line.split_once(':')?;
    let fields = split_fields(rest);

    match tag {
        "DRV" => Some(RobotMessage::Drive {
            index: fields.first()?.parse().ok()?,
            state: fields.get(1)?.parse().ok()?,
            drive_name: fields.get(4).cloned().unwrap_or_default(),
            disc_label: fields.get(5).cloned().unwrap_or_default(),
        }),
        "TCOUT" => Some(RobotMessage::TitleCount(fields.first()?.parse().ok()?)),
        "TINFO" => Some(RobotMessage::TitleField {
            title: fields.first()?.parse().ok()?,
            attr: fields.get(1)?.parse().ok()?,
            value: fields.get(3).cloned().unwrap_or_default(),
        }),
        "PRGV" => Some(RobotMessage::Progress {
            current: fields.first()?.parse().ok()?,
            max: fields.get(2)?.parse().ok()?,
        }),
        "MSG" => Some(RobotMessage::Message {
            code: fields.first()?.parse().ok()?,
            text: fields.get(3).cloned().unwrap_or_default(),
        }),
        _ => None,
    }
}

/// Split a comma-separated record where string fields are double-quoted and
/// may contain escaped quotes, backslashes and commas.
fn split_fields(rest: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// `H:MM:SS` (or `MM:SS`) into a duration.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let parts: Vec<&str> = value.split(':').collect();
    let (h, m, s): (u64, u64, u64) = match parts.as_slice() {
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse().ok()?),
        [m, s] => (0u64, m.parse().ok()?, s.parse().ok()?),
        _ => return None,
    };
    Some(Duration::from_secs(h * 3600 + m * 60 + s))
}

// ── Title assembly ────────────────────────────────────────────────────────────

// TINFO attribute ids, per the MakeMKV apdefs.
const ATTR_NAME: u32 = 2;
const ATTR_DURATION: u32 = 9;
const ATTR_BYTES: u32 = 11;
const ATTR_OUTPUT_FILENAME: u32 = 27;

/// One title on a scanned disc.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TitleInfo {
    pub index: u32,
    pub name: Option<String>,
    pub duration: Duration,
    pub size_bytes: u64,
    pub filename: Option<String>,
}

/// Fold a stream of parsed messages into per-title records.
pub fn collect_titles(messages: impl IntoIterator<Item = RobotMessage>) -> Vec<TitleInfo> {
    let mut titles: Vec<TitleInfo> = Vec::new();

    for message in messages {
        let RobotMessage::TitleField { title, attr, value } = message else {
            continue;
        };
        let entry = match titles.iter_mut().find(|t| t.index == title) {
            Some(entry) => entry,
            None => {
                titles.push(TitleInfo {
                    index: title,
                    ..TitleInfo::default()
                });
                titles.last_mut().expect("just pushed")
            }
        };
        match attr {
            ATTR_NAME => entry.name = Some(value),
            ATTR_DURATION => {
                if let Some(duration) = parse_duration(&value) {
                    entry.duration = duration;
                }
            }
            ATTR_BYTES => entry.size_bytes = value.parse().unwrap_or(0),
            ATTR_OUTPUT_FILENAME => entry.filename = Some(value),
            _ => {}
        }
    }

    titles
}

// ── Ripper boundary ───────────────────────────────────────────────────────────

/// Extracts titles from an optical disc into a container file.
#[async_trait]
pub trait Ripper: Send + Sync + 'static {
    /// Scan the disc in `drive` and report its titles.
    async fn scan_titles(&self, drive: &DriveId) -> Result<Vec<TitleInfo>, DriverError>;

    /// Rip one title into `dest_dir`, reporting percent progress, and return
    /// the produced artifact path.
    async fn rip_title(
        &self,
        drive: &DriveId,
        title_index: u32,
        dest_dir: &Path,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<PathBuf, DriverError>;

    /// Open the drive tray. Best effort; callers log and move on.
    async fn eject(&self, drive: &DriveId) -> Result<(), DriverError>;
}

/// The real thing, shelling out to `makemkvcon`.
pub struct MakemkvRipper {
    binary: String,
    eject_binary: String,
}

impl Default for MakemkvRipper {
    fn default() -> Self {
        Self {
            binary: "makemkvcon".to_string(),
            eject_binary: "eject".to_string(),
        }
    }
}

impl MakemkvRipper {
    pub fn new() -> Self {
        Self::default()
    }

    fn disc_arg(drive: &DriveId) -> String {
        format!("disc:{}", drive.as_str())
    }
}

#[async_trait]
impl Ripper for MakemkvRipper {
    async fn scan_titles(&self, drive: &DriveId) -> Result<Vec<TitleInfo>, DriverError> {
        let output = Command::new(&self.binary)
            .args(["-r", "--cache=128", "--minlength=45", "info"])
            .arg(Self::disc_arg(drive))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DriverError::Spawn {
                tool: self.binary.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DriverError::DiscRead {
                drive_id: drive.to_string(),
                details: format!("makemkvcon info exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let titles = collect_titles(stdout.lines().filter_map(parse_robot_line));
        debug!(drive_id = %drive, titles = titles.len(), "disc scan complete");
        Ok(titles)
    }

    async fn rip_title(
        &self,
        drive: &DriveId,
        title_index: u32,
        dest_dir: &Path,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<PathBuf, DriverError> {
        let mut child = Command::new(&self.binary)
            .arg("mkv")
            .arg(Self::disc_arg(drive))
            .arg(title_index.to_string())
            .arg(dest_dir)
            .args([
                "--robot",
                "--progress=-same",
                "--cache=1024",
                "--noscan",
                "--minlength=45",
            ])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Spawn {
                tool: self.binary.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take().expect("stdout piped");
        let mut lines = BufReader::new(stdout).lines();
        let mut last_message = String::new();

        while let Ok(Some(line)) = lines.next_line().await {
            match parse_robot_line(&line) {
                Some(RobotMessage::Progress { current, max }) if max > 0 => {
                    progress(current as f64 / max as f64 * 100.0);
                }
                Some(RobotMessage::Message { text, .. }) => last_message = text,
                _ => {}
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(DriverError::Rip {
                drive_id: drive.to_string(),
                title_index,
                details: if last_message.is_empty() {
                    format!("makemkvcon exited with {}", status)
                } else {
                    last_message
                },
            });
        }

        find_artifact(dest_dir)
    }

    async fn eject(&self, drive: &DriveId) -> Result<(), DriverError> {
        let status = Command::new(&self.eject_binary)
            .arg(drive.as_str())
            .status()
            .await
            .map_err(|e| DriverError::Spawn {
                tool: self.eject_binary.clone(),
                source: e,
            })?;
        if !status.success() {
            warn!(drive_id = %drive, %status, "eject exited non-zero");
        }
        Ok(())
    }
}

/// The first `.mkv` file in `dir`, by name for determinism.
fn find_artifact(dir: &Path) -> Result<PathBuf, DriverError> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("mkv"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DriverError::NoArtifact {
            dir: dir.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drv_record_with_disc() {
        let line = r#"DRV:0,2,999,12,"BD-RE HL-DT-ST BD-RE WH16NS60","THE_MATRIX""#;
        let message = parse_robot_line(line).unwrap();
        assert!(message.disc_present());
        match message {
            RobotMessage::Drive {
                index, disc_label, ..
            } => {
                assert_eq!(index, 0);
                assert_eq!(disc_label, "THE_MATRIX");
            }
            other => panic!("wrong message: {other:?}"),
        }
    }

    #[test]
    fn drv_record_empty_tray() {
        let line = r#"DRV:1,0,999,0,"ASUS DRW-24B1ST","""#;
        let message = parse_robot_line(line).unwrap();
        assert!(!message.disc_present());
        match message {
            RobotMessage::Drive { disc_label, .. } => assert_eq!(disc_label, ""),
            other => panic!("wrong message: {other:?}"),
        }
    }

    #[test]
    fn quoted_fields_with_commas_and_escapes() {
        let line = r#"DRV:0,2,999,1,"Drive, \"fancy\" model","A\\B""#;
        match parse_robot_line(line).unwrap() {
            RobotMessage::Drive {
                drive_name,
                disc_label,
                ..
            } => {
                assert_eq!(drive_name, r#"Drive, "fancy" model"#);
                assert_eq!(disc_label, r"A\B");
            }
            other => panic!("wrong message: {other:?}"),
        }
    }

    #[test]
    fn tinfo_and_tcount() {
        assert_eq!(parse_robot_line("TCOUT:2"), Some(RobotMessage::TitleCount(2)));
        assert_eq!(
            parse_robot_line(r#"TINFO:0,9,0,"1:45:32""#),
            Some(RobotMessage::TitleField {
                title: 0,
                attr: 9,
                value: "1:45:32".into()
            })
        );
    }

    #[test]
    fn prgv_and_msg() {
        assert_eq!(
            parse_robot_line("PRGV:32768,32768,65536"),
            Some(RobotMessage::Progress {
                current: 32768,
                max: 65536
            })
        );
        assert_eq!(
            parse_robot_line(r#"MSG:5003,0,1,"Copy complete","%1",""#),
            Some(RobotMessage::Message {
                code: 5003,
                text: "Copy complete".into()
            })
        );
    }

    #[test]
    fn unknown_tags_and_junk_are_skipped() {
        assert_eq!(parse_robot_line("SINFO:0,0,1,0,\"x\""), None);
        assert_eq!(parse_robot_line("not robot output"), None);
        assert_eq!(parse_robot_line(""), None);
        assert_eq!(parse_robot_line("DRV:"), None);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1:45:32"), Some(Duration::from_secs(6332)));
        assert_eq!(parse_duration("45:32"), Some(Duration::from_secs(2732)));
        assert_eq!(parse_duration("0:01:00"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("bogus"), None);
    }

    #[test]
    fn titles_assemble_from_tinfo_stream() {
        let lines = [
            "TCOUT:2",
            r#"TINFO:0,2,0,"Main Feature""#,
            r#"TINFO:0,9,0,"1:45:32""#,
            r#"TINFO:0,11,0,"8012345678""#,
            r#"TINFO:0,27,0,"title_t00.mkv""#,
            r#"TINFO:1,9,0,"0:02:00""#,
            r#"TINFO:1,11,0,"123456""#,
        ];
        let titles = collect_titles(lines.iter().filter_map(|l| parse_robot_line(l)));
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].index, 0);
        assert_eq!(titles[0].name.as_deref(), Some("Main Feature"));
        assert_eq!(titles[0].duration, Duration::from_secs(6332));
        assert_eq!(titles[0].size_bytes, 8012345678);
        assert_eq!(titles[0].filename.as_deref(), Some("title_t00.mkv"));
        assert_eq!(titles[1].duration, Duration::from_secs(120));
    }

    #[test]
    fn artifact_discovery_prefers_first_mkv() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("title_t01.mkv"), b"b").unwrap();
        std::fs::write(dir.path().join("title_t00.mkv"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let artifact = find_artifact(dir.path()).unwrap();
        assert!(artifact.ends_with("title_t00.mkv"));
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            find_artifact(dir.path()),
            Err(DriverError::NoArtifact { .. })
        ));
    }
}
