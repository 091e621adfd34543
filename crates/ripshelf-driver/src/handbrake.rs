//! HandBrakeCLI boundary with a fixed delivery preset.
//!
//! HandBrake reports progress on stdout with carriage-return separated
//! updates, so the reader splits on `\r` instead of newlines.

use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::DriverError;

/// One progress update from the transcoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    pub percent: f64,
    pub fps: Option<f64>,
    /// As reported, e.g. `00h12m34s`.
    pub eta: Option<String>,
}

/// Re-encodes a ripped file to the delivery codec.
#[async_trait]
pub trait Transcoder: Send + Sync + 'static {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        progress: &(dyn Fn(EncodeProgress) + Send + Sync),
    ) -> Result<(), DriverError>;
}

/// The real thing, shelling out to `HandBrakeCLI`.
pub struct HandBrakeTranscoder {
    binary: String,
}

impl Default for HandBrakeTranscoder {
    fn default() -> Self {
        Self {
            binary: "HandBrakeCLI".to_string(),
        }
    }
}

impl HandBrakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }
}

/// x264 quality 19, high profile, level 4.1; primary audio passed through
/// with an AAC stereo fallback track; forced-subtitle scan; mkv container.
const PRESET_ARGS: &[&str] = &[
    "--encoder",
    "x264",
    "--quality",
    "19",
    "--encoder-profile",
    "high",
    "--encoder-level",
    "4.1",
    "--aencoder",
    "copy,av_aac",
    "--audio-copy-mask",
    "ac3,dts,dtshd",
    "--audio-fallback",
    "av_aac",
    "--mixdown",
    "stereo",
    "--subtitle",
    "scan",
    "--format",
    "av_mkv",
];

#[async_trait]
impl Transcoder for HandBrakeTranscoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        progress: &(dyn Fn(EncodeProgress) + Send + Sync),
    ) -> Result<(), DriverError> {
        let mut child = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(PRESET_ARGS)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Spawn {
                tool: self.binary.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take().expect("stdout piped");
        let mut segments = BufReader::new(stdout).split(b'\r');
        while let Ok(Some(segment)) = segments.next_segment().await {
            let text = String::from_utf8_lossy(&segment);
            if let Some(update) = parse_progress(&text) {
                progress(update);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(DriverError::Encode {
                details: format!("HandBrakeCLI exited with {}", status),
            });
        }
        Ok(())
    }
}

fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"Encoding: task \d+ of \d+, (\d+\.?\d*) %(?: \((\d+\.?\d*) fps, avg \d+\.?\d* fps, ETA (\d+h\d+m\d+s)\))?",
        )
        .expect("progress pattern compiles")
    })
}

/// Parse one HandBrake progress update. Early updates omit fps/ETA.
pub fn parse_progress(text: &str) -> Option<EncodeProgress> {
    let captures = progress_pattern().captures(text)?;
    Some(EncodeProgress {
        percent: captures.get(1)?.as_str().parse().ok()?,
        fps: captures.get(2).and_then(|m| m.as_str().parse().ok()),
        eta: captures.get(3).map(|m| m.as_str().to_string()),
    })
}
