//! Container conversion to canonical PCM.

use super::scratch::ScratchFile;
use super::CANONICAL_SAMPLE_RATE;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("audio format could not be decoded")]
    Unsupported { stderr: String },

    #[error("audio conversion did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("failed to launch `{program}`: {source}")]
    Launch { program: String, source: io::Error },
}

/// Converts an uploaded file to 16 kHz mono 16-bit WAV.
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    /// Convert `input`, returning the guard for the new file in `scratch_dir`.
    async fn to_canonical_pcm(&self, input: &Path, scratch_dir: &Path) -> Result<ScratchFile, ConversionError>;
}

pub struct FfmpegNormalizer {
    program: String,
    timeout: Duration,
}

impl FfmpegNormalizer {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let sample_rate = CANONICAL_SAMPLE_RATE.to_string();
        let mut command = Command::new(&self.program);
        command
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-acodec", "pcm_s16le", "-ar", sample_rate.as_str(), "-ac", "1"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl AudioNormalizer for FfmpegNormalizer {
    async fn to_canonical_pcm(&self, input: &Path, scratch_dir: &Path) -> Result<ScratchFile, ConversionError> {
        let output = ScratchFile::new_in(scratch_dir, "wav");
        let child = self
            .command(input, output.path())
            .spawn()
            .map_err(|source| ConversionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout kills the child.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::TimedOut(self.timeout))?
            .map_err(|source| ConversionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConversionError::Unsupported {
                stderr: tail(&stderr, 500).to_string(),
            });
        }

        debug!(input = %input.display(), output = %output.path().display(), "Audio converted to canonical PCM");
        Ok(output)
    }
}

/// The last `max` bytes of `text`, cut at a char boundary.
pub(crate) fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
