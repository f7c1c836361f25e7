//! # PCM Inspection
//!
//! Reads the canonical WAV produced by the normalizer and decides whether it
//! is worth sending to the feature extractor.
//!
//! ## Checks:
//! - **Readable**: RIFF/WAVE with a PCM track
//! - **Long enough**: at least `analysis.min_duration_secs` of audio
//! - **Not silent**: peak-to-peak range of at least [`MIN_DYNAMIC_RANGE`]

use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Peak-to-peak sample range below which a recording is treated as silence.
pub const MIN_DYNAMIC_RANGE: i32 = 100;

#[derive(Debug, Error)]
pub enum PcmError {
    #[error("converted audio could not be read: {0}")]
    Unreadable(#[from] io::Error),

    #[error("converted audio contains no samples")]
    Empty,

    #[error("recording is too short ({duration:.2}s, minimum {min:.2}s)")]
    TooShort { duration: f64, min: f64 },

    #[error("recording appears to be silent (dynamic range {range})")]
    Silent { range: i32 },
}

/// What we learned from the PCM file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcmSummary {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub duration_secs: f64,
    pub dynamic_range: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct PcmInspector {
    min_duration_secs: f64,
}

impl PcmInspector {
    pub fn new(min_duration_secs: f64) -> Self {
        Self { min_duration_secs }
    }

    /// Read and check a WAV file. Blocking; run it off the async executor.
    pub fn inspect(&self, path: &Path) -> Result<PcmSummary, PcmError> {
        let mut file = File::open(path)?;
        let (header, track) = wav::read(&mut file)?;
        let samples = to_i16(track);
        self.check(header.sampling_rate, header.channel_count, &samples)
    }

    /// Summarize interleaved 16-bit samples and apply the acceptance rules.
    pub fn check(&self, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<PcmSummary, PcmError> {
        if samples.is_empty() || sample_rate == 0 || channels == 0 {
            return Err(PcmError::Empty);
        }

        let frames = samples.len() / channels as usize;
        let duration_secs = frames as f64 / sample_rate as f64;
        if duration_secs < self.min_duration_secs {
            return Err(PcmError::TooShort {
                duration: duration_secs,
                min: self.min_duration_secs,
            });
        }

        let (min, max) = samples
            .iter()
            .fold((i16::MAX, i16::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        let dynamic_range = max as i32 - min as i32;
        if dynamic_range < MIN_DYNAMIC_RANGE {
            return Err(PcmError::Silent { range: dynamic_range });
        }

        Ok(PcmSummary {
            sample_rate,
            channels,
            frames,
            duration_secs,
            dynamic_range,
        })
    }
}

/// Bring any PCM bit depth the `wav` crate decodes onto the 16-bit scale.
fn to_i16(track: wav::BitDepth) -> Vec<i16> {
    match track {
        wav::BitDepth::Sixteen(samples) => samples,
        wav::BitDepth::Eight(samples) => samples.into_iter().map(|s| (s as i16 - 128) << 8).collect(),
        wav::BitDepth::TwentyFour(samples) => samples.into_iter().map(|s| (s >> 8) as i16).collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples
            .into_iter()
            .map(|s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
            .collect(),
        wav::BitDepth::Empty => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::CANONICAL_SAMPLE_RATE;

    /// Write a mono 16 kHz sine of `seconds` at `amplitude` to `path`.
    pub(crate) fn write_tone(path: &Path, seconds: f64, amplitude: f64) {
        let count = (seconds * CANONICAL_SAMPLE_RATE as f64) as usize;
        let samples: Vec<i16> = (0..count)
            .map(|i| {
                let t = i as f64 / CANONICAL_SAMPLE_RATE as f64;
                (amplitude * (2.0 * std::f64::consts::PI * 220.0 * t).sin()) as i16
            })
            .collect();
        let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, CANONICAL_SAMPLE_RATE, 16);
        let mut file = File::create(path).unwrap();
        wav::write(header, &wav::BitDepth::Sixteen(samples), &mut file).unwrap();
    }

    #[test]
    fn test_accepts_sustained_vowel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_tone(&path, 3.0, 8000.0);

        let summary = PcmInspector::new(1.0).inspect(&path).unwrap();
        assert_eq!(summary.sample_rate, 16000);
        assert_eq!(summary.channels, 1);
        assert_eq!(summary.frames, 48000);
        assert!((summary.duration_secs - 3.0).abs() < 1e-9);
        assert!(summary.dynamic_range > 15000);
    }

    #[test]
    fn test_rejects_short_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_tone(&path, 0.5, 8000.0);

        let result = PcmInspector::new(1.0).inspect(&path);
        assert!(matches!(result, Err(PcmError::TooShort { .. })));
    }

    #[test]
    fn test_rejects_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        write_tone(&path, 2.0, 20.0);

        let result = PcmInspector::new(1.0).inspect(&path);
        assert!(matches!(result, Err(PcmError::Silent { .. })));
    }

    #[test]
    fn test_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();

        let result = PcmInspector::new(1.0).inspect(&path);
        assert!(matches!(result, Err(PcmError::Unreadable(_))));
    }

    #[test]
    fn test_stereo_duration_counts_frames() {
        let samples: Vec<i16> = (0..32000).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();
        let summary = PcmInspector::new(0.5).check(16000, 2, &samples).unwrap();
        assert_eq!(summary.frames, 16000);
        assert!((summary.duration_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_track() {
        assert!(matches!(PcmInspector::new(0.0).check(16000, 1, &[]), Err(PcmError::Empty)));
    }
}
