//! # Audio Handling
//!
//! Everything between the uploaded bytes and the feature vector:
//! 1. The upload is written to a [`ScratchFile`] under `analysis.upload_dir`
//! 2. [`AudioNormalizer`] converts any accepted container to canonical PCM
//! 3. [`PcmInspector`] reads that PCM and rejects silent or too-short recordings
//! 4. [`FeatureExtractor`] turns the PCM into a [`crate::features::FeatureVector`]
//!
//! ## Canonical PCM:
//! - **Sample Rate**: 16kHz (16,000 Hz)
//! - **Bit Depth**: 16-bit signed, little-endian
//! - **Channels**: Mono (1 channel)
//! - **Container**: RIFF/WAVE
//!
//! Both external tools run as child processes with a time budget and are
//! killed if the budget runs out or the owning future is dropped.

pub mod extractor;
pub mod normalizer;
pub mod processor;
pub mod scratch;

pub use extractor::{CommandExtractor, ExtractionError, FeatureExtractor};
pub use normalizer::{AudioNormalizer, ConversionError, FfmpegNormalizer};
pub use processor::{PcmError, PcmInspector, PcmSummary};
pub use scratch::ScratchFile;

/// Sample rate every recording is converted to before inspection.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;
