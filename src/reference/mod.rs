//! Equivalence validation against reference detectors.
//!
//! A reference detector is anything that maps a whole recording to a clip
//! list: a legacy executable driven by external tooling, clip lists recorded
//! from one, or this crate's own detector run in a single call. The harness
//! compares a candidate's output with the reference through
//! [`crate::clips::match_clips`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::analysis::detect_clips;
use crate::clips::Clip;
use crate::config::DetectorSettings;

pub mod filter_extract;
pub mod harness;

pub use filter_extract::{find_symmetric_sequences, FilterExtractor};
pub use harness::{compare, validate, EquivalenceReport, MatchStatistics};

/// Black-box detector producing clips for a whole recording
pub trait ReferenceDetector {
    /// Short label for reports and logs
    fn name(&self) -> &str;

    fn detect(&mut self, samples: &[f64]) -> Result<Vec<Clip>>;
}

/// This crate's detector run over the whole signal in one call
#[derive(Debug, Clone)]
pub struct WholeSignalReference {
    settings: DetectorSettings,
}

impl WholeSignalReference {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }
}

impl ReferenceDetector for WholeSignalReference {
    fn name(&self) -> &str {
        "whole-signal"
    }

    fn detect(&mut self, samples: &[f64]) -> Result<Vec<Clip>> {
        Ok(detect_clips(&self.settings, samples)?)
    }
}

/// Clips recorded earlier, e.g. from a legacy detector run
///
/// Ignores the samples it is given.
#[derive(Debug, Clone)]
pub struct RecordedReference {
    label: String,
    clips: Vec<Clip>,
}

impl RecordedReference {
    pub fn new(label: impl Into<String>, clips: Vec<Clip>) -> Self {
        Self {
            label: label.into(),
            clips,
        }
    }

    /// Load a JSON array of `{"start": .., "length": ..}` objects
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let clips = read_clip_list(path)?;
        Ok(Self::new(path.display().to_string(), clips))
    }
}

impl ReferenceDetector for RecordedReference {
    fn name(&self) -> &str {
        &self.label
    }

    fn detect(&mut self, _samples: &[f64]) -> Result<Vec<Clip>> {
        Ok(self.clips.clone())
    }
}

/// Read a JSON clip list
///
/// Accepts either a bare array of clips or an object with a `clips` array,
/// which is what `clip_cli detect` writes.
pub fn read_clip_list(path: &Path) -> Result<Vec<Clip>> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    let clips = match value.get("clips") {
        Some(clips) => clips.clone(),
        None => value,
    };
    serde_json::from_value(clips).with_context(|| format!("reading clips from {}", path.display()))
}
