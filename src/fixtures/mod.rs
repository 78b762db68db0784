//! Fixture utilities for the deterministic CLI harness.
//!
//! This module discovers fixture recordings, decodes mono WAV input,
//! parses optional expectation JSON, and runs the streaming detector over
//! the decoded samples. It also writes WAV files for synthetic recordings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::StreamingDetector;
use crate::clips::{merge_clips, Clip};
use crate::config::{AppConfig, DetectorSettings, StreamingConfig};
use crate::reference::harness::{compare, ReportEntry};

/// Default location for fixture WAV/JSON assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// Metadata describing an available fixture.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub wav_path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// Loaded fixture data with decoded samples.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub sample_rate: u32,
    pub samples: Vec<f64>,
    pub expectations: Option<FixtureExpectations>,
}

/// JSON expectation schema for fixture verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureExpectations {
    pub fixture: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Allowed start/end/length deviation per clip, in samples
    #[serde(default)]
    pub tolerance_samples: u64,
    pub clips: Vec<Clip>,
}

impl FixtureExpectations {
    /// Check detected clips against the expected ones
    ///
    /// Every expected clip must pair one-to-one with a detected clip within
    /// `tolerance_samples`, and no detected clip may be left over.
    pub fn verify(&self, actual: &[Clip]) -> std::result::Result<(), ExpectationDiff> {
        let report = compare(&self.clips, actual);
        if report.is_within(self.tolerance_samples) {
            return Ok(());
        }

        let failures: Vec<ReportEntry> = report
            .entries
            .into_iter()
            .filter(|entry| match &entry.statistics {
                Some(stats) => {
                    stats.len() != 1 || stats[0].max_abs() > self.tolerance_samples
                }
                None => true,
            })
            .collect();

        Err(ExpectationDiff {
            tolerance_samples: self.tolerance_samples,
            failures,
        })
    }
}

/// Outcome of comparing actual results with expectations.
#[derive(Debug)]
pub struct ExpectationDiff {
    pub tolerance_samples: u64,
    pub failures: Vec<ReportEntry>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "tolerance_samples": self.tolerance_samples,
            "failures": self.failures.iter().map(|failure| {
                serde_json::json!({
                    "expected": failure.aligned.a,
                    "actual": failure.aligned.b,
                    "statistics": failure.statistics,
                })
            }).collect::<Vec<_>>()
        })
    }
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("wav") {
                    fixtures.push(self.metadata_for_path(&path)?);
                }
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load fixture samples + expectations for provided name or path.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let wav_path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&wav_path)?;
        let (samples, sample_rate) = read_wav(&wav_path)?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(FixtureData {
            metadata,
            sample_rate,
            samples,
            expectations,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.exists() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.wav"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, wav_path: &Path) -> Result<FixtureMetadata> {
        let name = wav_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", wav_path.display()))?
            .to_string();
        let expect_path = wav_path.with_extension("expect.json");
        Ok(FixtureMetadata {
            name,
            wav_path: wav_path.to_path_buf(),
            expect_path: expect_path.exists().then_some(expect_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

/// Runs the streaming detector over fixture samples in fixed-size chunks.
pub struct FixtureProcessor {
    settings: DetectorSettings,
    streaming: StreamingConfig,
}

impl FixtureProcessor {
    pub fn new(app_config: AppConfig) -> Self {
        Self {
            settings: app_config.detector,
            streaming: app_config.streaming,
        }
    }

    /// Override the chunk duration in seconds
    pub fn with_chunk_duration(mut self, seconds: f64) -> Self {
        if seconds > 0.0 {
            self.streaming.chunk_duration = seconds;
        }
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.streaming.merge_clips = merge;
        self
    }

    /// Detect clips in `samples` recorded at `sample_rate`
    ///
    /// The configured detector settings are used at the recording's sample
    /// rate.
    pub fn run_samples(&self, samples: &[f64], sample_rate: u32) -> Result<Vec<Clip>> {
        let settings = self.settings.with_sample_rate(sample_rate as f64);
        let mut detector = StreamingDetector::new(settings)
            .with_context(|| format!("configuring detector for {} Hz input", sample_rate))?;

        let chunk_size = self.streaming.chunk_size(sample_rate as f64);
        let mut clips = Vec::new();
        for chunk in samples.chunks(chunk_size) {
            clips.extend(detector.detect(chunk));
        }
        clips.extend(detector.complete_detection());

        if self.streaming.merge_clips {
            clips = merge_clips(&clips);
        }
        Ok(clips)
    }

    pub fn run(&self, data: &FixtureData) -> Result<Vec<Clip>> {
        self.run_samples(&data.samples, data.sample_rate)
    }
}

/// Decode a mono WAV file
///
/// Integer PCM is scaled to [-1, 1]; float PCM is passed through.
pub fn read_wav(path: &Path) -> Result<(Vec<f64>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!(
            "Fixture {} must be mono (found {} channels)",
            path.display(),
            spec.channels
        ));
    }

    let sample_rate = spec.sample_rate;

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map(f64::from).map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f64>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f64;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f64 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f64>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    Ok((samples, sample_rate))
}

/// Write samples as a mono 32-bit float WAV file
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample(sample as f32)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))
}
