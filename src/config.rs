//! Configuration management for detector settings
//!
//! This module provides the validated detector settings, the two legacy
//! detector presets (Tseep and Thrush) and runtime configuration loading
//! from JSON files, so parameters can be adjusted without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigurationError;

/// Sample rate of the legacy detectors, in Hz.
pub const LEGACY_SAMPLE_RATE: f64 = 22_050.0;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub detector: DetectorSettings,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Transient detector parameters
///
/// Frequencies are in Hz, `integration_time` and paddings are in samples,
/// `delay` and the durations are in seconds. Conversions from seconds to
/// samples truncate toward zero, matching the legacy detectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorSettings {
    /// Input sample rate in Hz
    pub sample_rate: f64,
    /// Lower passband edge in Hz
    pub f0: f64,
    /// Upper passband edge in Hz
    pub f1: f64,
    /// Transition bandwidth on either side of the passband in Hz
    pub bw: f64,
    /// Bandpass filter tap count
    pub filter_length: usize,
    /// Moving-average length in samples
    pub integration_time: usize,
    /// Power ratio delay in seconds
    pub delay: f64,
    /// Ratio threshold; the inverse threshold is `1 / threshold`
    pub threshold: f64,
    /// Minimum transient duration in seconds
    pub min_duration: f64,
    /// Maximum transient duration in seconds
    pub max_duration: f64,
    /// Samples prepended to each clip
    #[serde(default)]
    pub initial_padding: usize,
    /// Samples appended to each clip
    #[serde(default)]
    pub final_padding: usize,
}

impl DetectorSettings {
    /// Settings of the legacy Tseep detector (high-frequency calls).
    pub fn tseep() -> Self {
        Self {
            sample_rate: LEGACY_SAMPLE_RATE,
            f0: 6000.0,
            f1: 10000.0,
            bw: 100.0,
            filter_length: 100,
            integration_time: 2000,
            delay: 0.02,
            threshold: 2.0,
            min_duration: 0.1,
            max_duration: 0.4,
            initial_padding: 3000,
            final_padding: 0,
        }
    }

    /// Settings of the legacy Thrush detector (low-frequency calls).
    pub fn thrush() -> Self {
        Self {
            sample_rate: LEGACY_SAMPLE_RATE,
            f0: 2800.0,
            f1: 5000.0,
            bw: 100.0,
            filter_length: 100,
            integration_time: 4000,
            delay: 0.02,
            threshold: 1.3,
            min_duration: 0.1,
            max_duration: 0.4,
            initial_padding: 5000,
            final_padding: 0,
        }
    }

    /// Look up a preset by name (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tseep" => Some(Self::tseep()),
            "thrush" => Some(Self::thrush()),
            _ => None,
        }
    }

    /// Same settings at a different sample rate.
    pub fn with_sample_rate(&self, sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..self.clone()
        }
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Power ratio delay in samples, truncated toward zero.
    pub fn delay_samples(&self) -> usize {
        seconds_to_samples(self.delay, self.sample_rate) as usize
    }

    /// Minimum transient length in samples, truncated toward zero.
    pub fn min_length(&self) -> u64 {
        seconds_to_samples(self.min_duration, self.sample_rate)
    }

    /// Maximum transient length in samples, truncated toward zero.
    pub fn max_length(&self) -> u64 {
        seconds_to_samples(self.max_duration, self.sample_rate)
    }

    /// Validate all parameters
    ///
    /// # Returns
    /// * `Ok(())` - Settings can drive a detector
    /// * `Err(ConfigurationError)` - First invalid parameter found
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigurationError::SampleRateInvalid {
                sample_rate: self.sample_rate,
            });
        }

        let nyquist = self.nyquist();
        let low_stop = self.f0 - self.bw;
        let high_stop = self.f1 + self.bw;
        let band_ok = self.bw > 0.0
            && low_stop > 0.0
            && self.f0 < self.f1
            && high_stop < nyquist
            && high_stop.is_finite();
        if !band_ok {
            return Err(ConfigurationError::BandInvalid {
                f0: self.f0,
                f1: self.f1,
                bw: self.bw,
                nyquist,
            });
        }

        if self.filter_length < 2 {
            return Err(ConfigurationError::FilterLengthInvalid {
                filter_length: self.filter_length,
            });
        }

        if self.integration_time == 0 {
            return Err(ConfigurationError::IntegrationTimeInvalid {
                integration_time: self.integration_time,
            });
        }

        let delay_samples = self.delay_samples();
        if delay_samples == 0 {
            return Err(ConfigurationError::DelayInvalid {
                delay: self.delay,
                delay_samples,
            });
        }

        if !(self.threshold.is_finite() && self.threshold > 1.0) {
            return Err(ConfigurationError::ThresholdInvalid {
                threshold: self.threshold,
            });
        }

        let durations_ok = self.min_duration > 0.0
            && self.min_duration <= self.max_duration
            && self.max_duration.is_finite()
            && self.min_length() >= 1
            && self.max_length() <= i64::MAX as u64;
        if !durations_ok {
            return Err(ConfigurationError::DurationInvalid {
                min_duration: self.min_duration,
                max_duration: self.max_duration,
            });
        }

        Ok(())
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::tseep()
    }
}

// Legacy `fix`: truncation toward zero. Negative and NaN products saturate to 0.
fn seconds_to_samples(seconds: f64, sample_rate: f64) -> u64 {
    (seconds * sample_rate).trunc() as u64
}

/// Streaming driver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingConfig {
    /// Duration of each chunk handed to the detector, in seconds
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration: f64,
    /// Merge touching and overlapping clips before reporting
    #[serde(default)]
    pub merge_clips: bool,
}

fn default_chunk_duration() -> f64 {
    1.0
}

impl StreamingConfig {
    /// Chunk size in samples, rounded to nearest and never zero.
    pub fn chunk_size(&self, sample_rate: f64) -> usize {
        ((self.chunk_duration * sample_rate).round() as usize).max(1)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_duration: default_chunk_duration(),
            merge_clips: false,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the default configuration if the file
    /// doesn't exist or its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
