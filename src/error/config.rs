// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`ConfigurationError`]. Harnesses compare against these rather than
/// matching on message text.
///
/// Error code range: 1001-1007
pub struct ConfigurationErrorCodes {}

impl ConfigurationErrorCodes {
    /// Sample rate is not a positive, finite number
    pub const SAMPLE_RATE_INVALID: i32 = 1001;

    /// Band edges are not strictly increasing inside (0, Nyquist)
    pub const BAND_INVALID: i32 = 1002;

    /// Filter needs at least two taps
    pub const FILTER_LENGTH_INVALID: i32 = 1003;

    /// Integration time must be at least one sample
    pub const INTEGRATION_TIME_INVALID: i32 = 1004;

    /// Delay must round down to at least one sample
    pub const DELAY_INVALID: i32 = 1005;

    /// Threshold must exceed 1
    pub const THRESHOLD_INVALID: i32 = 1006;

    /// Durations must satisfy 0 < min <= max, cover at least one sample and
    /// keep the maximum length representable as a signed sample offset
    pub const DURATION_INVALID: i32 = 1007;
}

/// Log a configuration error with structured context
///
/// Emits the error code, the component and the message through the
/// `log` facade. Never panics.
pub fn log_configuration_error(err: &ConfigurationError, context: &str) {
    error!(
        "Configuration error in {}: code={}, component=DetectorSettings, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Detector configuration errors
///
/// Raised only while validating [`crate::config::DetectorSettings`], i.e.
/// when a detector is constructed. Detection itself never fails.
///
/// Error code range: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Sample rate is not a positive, finite number
    SampleRateInvalid { sample_rate: f64 },

    /// Passband / transition band layout does not fit below Nyquist
    BandInvalid {
        f0: f64,
        f1: f64,
        bw: f64,
        nyquist: f64,
    },

    /// Filter needs at least two taps
    FilterLengthInvalid { filter_length: usize },

    /// Integration time must be at least one sample
    IntegrationTimeInvalid { integration_time: usize },

    /// Delay must round down to at least one sample
    DelayInvalid { delay: f64, delay_samples: usize },

    /// Threshold must exceed 1
    ThresholdInvalid { threshold: f64 },

    /// Durations must satisfy 0 < min <= max, cover at least one sample and
    /// keep the maximum length representable as a signed sample offset
    DurationInvalid {
        min_duration: f64,
        max_duration: f64,
    },
}

impl ErrorCode for ConfigurationError {
    fn code(&self) -> i32 {
        match self {
            ConfigurationError::SampleRateInvalid { .. } => {
                ConfigurationErrorCodes::SAMPLE_RATE_INVALID
            }
            ConfigurationError::BandInvalid { .. } => ConfigurationErrorCodes::BAND_INVALID,
            ConfigurationError::FilterLengthInvalid { .. } => {
                ConfigurationErrorCodes::FILTER_LENGTH_INVALID
            }
            ConfigurationError::IntegrationTimeInvalid { .. } => {
                ConfigurationErrorCodes::INTEGRATION_TIME_INVALID
            }
            ConfigurationError::DelayInvalid { .. } => ConfigurationErrorCodes::DELAY_INVALID,
            ConfigurationError::ThresholdInvalid { .. } => {
                ConfigurationErrorCodes::THRESHOLD_INVALID
            }
            ConfigurationError::DurationInvalid { .. } => {
                ConfigurationErrorCodes::DURATION_INVALID
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigurationError::SampleRateInvalid { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            ConfigurationError::BandInvalid {
                f0,
                f1,
                bw,
                nyquist,
            } => format!(
                "Band layout invalid: need 0 < f0 - bw < f0 < f1 < f1 + bw < {} (got f0={}, f1={}, bw={})",
                nyquist, f0, f1, bw
            ),
            ConfigurationError::FilterLengthInvalid { filter_length } => {
                format!("Filter length must be at least 2 (got {})", filter_length)
            }
            ConfigurationError::IntegrationTimeInvalid { integration_time } => format!(
                "Integration time must be at least 1 sample (got {})",
                integration_time
            ),
            ConfigurationError::DelayInvalid {
                delay,
                delay_samples,
            } => format!(
                "Delay of {} s truncates to {} samples, need at least 1",
                delay, delay_samples
            ),
            ConfigurationError::ThresholdInvalid { threshold } => {
                format!("Threshold must be greater than 1 (got {})", threshold)
            }
            ConfigurationError::DurationInvalid {
                min_duration,
                max_duration,
            } => format!(
                "Durations must satisfy 0 < min <= max with at least one sample each and a bounded maximum (got min={}, max={})",
                min_duration, max_duration
            ),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigurationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigurationError {}
