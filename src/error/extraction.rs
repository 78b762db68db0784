// Reference filter extraction error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Extraction error code constants
///
/// Error code range: 2001-2003
pub struct ExtractionErrorCodes {}

impl ExtractionErrorCodes {
    /// No even-symmetric spectrum run was found in the binary
    pub const DFT_NOT_FOUND: i32 = 2001;

    /// The binary ends before the full spectrum could be read
    pub const DFT_TRUNCATED: i32 = 2002;

    /// Requested tap count does not fit in the spectrum size
    pub const TAP_COUNT_INVALID: i32 = 2003;
}

/// Log an extraction error with structured context
pub fn log_extraction_error(err: &ExtractionError, context: &str) {
    error!(
        "Extraction error in {}: code={}, component=FilterExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while recovering filter coefficients from a legacy
/// detector binary.
///
/// Error code range: 2001-2003
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No even-symmetric spectrum run was found in the binary
    DftNotFound { sequence_len: usize },

    /// The binary ends before the full spectrum could be read
    DftTruncated { needed: usize, available: usize },

    /// Requested tap count does not fit in the spectrum size
    TapCountInvalid { tap_count: usize, dft_size: usize },
}

impl ErrorCode for ExtractionError {
    fn code(&self) -> i32 {
        match self {
            ExtractionError::DftNotFound { .. } => ExtractionErrorCodes::DFT_NOT_FOUND,
            ExtractionError::DftTruncated { .. } => ExtractionErrorCodes::DFT_TRUNCATED,
            ExtractionError::TapCountInvalid { .. } => ExtractionErrorCodes::TAP_COUNT_INVALID,
        }
    }

    fn message(&self) -> String {
        match self {
            ExtractionError::DftNotFound { sequence_len } => format!(
                "No even-symmetric run of {} doubles found in binary",
                sequence_len
            ),
            ExtractionError::DftTruncated { needed, available } => format!(
                "Filter spectrum truncated: need {} bytes, {} available",
                needed, available
            ),
            ExtractionError::TapCountInvalid {
                tap_count,
                dft_size,
            } => format!(
                "Tap count must be in 1..={} (got {})",
                dft_size, tap_count
            ),
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtractionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ExtractionError {}
