// Error types for the clip detector
//
// This module defines custom error types for detector configuration and
// reference-filter extraction, providing structured error handling with
// stable numeric codes for harnesses and CLI reporting.

mod config;
mod extraction;

pub use config::{log_configuration_error, ConfigurationError, ConfigurationErrorCodes};
pub use extraction::{log_extraction_error, ExtractionError, ExtractionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the command-line harness.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait() {
        let config_err: &dyn ErrorCode = &ConfigurationError::ThresholdInvalid { threshold: 0.5 };
        assert_eq!(config_err.code(), 1006);

        let extraction_err: &dyn ErrorCode = &ExtractionError::DftNotFound { sequence_len: 15 };
        assert_eq!(extraction_err.code(), 2001);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), ConfigurationError> {
            Err(ConfigurationError::FilterLengthInvalid { filter_length: 1 })
        }

        fn caller() -> Result<(), ConfigurationError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }

    #[test]
    fn test_errors_convert_into_anyhow() {
        fn may_fail() -> anyhow::Result<()> {
            Err(ExtractionError::TapCountInvalid {
                tap_count: 0,
                dft_size: 16384,
            })?;
            Ok(())
        }

        let err = may_fail().unwrap_err();
        assert!(err.to_string().contains("code 2003"));
    }
}
