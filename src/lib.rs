// Clip Detector Core - streaming transient detection
// Chunk-invariant reimplementation of the legacy Tseep/Thrush clip detectors

// Module declarations
pub mod analysis;
pub mod clips;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod reference;
pub mod testing;

// Re-exports for convenience
pub use analysis::{detect_clips, StreamingDetector};
pub use clips::{match_clips, merge_clips, Clip, ClipMatch};
pub use config::{AppConfig, DetectorSettings};
pub use error::{ConfigurationError, ErrorCode, ExtractionError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let settings = DetectorSettings::default();
        assert!(settings.validate().is_ok());

        let detector = StreamingDetector::new(settings).unwrap();
        assert_eq!(detector.latency(), 2539);
    }

    #[test]
    fn test_presets_construct() {
        for name in ["tseep", "thrush"] {
            let settings = DetectorSettings::preset(name).unwrap();
            assert!(StreamingDetector::new(settings).is_ok(), "{}", name);
        }
    }
}
