// Analysis module - transient detection pipeline
//
// This module turns a single-channel sample stream into clip windows,
// reproducing the legacy Tseep/Thrush detectors exactly whether the signal
// arrives in one piece or in arbitrary chunks.
//
// Architecture:
// - firls: least-squares bandpass design (odd and even tap counts)
// - stages / chain: bandpass → squarer → integrator → delay ratio → marker
// - transient: crossing events → bounded transients
// - detector: chunked driver with carry-over buffer and absolute indexing

pub mod chain;
pub mod detector;
pub mod firls;
pub mod stages;
pub mod transient;

pub use chain::StageChain;
pub use detector::{detect_clips, StreamingDetector};
pub use firls::FilterSpec;
pub use stages::Stage;
pub use transient::{CrossingEvent, CrossingKind, DetectorState, Transient, TransientStateMachine};

#[cfg(test)]
mod tests;
