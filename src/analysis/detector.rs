// StreamingDetector - chunked driver for the stage chain and state machine
//
// Each call prepends the carry (the trailing `consumed` samples of
// everything seen so far) to the new chunk, so the chain sees every
// window it would have seen over the whole signal exactly once. Marker
// output p of a call covers combined samples p..=p+consumed and is indexed
// at p+latency, one sample before its last input sample, as in the legacy
// detectors.

use super::chain::StageChain;
use super::transient::{CrossingEvent, CrossingKind, Transient, TransientStateMachine};
use crate::clips::Clip;
use crate::config::DetectorSettings;
use crate::error::ConfigurationError;

/// Streaming transient detector for one channel
///
/// Chunks must be submitted in temporal order. Output is independent of
/// how the signal is split into chunks.
#[derive(Debug)]
pub struct StreamingDetector {
    settings: DetectorSettings,
    chain: StageChain,
    machine: TransientStateMachine,
    carry: Vec<f64>,
    samples_submitted: u64,
    primed: bool,
}

impl StreamingDetector {
    /// Create a detector from validated settings
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] if the settings are invalid.
    pub fn new(settings: DetectorSettings) -> Result<Self, ConfigurationError> {
        let chain = StageChain::from_settings(&settings)?;
        let machine = TransientStateMachine::new(settings.min_length(), settings.max_length());

        log::info!(
            "[StreamingDetector] Created: sample_rate={}, band={}-{} Hz, latency={} samples, lengths={}..={}",
            settings.sample_rate,
            settings.f0,
            settings.f1,
            chain.latency(),
            settings.min_length(),
            settings.max_length()
        );

        Ok(Self {
            settings,
            carry: Vec::with_capacity(chain.consumed()),
            chain,
            machine,
            samples_submitted: 0,
            primed: false,
        })
    }

    /// Process the next chunk of samples
    ///
    /// # Arguments
    /// * `chunk` - Samples following the previous chunk; may be empty
    ///
    /// # Returns
    /// Padded clips completed by this chunk, in order.
    pub fn detect(&mut self, chunk: &[f64]) -> Vec<Clip> {
        let latency = self.chain.latency();
        let consumed = self.chain.consumed();
        let carried = self.carry.len() as u64;

        let mut combined = std::mem::take(&mut self.carry);
        combined.extend_from_slice(chunk);
        // Absolute index of combined[0]
        let base = self.samples_submitted - carried;
        self.samples_submitted += chunk.len() as u64;

        if combined.len() <= consumed {
            self.carry = combined;
            return Vec::new();
        }

        if !self.primed {
            self.primed = true;
            log::debug!(
                "[StreamingDetector] Pipeline filled after {} samples",
                self.samples_submitted
            );
        }

        let marks = self.chain.execute(&combined);
        let offset = base + latency as u64;
        let events = marks.iter().enumerate().filter_map(|(position, &mark)| {
            CrossingKind::from_mark(mark).map(|kind| CrossingEvent {
                index: offset + position as u64,
                kind,
            })
        });
        let transients = self.machine.process_all(events);

        self.carry = combined.split_off(combined.len() - consumed);

        self.pad(transients)
    }

    /// Close the stream
    ///
    /// Feeds a Fall at the end of the submitted signal, which completes any
    /// open transient.
    pub fn complete_detection(&mut self) -> Vec<Clip> {
        let end = CrossingEvent::fall(self.samples_submitted);
        let transients: Vec<Transient> = self.machine.process(end).into_iter().collect();

        log::debug!(
            "[StreamingDetector] Completed after {} samples, {} final clip(s)",
            self.samples_submitted,
            transients.len()
        );
        self.pad(transients)
    }

    /// Chain latency in samples
    pub fn latency(&self) -> usize {
        self.chain.latency()
    }

    pub fn samples_submitted(&self) -> u64 {
        self.samples_submitted
    }

    /// Whether any chunk has filled the stage chain yet
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    fn pad(&self, transients: Vec<Transient>) -> Vec<Clip> {
        transients
            .into_iter()
            .map(|t| t.padded(self.settings.initial_padding, self.settings.final_padding))
            .collect()
    }
}

/// Run a fresh detector over a whole signal
///
/// # Errors
/// Returns [`ConfigurationError`] if the settings are invalid.
pub fn detect_clips(settings: &DetectorSettings, samples: &[f64]) -> Result<Vec<Clip>, ConfigurationError> {
    let mut detector = StreamingDetector::new(settings.clone())?;
    let mut clips = detector.detect(samples);
    clips.extend(detector.complete_detection());
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> DetectorSettings {
        DetectorSettings {
            sample_rate: 1000.0,
            f0: 150.0,
            f1: 300.0,
            bw: 50.0,
            filter_length: 32,
            integration_time: 300,
            delay: 0.05,
            threshold: 2.0,
            min_duration: 0.1,
            max_duration: 0.4,
            initial_padding: 0,
            final_padding: 0,
        }
    }

    #[test]
    fn test_latency_matches_chain() {
        let detector = StreamingDetector::new(small_settings()).unwrap();
        // 31 + 0 + 299 + 49 + 1
        assert_eq!(detector.latency(), 380);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = DetectorSettings {
            min_duration: 0.5,
            ..small_settings()
        };
        assert!(matches!(
            StreamingDetector::new(settings),
            Err(ConfigurationError::DurationInvalid { .. })
        ));
    }

    #[test]
    fn test_short_chunks_are_buffered() {
        let mut detector = StreamingDetector::new(small_settings()).unwrap();

        assert!(detector.detect(&[0.5; 200]).is_empty());
        assert!(detector.detect(&[]).is_empty());
        assert!(detector.detect(&[0.5; 181]).is_empty());
        assert!(!detector.is_primed());
        assert_eq!(detector.samples_submitted(), 381);

        detector.detect(&[0.5; 1]);
        assert!(detector.is_primed());
        assert_eq!(detector.samples_submitted(), 382);
    }

    #[test]
    fn test_no_data_yields_no_clips() {
        let mut detector = StreamingDetector::new(small_settings()).unwrap();
        assert!(detector.detect(&[0.1; 10]).is_empty());
        assert!(detector.complete_detection().is_empty());
    }

    #[test]
    fn test_completion_closes_open_transient() {
        let mut detector = StreamingDetector::new(small_settings()).unwrap();
        let mut machine_only = TransientStateMachine::new(100, 400);
        machine_only.process(CrossingEvent::rise(900));

        // Same state reached through the detector's own machine
        detector.machine = machine_only;
        detector.samples_submitted = 1150;

        assert_eq!(detector.complete_detection(), vec![Clip::new(900, 250)]);
    }

    #[test]
    fn test_completion_applies_padding() {
        let settings = DetectorSettings {
            initial_padding: 50,
            final_padding: 5,
            ..small_settings()
        };
        let mut detector = StreamingDetector::new(settings).unwrap();
        detector.machine.process(CrossingEvent::rise(20));
        detector.samples_submitted = 500;

        assert_eq!(detector.complete_detection(), vec![Clip::new(-30, 455)]);
    }
}
