// StageChain - ordered composition of the detector stages

use super::firls::{self, FilterSpec};
use super::stages::{DelayRatio, FirFilter, Integrator, Squarer, Stage, ThresholdMarker};
use crate::config::DetectorSettings;
use crate::error::ConfigurationError;

/// Linear chain of stages executed in order
///
/// The chain latency is the sum of its stage latencies and is fixed at
/// construction. It can be one less than the number of samples the chain
/// consumes, because [`DelayRatio`] is indexed one sample early.
pub struct StageChain {
    stages: Vec<Box<dyn Stage>>,
    latency: usize,
    consumed: usize,
}

impl StageChain {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        let latency = stages.iter().map(|stage| stage.latency()).sum();
        let consumed = stages.iter().map(|stage| stage.consumed()).sum();
        Self {
            stages,
            latency,
            consumed,
        }
    }

    /// Build the five-stage detector chain
    ///
    /// Bandpass → squarer → integrator → delay ratio → threshold marker.
    ///
    /// # Errors
    /// Returns the first [`ConfigurationError`] found by
    /// [`DetectorSettings::validate`].
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let spec = FilterSpec::bandpass(settings.sample_rate, settings.f0, settings.f1, settings.bw);
        let coefficients = firls::design(settings.filter_length, &spec);

        let chain = Self::new(vec![
            Box::new(FirFilter::new(&coefficients)),
            Box::new(Squarer),
            Box::new(Integrator::new(settings.integration_time)),
            Box::new(DelayRatio::new(settings.delay_samples())),
            Box::new(ThresholdMarker::new(settings.threshold)),
        ]);

        log::debug!(
            "[StageChain] Built chain {:?}, latency {} samples",
            chain.stage_latencies(),
            chain.latency
        );
        Ok(chain)
    }

    /// Total latency in samples
    pub fn latency(&self) -> usize {
        self.latency
    }

    /// Leading input samples consumed before the first marker value
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// `(name, latency)` of each stage, in execution order
    pub fn stage_latencies(&self) -> Vec<(&'static str, usize)> {
        self.stages
            .iter()
            .map(|stage| (stage.name(), stage.latency()))
            .collect()
    }

    /// Run every stage in order
    ///
    /// # Returns
    /// `input.len() - consumed()` marker values, or nothing if the input
    /// does not fill the chain.
    pub fn execute(&self, input: &[f64]) -> Vec<f64> {
        if input.len() <= self.consumed {
            return Vec::new();
        }
        let mut stages = self.stages.iter();
        let mut signal = match stages.next() {
            Some(first) => first.execute(input),
            None => return input.to_vec(),
        };
        for stage in stages {
            signal = stage.execute(&signal);
        }
        signal
    }
}

impl std::fmt::Debug for StageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageChain")
            .field("stages", &self.stage_latencies())
            .field("latency", &self.latency)
            .field("consumed", &self.consumed)
            .finish()
    }
}
