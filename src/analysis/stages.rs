// Stages - fixed streaming DSP stages of the transient detector
//
// Every stage runs in "valid" mode: output sample p depends only on input
// samples p..=p+consumed, so `execute` over any window of the signal gives
// bit-identical values for the samples that window covers. This is what
// lets chunked and whole-signal detection agree.

/// One stage of the detection chain
pub trait Stage: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Offset added to an output position to index it in the input
    fn latency(&self) -> usize;

    /// Leading input samples consumed before the first valid output sample
    ///
    /// Equal to [`Stage::latency`] for every stage except [`DelayRatio`].
    fn consumed(&self) -> usize {
        self.latency()
    }

    /// Run the stage over `input`
    ///
    /// # Returns
    /// `input.len() - consumed()` output samples (empty if the input is
    /// not longer than that).
    fn execute(&self, input: &[f64]) -> Vec<f64>;
}

/// Direct-form FIR filter (valid convolution)
#[derive(Debug, Clone)]
pub struct FirFilter {
    /// Coefficients in reverse order, so each output is a dot product with
    /// an input window
    reversed: Vec<f64>,
}

impl FirFilter {
    pub fn new(coefficients: &[f64]) -> Self {
        Self {
            reversed: coefficients.iter().rev().copied().collect(),
        }
    }

    pub fn tap_count(&self) -> usize {
        self.reversed.len()
    }
}

impl Stage for FirFilter {
    fn name(&self) -> &'static str {
        "bandpass"
    }

    fn latency(&self) -> usize {
        self.reversed.len().saturating_sub(1)
    }

    fn execute(&self, input: &[f64]) -> Vec<f64> {
        if self.reversed.is_empty() {
            return Vec::new();
        }
        input
            .windows(self.reversed.len())
            .map(|window| {
                window
                    .iter()
                    .zip(&self.reversed)
                    .map(|(x, h)| x * h)
                    .sum()
            })
            .collect()
    }
}

/// Instantaneous power, `y = x²`
#[derive(Debug, Clone, Copy, Default)]
pub struct Squarer;

impl Stage for Squarer {
    fn name(&self) -> &'static str {
        "squarer"
    }

    fn latency(&self) -> usize {
        0
    }

    fn execute(&self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|x| x * x).collect()
    }
}

/// Moving average over `length` samples
#[derive(Debug, Clone)]
pub struct Integrator {
    filter: FirFilter,
}

impl Integrator {
    pub fn new(length: usize) -> Self {
        let weight = 1.0 / length as f64;
        Self {
            filter: FirFilter::new(&vec![weight; length]),
        }
    }
}

impl Stage for Integrator {
    fn name(&self) -> &'static str {
        "integrator"
    }

    fn latency(&self) -> usize {
        self.filter.latency()
    }

    fn execute(&self, input: &[f64]) -> Vec<f64> {
        self.filter.execute(input)
    }
}

/// Ratio of the power `delay` samples ahead to the current power
///
/// `y[i] = x[i + delay] / x[i]`. Output sample `i` needs input up to
/// `i + delay`, so the stage consumes `delay` leading samples, but it is
/// indexed with latency `delay - 1` like the legacy detectors.
#[derive(Debug, Clone, Copy)]
pub struct DelayRatio {
    delay: usize,
}

impl DelayRatio {
    pub fn new(delay: usize) -> Self {
        Self { delay }
    }
}

impl Stage for DelayRatio {
    fn name(&self) -> &'static str {
        "delay_ratio"
    }

    fn latency(&self) -> usize {
        self.delay.saturating_sub(1)
    }

    fn consumed(&self) -> usize {
        self.delay
    }

    fn execute(&self, input: &[f64]) -> Vec<f64> {
        if input.len() <= self.delay {
            return Vec::new();
        }
        input
            .iter()
            .zip(&input[self.delay..])
            .map(|(now, ahead)| ahead / now)
            .collect()
    }
}

/// Marker value of an upward crossing of the threshold
pub const RISE_MARK: f64 = 1.0;

/// Marker value of a downward crossing of the inverse threshold
pub const FALL_MARK: f64 = -2.0;

/// Threshold-crossing marker
///
/// Maps each ratio to a level (`+1` above `threshold`, `-2` below
/// `1 / threshold`, `0` otherwise) and outputs the first difference of the
/// levels. [`RISE_MARK`] and [`FALL_MARK`] are the only differences that
/// carry meaning; `±1` and `+2` are returns to the neutral band.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdMarker {
    threshold: f64,
    inverse: f64,
}

impl ThresholdMarker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            inverse: 1.0 / threshold,
        }
    }

    fn level(&self, ratio: f64) -> f64 {
        if ratio > self.threshold {
            1.0
        } else if ratio < self.inverse {
            -2.0
        } else {
            0.0
        }
    }
}

impl Stage for ThresholdMarker {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn latency(&self) -> usize {
        1
    }

    fn execute(&self, input: &[f64]) -> Vec<f64> {
        let levels: Vec<f64> = input.iter().map(|&r| self.level(r)).collect();
        levels
            .windows(2)
            .map(|pair| {
                let mark = pair[1] - pair[0];
                debug_assert!(
                    mark.abs() != 3.0,
                    "ratio crossed both thresholds in one sample"
                );
                mark
            })
            .collect()
    }
}
