// FilterDesigner - least-squares linear-phase FIR design
//
// Designs symmetric FIR coefficients minimizing the unweighted squared error
// between a piecewise-linear desired response and the achieved response.
//
// Algorithm (N taps, frequencies normalized so Nyquist = 1):
// 1. q(n) = Σ_bands [f·sinc(f·n)] from band low to band high edge
// 2. Odd N, M = (N-1)/2: Q(i,j) = q(|i-j|) + q(i+j), size M+1, right-hand
//    side from the cosine moments of the desired response at integer n.
//    Solved by Cholesky (pseudo-inverse if Q is not positive definite);
//    the centre tap is doubled on reassembly.
// 3. Even N, M = N/2: Q(i,j) = q(|i-j|) + q(i+j+1), size M, right-hand side
//    from the cosine moments at half-integer n = k + 1/2 (there is no
//    centre tap). Solved by pseudo-inverse and mirrored.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

/// Relative cutoff below which singular values are discarded when solving
/// through the pseudo-inverse.
pub const PINV_RCOND: f64 = 1e-15;

/// Band layout for a three-band (stop / pass / stop) design
///
/// `band_edges` are ascending frequencies normalized to Nyquist = 1 and
/// taken in pairs; `desired` holds the gain at each edge, interpolated
/// linearly across each band.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub band_edges: [f64; 6],
    pub desired: [f64; 6],
}

impl FilterSpec {
    /// Bandpass layout used by the detector: stopband up to `f0 - bw`,
    /// passband `[f0, f1]`, stopband from `f1 + bw` to Nyquist.
    pub fn bandpass(sample_rate: f64, f0: f64, f1: f64, bw: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        Self {
            band_edges: [
                0.0,
                (f0 - bw) / nyquist,
                f0 / nyquist,
                f1 / nyquist,
                (f1 + bw) / nyquist,
                1.0,
            ],
            desired: [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        }
    }

    fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        (0..3).map(move |j| Band {
            low: self.band_edges[2 * j],
            high: self.band_edges[2 * j + 1],
            gain_low: self.desired[2 * j],
            gain_high: self.desired[2 * j + 1],
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Band {
    low: f64,
    high: f64,
    gain_low: f64,
    gain_high: f64,
}

impl Band {
    fn slope(&self) -> f64 {
        (self.gain_high - self.gain_low) / (self.high - self.low)
    }

    fn intercept(&self) -> f64 {
        self.gain_low - self.low * self.slope()
    }

    /// Antiderivative of `(slope·f + intercept)·cos(π·n·f)` evaluated at `f`.
    fn cosine_moment(&self, n: f64, f: f64) -> f64 {
        let m = self.slope();
        let c = self.intercept();
        let linear = f * (m * f + c) * sinc(f * n);
        if n == 0.0 {
            linear - m * f * f / 2.0
        } else {
            linear + m * (PI * n * f).cos() / (PI * n).powi(2)
        }
    }

    fn moment(&self, n: f64) -> f64 {
        self.cosine_moment(n, self.high) - self.cosine_moment(n, self.low)
    }
}

/// Design a symmetric FIR filter of `tap_count` taps
///
/// # Arguments
/// * `tap_count` - Number of coefficients; odd and even counts are supported
/// * `spec` - Band edges and desired gains
///
/// # Returns
/// Coefficients satisfying `h[i] == h[tap_count - 1 - i]`. A near-singular
/// system degrades through the pseudo-inverse instead of failing.
pub fn design(tap_count: usize, spec: &FilterSpec) -> Vec<f64> {
    match tap_count {
        0 => Vec::new(),
        n if n % 2 == 1 => design_odd(n, spec),
        n => design_even(n, spec),
    }
}

/// Magnitude of the frequency response of `coefficients` at normalized
/// frequency `f` (Nyquist = 1).
pub fn magnitude_response(coefficients: &[f64], f: f64) -> f64 {
    let (re, im) = coefficients
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(re, im), (n, &h)| {
            let phase = PI * f * n as f64;
            (re + h * phase.cos(), im - h * phase.sin())
        });
    re.hypot(im)
}

fn design_odd(tap_count: usize, spec: &FilterSpec) -> Vec<f64> {
    let m = (tap_count - 1) / 2;
    let q = band_integrals(tap_count, spec);

    let system = DMatrix::from_fn(m + 1, m + 1, |i, j| q[i.abs_diff(j)] + q[i + j]);
    let rhs = DVector::from_fn(m + 1, |n, _| {
        spec.bands().map(|band| band.moment(n as f64)).sum::<f64>()
    });

    let solution = match system.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => {
            log::debug!(
                "[FilterDesigner] {}-tap system not positive definite, using pseudo-inverse",
                tap_count
            );
            pinv_solve(system, &rhs)
        }
    };
    let a: Vec<f64> = solution.iter().copied().collect();

    let mut coefficients = Vec::with_capacity(tap_count);
    coefficients.extend(a[1..].iter().rev());
    coefficients.push(2.0 * a[0]);
    coefficients.extend(&a[1..]);
    coefficients
}

fn design_even(tap_count: usize, spec: &FilterSpec) -> Vec<f64> {
    let m = tap_count / 2;
    let q = band_integrals(tap_count, spec);

    let system = DMatrix::from_fn(m, m, |i, j| q[i.abs_diff(j)] + q[i + j + 1]);
    let rhs = DVector::from_fn(m, |k, _| {
        let n = k as f64 + 0.5;
        spec.bands().map(|band| band.moment(n)).sum::<f64>()
    });

    let a: Vec<f64> = pinv_solve(system, &rhs).iter().copied().collect();
    a.iter().rev().chain(a.iter()).copied().collect()
}

fn band_integrals(tap_count: usize, spec: &FilterSpec) -> Vec<f64> {
    (0..tap_count)
        .map(|n| {
            let n = n as f64;
            spec.bands()
                .map(|band| band.high * sinc(band.high * n) - band.low * sinc(band.low * n))
                .sum()
        })
        .collect()
}

fn pinv_solve(system: DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let svd = system.svd(true, true);
    let cutoff = PINV_RCOND * svd.singular_values.max();
    match svd.pseudo_inverse(cutoff) {
        Ok(inverse) => inverse * rhs,
        Err(reason) => {
            log::warn!("[FilterDesigner] Pseudo-inverse failed: {}", reason);
            DVector::zeros(rhs.len())
        }
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spec() -> FilterSpec {
        FilterSpec::bandpass(1000.0, 150.0, 300.0, 50.0)
    }

    #[test]
    fn test_coefficients_are_symmetric() {
        let spec = test_spec();
        for taps in (2..=40).chain([99, 100, 101]) {
            let h = design(taps, &spec);
            assert_eq!(h.len(), taps);
            for i in 0..taps {
                assert!(
                    (h[i] - h[taps - 1 - i]).abs() <= 1e-9,
                    "{} taps: h[{}] != h[{}]",
                    taps,
                    i,
                    taps - 1 - i
                );
            }
        }
    }

    #[test]
    fn test_even_length_bandpass_response() {
        let h = design(64, &test_spec());

        assert!((magnitude_response(&h, 0.45) - 1.0).abs() < 0.01);
        assert!(magnitude_response(&h, 0.0) < 0.01);
        assert!(magnitude_response(&h, 0.95) < 0.01);
    }

    #[test]
    fn test_even_length_agrees_with_adjacent_odd_length() {
        let spec = test_spec();
        let even = design(64, &spec);
        let odd = design(65, &spec);

        for f in [0.0, 0.1, 0.2, 0.45, 0.7, 0.9] {
            let delta = (magnitude_response(&even, f) - magnitude_response(&odd, f)).abs();
            assert!(delta < 0.01, "responses differ by {} at f={}", delta, f);
        }
    }

    #[test]
    fn test_shortest_filters() {
        let spec = test_spec();

        let two = design(2, &spec);
        assert!((two[0] - 0.291_712_858_339).abs() < 1e-9);

        let three = design(3, &spec);
        assert!((three[0] - 0.063_844_523_334).abs() < 1e-9);
        assert!((three[1] - 0.379_023_428_644).abs() < 1e-9);

        assert!(design(0, &spec).is_empty());
    }

    #[test]
    fn test_legacy_filter_length_is_finite() {
        let settings = crate::config::DetectorSettings::tseep();
        let spec = FilterSpec::bandpass(settings.sample_rate, settings.f0, settings.f1, settings.bw);
        let h = design(settings.filter_length, &spec);

        assert!(h.iter().all(|c| c.is_finite()));
        let centre = (settings.f0 + settings.f1) / 2.0 / settings.nyquist();
        assert!((magnitude_response(&h, centre) - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_bandpass_edges_are_normalized() {
        let spec = FilterSpec::bandpass(22050.0, 6000.0, 10000.0, 100.0);
        assert_eq!(spec.band_edges[0], 0.0);
        assert_eq!(spec.band_edges[5], 1.0);
        assert!(spec.band_edges.windows(2).all(|w| w[0] < w[1]));
    }
}
