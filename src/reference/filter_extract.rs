// FilterExtractor - recover bandpass coefficients from a legacy detector binary
//
// The legacy executables store their bandpass filter as the complex DFT of
// the zero-padded coefficients: `dft_size` little-endian f64 real parts
// followed by `dft_size` imaginary parts. Bins 1..dft_size of the real part
// form an even-symmetric run, which is how the table is located. The DC
// real part sits immediately before that run.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::ExtractionError;

/// Spectrum size used by the legacy detectors
pub const LEGACY_DFT_SIZE: usize = 16_384;

/// Coefficient count of the legacy bandpass filters
pub const LEGACY_TAP_COUNT: usize = 100;

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Byte offsets of every even-symmetric, not-all-zero run of `seq_len`
/// numbers of `num_size` bytes
///
/// Symmetry compares the raw bytes of number `i` with number
/// `seq_len - 1 - i`. Every byte offset is tried, aligned or not.
pub fn find_symmetric_sequences(data: &[u8], seq_len: usize, num_size: usize) -> Vec<usize> {
    symmetric_offsets(data, seq_len, num_size).collect()
}

fn symmetric_offsets(data: &[u8], seq_len: usize, num_size: usize) -> impl Iterator<Item = usize> + '_ {
    let span = seq_len * num_size;
    let last = if span == 0 || data.len() < span {
        0
    } else {
        data.len() - span + 1
    };
    (0..last).filter(move |&offset| {
        let run = &data[offset..offset + span];
        is_symmetric(run, seq_len, num_size) && run.iter().any(|&b| b != 0)
    })
}

fn is_symmetric(run: &[u8], seq_len: usize, num_size: usize) -> bool {
    (0..seq_len / 2).all(|i| {
        let j = seq_len - 1 - i;
        run[i * num_size..(i + 1) * num_size] == run[j * num_size..(j + 1) * num_size]
    })
}

/// Extracts FIR coefficients from the filter spectrum embedded in a binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterExtractor {
    pub dft_size: usize,
    pub tap_count: usize,
}

impl Default for FilterExtractor {
    fn default() -> Self {
        Self {
            dft_size: LEGACY_DFT_SIZE,
            tap_count: LEGACY_TAP_COUNT,
        }
    }
}

impl FilterExtractor {
    pub fn new(dft_size: usize, tap_count: usize) -> Self {
        Self {
            dft_size,
            tap_count,
        }
    }

    /// Locate the spectrum in `data` and invert it
    ///
    /// # Returns
    /// `tap_count` coefficients, made exactly symmetric
    /// (`h[n - 1 - i] = h[i]`) to remove round-off from the inverse DFT.
    pub fn extract(&self, data: &[u8]) -> Result<Vec<f64>, ExtractionError> {
        if self.tap_count == 0 || self.tap_count > self.dft_size {
            return Err(ExtractionError::TapCountInvalid {
                tap_count: self.tap_count,
                dft_size: self.dft_size,
            });
        }

        let spectrum = self.read_spectrum(data)?;
        Ok(self.invert(spectrum))
    }

    fn read_spectrum(&self, data: &[u8]) -> Result<Vec<Complex<f64>>, ExtractionError> {
        let run_len = self.dft_size - 1;
        let not_found = ExtractionError::DftNotFound {
            sequence_len: run_len,
        };

        let run_offset = symmetric_offsets(data, run_len, F64_SIZE)
            .next()
            .ok_or_else(|| not_found.clone())?;
        // DC real part precedes the symmetric run
        let start = run_offset.checked_sub(F64_SIZE).ok_or(not_found)?;

        let needed = 2 * self.dft_size * F64_SIZE;
        let available = data.len() - start;
        if available < needed {
            return Err(ExtractionError::DftTruncated { needed, available });
        }

        log::info!(
            "[FilterExtractor] Found {}-point filter spectrum at byte offset {}",
            self.dft_size,
            start
        );

        let values: Vec<f64> = data[start..start + needed]
            .chunks_exact(F64_SIZE)
            .map(|bytes| {
                let mut raw = [0u8; F64_SIZE];
                raw.copy_from_slice(bytes);
                f64::from_le_bytes(raw)
            })
            .collect();
        let (re, im) = values.split_at(self.dft_size);

        Ok(re
            .iter()
            .zip(im)
            .map(|(&re, &im)| Complex::new(re, im))
            .collect())
    }

    fn invert(&self, mut spectrum: Vec<Complex<f64>>) -> Vec<f64> {
        let mut planner = FftPlanner::<f64>::new();
        let ifft = planner.plan_fft_inverse(self.dft_size);
        ifft.process(&mut spectrum);

        let scale = 1.0 / self.dft_size as f64;
        let mut taps: Vec<f64> = spectrum[..self.tap_count]
            .iter()
            .map(|c| c.re * scale)
            .collect();

        let n = taps.len();
        for i in 0..n / 2 {
            taps[n - 1 - i] = taps[i];
        }
        taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::firls::{self, FilterSpec};

    /// Binary image holding the spectrum of `taps` zero-padded to `dft_size`
    fn embed_spectrum(taps: &[f64], dft_size: usize, prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
        let mut buffer: Vec<Complex<f64>> = taps
            .iter()
            .map(|&h| Complex::new(h, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(dft_size)
            .collect();
        FftPlanner::<f64>::new().plan_fft_forward(dft_size).process(&mut buffer);

        // Exact conjugate symmetry so the real part is bitwise even
        for k in 1..dft_size / 2 {
            buffer[dft_size - k] = buffer[k].conj();
        }

        let mut data = prefix.to_vec();
        data.extend(buffer.iter().flat_map(|c| c.re.to_le_bytes()));
        data.extend(buffer.iter().flat_map(|c| c.im.to_le_bytes()));
        data.extend_from_slice(suffix);
        data
    }

    #[test]
    fn test_find_symmetric_sequences() {
        let data = [0u8, 1, 2, 3, 4, 3, 2, 0, 1];
        assert_eq!(find_symmetric_sequences(&data, 5, 1), vec![2]);

        let data = [0u8, 1, 2, 0, 0, 1, 1, 2, 2, 1, 1, 0, 0, 1, 2, 3];
        assert_eq!(find_symmetric_sequences(&data, 5, 2), vec![3]);
    }

    #[test]
    fn test_all_zero_runs_are_skipped() {
        let data = [0u8; 32];
        assert!(find_symmetric_sequences(&data, 3, 8).is_empty());
        assert!(find_symmetric_sequences(&data[..4], 3, 8).is_empty());
    }

    #[test]
    fn test_extract_recovers_coefficients() {
        let spec = FilterSpec::bandpass(1000.0, 150.0, 300.0, 50.0);
        let taps = firls::design(16, &spec);
        let data = embed_spectrum(&taps, 256, &[0x5A; 13], &[0xFF, 0x01, 0x7F]);

        let extracted = FilterExtractor::new(256, 16).extract(&data).unwrap();

        assert_eq!(extracted.len(), 16);
        for (i, (a, b)) in extracted.iter().zip(&taps).enumerate() {
            assert!((a - b).abs() < 1e-9, "tap {}: {} vs {}", i, a, b);
        }
        for i in 0..8 {
            assert_eq!(extracted[i], extracted[15 - i]);
        }
    }

    #[test]
    fn test_extract_odd_tap_count() {
        let spec = FilterSpec::bandpass(1000.0, 150.0, 300.0, 50.0);
        let taps = firls::design(15, &spec);
        let data = embed_spectrum(&taps, 128, &[1, 2, 3], &[]);

        let extracted = FilterExtractor::new(128, 15).extract(&data).unwrap();
        for (a, b) in extracted.iter().zip(&taps) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extract_errors() {
        let spec = FilterSpec::bandpass(1000.0, 150.0, 300.0, 50.0);
        let taps = firls::design(16, &spec);
        let data = embed_spectrum(&taps, 64, &[9; 8], &[]);

        assert!(matches!(
            FilterExtractor::new(64, 0).extract(&data),
            Err(ExtractionError::TapCountInvalid { .. })
        ));
        assert!(matches!(
            FilterExtractor::new(64, 16).extract(&data[..data.len() - 8]),
            Err(ExtractionError::DftTruncated { .. })
        ));
        assert!(matches!(
            FilterExtractor::new(64, 16).extract(&[7u8; 100]),
            Err(ExtractionError::DftNotFound { sequence_len: 63 })
        ));
    }
}
