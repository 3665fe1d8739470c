//! Triangular mel filterbank with geometric center spacing
//!
//! Bin centers are spaced geometrically between `min_freq` and `max_freq`
//! with ratio `a = (max_freq/min_freq)^(1/(n_bins+1))`, converted to FFT bin
//! indices by rounding `freq*win/sr`. Adjacent centers that round to the
//! same FFT bin are pushed apart by one bin so every triangle keeps a
//! well-defined ascending and descending slope.

use crate::error::AnalysisError;

/// A (win/2+1) x n_bins matrix of triangular filter weights
///
/// Built once per `(win, sr, min_freq, max_freq, n_bins)` tuple and
/// immutable afterwards. Rows index FFT bins, columns index mel bins.
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    weights: Vec<Vec<f32>>,
    n_bins: usize,
}

impl MelFilterbank {
    /// Build the filterbank
    ///
    /// # Arguments
    ///
    /// * `win` - FFT window length; the filterbank spans `win/2 + 1` FFT bins
    /// * `sr` - Sample rate in Hz
    /// * `min_freq` - Center of the lowest mel bin in Hz
    /// * `max_freq` - Center of the highest mel bin in Hz
    /// * `n_bins` - Number of mel bins
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DegenerateFilterbank` if `min_freq <= 0`,
    /// `min_freq >= max_freq`, or `n_bins == 0`; `AnalysisError::InvalidWindow`
    /// if `win == 0` or `sr == 0`.
    pub fn new(
        win: usize,
        sr: u32,
        min_freq: f32,
        max_freq: f32,
        n_bins: usize,
    ) -> Result<Self, AnalysisError> {
        if win == 0 || sr == 0 {
            return Err(AnalysisError::InvalidWindow(format!(
                "win={}, sr={}; both must be > 0",
                win, sr
            )));
        }
        if n_bins == 0 {
            return Err(AnalysisError::DegenerateFilterbank(
                "n_bins must be > 0".to_string(),
            ));
        }
        if min_freq <= 0.0 || min_freq >= max_freq {
            return Err(AnalysisError::DegenerateFilterbank(format!(
                "frequency range [{:.2}, {:.2}] Hz is not valid",
                min_freq, max_freq
            )));
        }

        let k_bins = win / 2 + 1;

        // Step 1: geometrically spaced bin boundaries, rounded to FFT bins
        let a = ((max_freq / min_freq) as f64).ln() / (n_bins as f64 + 1.0);
        let a = a.exp();
        let mut centers = Vec::with_capacity(n_bins + 2);
        let mut c = min_freq as f64 * win as f64 / sr as f64;
        for _ in 0..n_bins + 2 {
            centers.push(c);
            c *= a;
        }
        let bins: Vec<usize> = centers.iter().map(|&b| b.round() as usize).collect();

        log::debug!(
            "Building mel filterbank: win={}, sr={}, range=[{:.1}, {:.1}] Hz, {} bins, FFT bins [{}, {}]",
            win,
            sr,
            min_freq,
            max_freq,
            n_bins,
            bins[0],
            bins[n_bins + 1]
        );

        // Step 2: one triangle per mel bin
        let mut weights = vec![vec![0.0f32; n_bins]; k_bins];
        for i in 0..n_bins {
            let i1 = bins[i];
            let mut i2 = bins[i + 1];
            if i1 == i2 {
                i2 += 1;
            }
            let mut i3 = bins[i + 2];
            if i3 <= i2 {
                i3 = i2 + 1;
            }
            let rise = 1.0 / (i2 - i1) as f32;
            for k in i1..i2.min(k_bins) {
                weights[k][i] = rise * (k - i1) as f32;
            }
            let fall = -1.0 / (i3 - i2) as f32;
            for k in i2..i3.min(k_bins) {
                weights[k][i] = 1.0 + fall * (k - i2) as f32;
            }
        }

        Ok(Self { weights, n_bins })
    }

    /// Number of mel bins (columns)
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Number of FFT bins (rows), `win/2 + 1`
    pub fn n_fft_bins(&self) -> usize {
        self.weights.len()
    }

    /// Project one spectral frame through the filterbank
    ///
    /// Computes `frame . M`, yielding an `n_bins`-length mel frame. Frames
    /// shorter than the filterbank contribute only their available bins.
    pub fn project(&self, frame: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.n_bins];
        for (row, &x) in self.weights.iter().zip(frame.iter()) {
            if x == 0.0 {
                continue;
            }
            for (o, &w) in out.iter_mut().zip(row.iter()) {
                *o += x * w;
            }
        }
        out
    }
}
