//! Combined autocorrelation / warped-DFT tempo estimation
//!
//! The tempo-strength curve is the product of the novelty function's
//! autocorrelation and its magnitude spectrum resampled ("warped") so that
//! spectral bin `T` coincides with time-domain lag `T`. Periodicity shows up
//! in both representations at the true beat period but their spurious peaks
//! (lag multiples for the ACF, frequency harmonics for the DFT) disagree, so
//! the product suppresses octave errors.
//!
//! # Reference
//!
//! Peeters, G. (2007). Template-Based Estimation of Time-Varying Tempo.
//! *EURASIP Journal on Advances in Signal Processing*, section 3.1.1.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

const EPSILON: f32 = 1e-10;

/// Tempo-strength curve with parallel BPM axis
///
/// `strength` and `bpm` are indexed identically; both are reversed from
/// ascending-lag order before return, which is part of the public contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Product of autocorrelation and warped DFT per lag, zero outside the
    /// plausible BPM range
    pub strength: Vec<f32>,

    /// BPM implied by each lag (`sr*60/(lag*hop)`)
    pub bpm: Vec<f32>,

    /// Maximum-likelihood tempo in beats per minute
    pub max_bpm: f32,
}

/// Fast autocorrelation via the Wiener-Khinchin theorem
///
/// Zero-pads the input to the next power of two at least twice its length
/// (making the circular correlation linear), computes `IFFT(|FFT(x)|^2)`,
/// and returns the first `x.len()` real samples.
pub fn autocorrelation_fft(x: &[f32]) -> Vec<f32> {
    if x.is_empty() {
        return Vec::new();
    }
    let fft_size = (2 * x.len()).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    for v in &mut buffer {
        *v = Complex::new(v.re * v.re + v.im * v.im, 0.0);
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..x.len()].iter().map(|v| v.re * scale).collect()
}

/// Magnitude spectrum resampled onto the autocorrelation's lag axis
///
/// Bin `T` (for `T >= 2`) is the linear interpolation of the magnitude
/// spectrum between bins `floor(N/T)` and `ceil(N/T)`; bins 0 and 1 carry
/// no defined tempo and stay zero.
pub fn warped_dft(x: &[f32]) -> Vec<f32> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let mags: Vec<f32> = buffer.iter().map(|v| v.norm()).collect();

    let mut warped = vec![0.0f32; n];
    for (t, out) in warped.iter_mut().enumerate().skip(2) {
        let f_t = n as f32 / t as f32;
        let i1 = f_t.floor() as usize;
        let i2 = f_t.ceil() as usize;
        let frac = f_t - i1 as f32;
        *out = frac * mags[i2] + (1.0 - frac) * mags[i1];
    }
    warped
}

/// Estimate the tempo-strength curve of a novelty function
///
/// Normalizes the curve by its maximum, zero-pads to a power of two,
/// autocorrelates, warps the mean-subtracted curve's DFT onto the lag axis,
/// and multiplies the two. Lags implying a tempo at or above
/// `max_possible_bpm` are zeroed, as is lag 0 (undefined tempo).
///
/// # Arguments
///
/// * `novfn` - Novelty function
/// * `hop` - Hop length in samples between novelty samples
/// * `sr` - Sample rate in Hz
/// * `max_possible_bpm` - Upper tempo bound in BPM (the original default is 400)
///
/// # Returns
///
/// `TempoEstimate` with both arrays reversed from ascending-lag order
///
/// # Errors
///
/// Returns `AnalysisError::EmptyNovelty` for a zero-length curve and
/// `AnalysisError::InvalidInput` for a zero hop/sample-rate or a
/// non-positive BPM bound.
pub fn estimate_tempo(
    novfn: &[f32],
    hop: usize,
    sr: u32,
    max_possible_bpm: f32,
) -> Result<TempoEstimate, AnalysisError> {
    if novfn.is_empty() {
        return Err(AnalysisError::EmptyNovelty(
            "tempo estimation needs at least one novelty sample".to_string(),
        ));
    }
    if hop == 0 || sr == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "hop={}, sr={}; both must be > 0",
            hop, sr
        )));
    }
    if max_possible_bpm <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "max_possible_bpm must be > 0, got {:.1}",
            max_possible_bpm
        )));
    }

    // Normalize by the max to prevent overflow; an all-zero curve is left
    // as-is rather than dividing by zero
    let max_nov = novfn.iter().copied().fold(0.0f32, f32::max);
    let inv = if max_nov > EPSILON { 1.0 / max_nov } else { 0.0 };

    let n = novfn.len().next_power_of_two();
    let mut y = vec![0.0f32; n];
    let mut mean = 0.0f32;
    for (out, &v) in y.iter_mut().zip(novfn.iter()) {
        *out = v * inv;
        mean += *out;
    }
    mean /= novfn.len() as f32;

    let acf = autocorrelation_fft(&y);

    // The DFT sees the mean-subtracted curve; the zero padding stays zero
    for v in y.iter_mut().take(novfn.len()) {
        *v -= mean;
    }
    let warped = warped_dft(&y);

    let mut strength = vec![0.0f32; n];
    let mut bpm = vec![0.0f32; n];
    let mut max_idx = 0usize;
    for i in 1..n {
        bpm[i] = sr as f32 * 60.0 / (i as f32 * hop as f32);
        if bpm[i] < max_possible_bpm {
            strength[i] = acf[i] * warped[i];
            if strength[i] > strength[max_idx] {
                max_idx = i;
            }
        }
    }
    let max_bpm = bpm[max_idx];

    log::debug!(
        "Tempo estimate: {} novelty samples, N={}, max {:.2} BPM at lag {}",
        novfn.len(),
        n,
        max_bpm,
        max_idx
    );

    strength.reverse();
    bpm.reverse();

    Ok(TempoEstimate {
        strength,
        bpm,
        max_bpm,
    })
}

/// Return the K highest-strength tempos
///
/// Stable descending sort on strength; ties keep first-seen order. `k` is
/// clamped to the curve length.
pub fn k_highest_tempos(bpm: &[f32], strength: &[f32], k: usize) -> Vec<f32> {
    let len = bpm.len().min(strength.len());
    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by(|&a, &b| {
        strength[b]
            .partial_cmp(&strength[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.iter().take(k).map(|&i| bpm[i]).collect()
}
