//! STFT spectrogram computation
//!
//! Slices the signal into `floor(1 + (len - win)/hop)` frames, transforms
//! each frame with a real-input FFT, and keeps the first `win/2 + 1` bins
//! as amplitude or decibel values.
//!
//! Frames are analyzed rectangularly: no window function is applied inside
//! this routine. Callers that want a tapered analysis apply
//! [`hann_window`](crate::spectral::window::hann_window) themselves.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Power floor before dB conversion, keeps silent bins finite
const POWER_FLOOR: f32 = 1e-10;

/// Compute the spectrogram of a set of audio samples
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `win` - Window length in samples
/// * `hop` - Hop length in samples
/// * `use_db` - Decibel output (`10*log10(power)`) instead of amplitude (`sqrt(power)`)
///
/// # Returns
///
/// One `win/2 + 1`-length vector per frame, `floor(1 + (len - win)/hop)` frames
///
/// # Errors
///
/// Returns `AnalysisError::InvalidWindow` if `win == 0`, `hop == 0`, or the
/// window is longer than the signal.
pub fn spectrogram(
    samples: &[f32],
    win: usize,
    hop: usize,
    use_db: bool,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    if win == 0 || hop == 0 {
        return Err(AnalysisError::InvalidWindow(format!(
            "win={}, hop={}; both must be > 0",
            win, hop
        )));
    }
    if win > samples.len() {
        return Err(AnalysisError::InvalidWindow(format!(
            "window {} exceeds signal length {}",
            win,
            samples.len()
        )));
    }

    let swin = win / 2 + 1;
    let n_frames = 1 + (samples.len() - win) / hop;

    log::debug!(
        "Computing spectrogram: {} samples, win={}, hop={}, {} frames, use_db={}",
        samples.len(),
        win,
        hop,
        n_frames,
        use_db
    );

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(win);
    let mut frames = Vec::with_capacity(n_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0f32); win];

    for i in 0..n_frames {
        let slice = &samples[i * hop..i * hop + win];
        for (b, &x) in buffer.iter_mut().zip(slice.iter()) {
            *b = Complex::new(x, 0.0);
        }
        fft.process(&mut buffer);

        let mut frame = vec![0.0f32; swin];
        for (k, out) in frame.iter_mut().enumerate() {
            let power = buffer[k].re * buffer[k].re + buffer[k].im * buffer[k].im;
            *out = if use_db {
                10.0 * power.max(POWER_FLOOR).log10()
            } else {
                power.sqrt()
            };
        }
        frames.push(frame);
    }

    Ok(frames)
}

/// Compute the power in each frame of a magnitude spectrogram
///
/// Sums the square of every bin, appealing to Parseval's theorem.
pub fn spectrogram_power(frames: &[Vec<f32>]) -> Vec<f32> {
    frames
        .iter()
        .map(|frame| frame.iter().map(|&x| x * x).sum())
        .collect()
}
