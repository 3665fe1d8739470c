//! Novelty function extraction
//!
//! Turns a signal into a scalar curve estimating how much the spectrum
//! changes from frame to frame, the onset proxy every tempo and beat stage
//! downstream consumes. Two variants:
//! - Plain flux: half-wave rectified bin-wise increase on the decibel
//!   spectrogram, adjacent frames
//! - SuperFlux: mel-projected log spectrogram compared across a frame gap
//!
//! # Reference
//!
//! Böck, S., & Widmer, G. (2013). Maximum Filter Vibrato Suppression for
//! Onset Detection. *Proceedings of DAFx 2013*.

use crate::config::SuperfluxParams;
use crate::error::AnalysisError;
use crate::spectral::mel::MelFilterbank;
use crate::spectral::spectrogram::spectrogram;

/// A novelty curve together with the spectrogram it was derived from
#[derive(Debug, Clone)]
pub struct NoveltyResult {
    /// Source frames; decibel bins for plain flux, log-compressed mel bins
    /// for SuperFlux
    pub frames: Vec<Vec<f32>>,

    /// Non-negative novelty curve, one value per frame transition
    pub novelty: Vec<f32>,
}

/// Compute the plain spectral-flux novelty function of a set of samples
///
/// Uses the decibel spectrogram and sums only the positive bin-wise
/// differences between adjacent frames (half-wave rectification), so the
/// curve responds to energy appearing, not decaying.
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `win` - Window length in samples
/// * `hop` - Hop length in samples
///
/// # Returns
///
/// The decibel spectrogram and a novelty curve of length `frames - 1`
///
/// # Errors
///
/// Propagates `AnalysisError::InvalidWindow` from the spectrogram stage.
pub fn plain_novelty(
    samples: &[f32],
    win: usize,
    hop: usize,
) -> Result<NoveltyResult, AnalysisError> {
    let frames = spectrogram(samples, win, hop, true)?;
    let novelty = rectified_flux(&frames, 1);

    log::debug!(
        "Plain novelty: {} frames -> {} novelty samples",
        frames.len(),
        novelty.len()
    );

    Ok(NoveltyResult { frames, novelty })
}

/// Compute the SuperFlux novelty function of a set of samples
///
/// The magnitude spectrogram is projected through a triangular mel
/// filterbank spanning `[mel_min_freq, min(mel_max_freq, sr/2)]` Hz,
/// log-compressed as `log10(mel + gamma_log)`, and differenced across a
/// gap of `mu` frames.
///
/// `max_filter_width` is accepted but not applied: the reference frame is
/// not max-filtered, a simplification relative to the cited algorithm.
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `sr` - Sample rate in Hz
/// * `win` - Window length in samples
/// * `hop` - Hop length in samples
/// * `params` - SuperFlux parameters (gap, log offset, mel layout)
///
/// # Returns
///
/// The log-compressed mel spectrogram and a novelty curve of length
/// `frames - mu`
///
/// # Errors
///
/// Propagates spectrogram and filterbank construction errors.
pub fn superflux_novelty(
    samples: &[f32],
    sr: u32,
    win: usize,
    hop: usize,
    params: &SuperfluxParams,
) -> Result<NoveltyResult, AnalysisError> {
    if params.mu == 0 {
        return Err(AnalysisError::InvalidInput(
            "SuperFlux frame gap mu must be > 0".to_string(),
        ));
    }

    let magnitude = spectrogram(samples, win, hop, false)?;
    let max_freq = params.mel_max_freq.min(sr as f32 / 2.0);
    let mel = MelFilterbank::new(win, sr, params.mel_min_freq, max_freq, params.mel_bins)?;

    let frames: Vec<Vec<f32>> = magnitude
        .iter()
        .map(|frame| {
            mel.project(frame)
                .into_iter()
                .map(|x| (x + params.gamma_log).log10())
                .collect()
        })
        .collect();

    let novelty = rectified_flux(&frames, params.mu);

    log::debug!(
        "SuperFlux novelty: {} mel frames ({} bins), mu={} -> {} novelty samples",
        frames.len(),
        mel.n_bins(),
        params.mu,
        novelty.len()
    );

    Ok(NoveltyResult { frames, novelty })
}

/// Half-wave rectified flux across a `lag`-frame gap
///
/// `nov[i] = sum_k max(0, frames[i+lag][k] - frames[i][k])`, one value per
/// comparable frame pair. Empty when fewer than `lag + 1` frames exist.
fn rectified_flux(frames: &[Vec<f32>], lag: usize) -> Vec<f32> {
    if frames.len() <= lag {
        return Vec::new();
    }
    let mut novelty = vec![0.0f32; frames.len() - lag];
    for (i, out) in novelty.iter_mut().enumerate() {
        for (&next, &prev) in frames[i + lag].iter().zip(frames[i].iter()) {
            let diff = next - prev;
            if diff > 0.0 {
                *out += diff;
            }
        }
    }
    novelty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(period: usize, n: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; n];
        let mut i = 0;
        while i < n {
            // Short burst rather than a single sample so energy lands in a frame
            for j in i..(i + 64).min(n) {
                samples[j] = (0.3 * (j - i) as f32).sin();
            }
            i += period;
        }
        samples
    }

    #[test]
    fn test_plain_novelty_length_and_sign() {
        let samples = click_track(2000, 16000);
        let result = plain_novelty(&samples, 512, 256).unwrap();
        assert_eq!(result.novelty.len(), result.frames.len() - 1);
        assert!(result.novelty.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_superflux_novelty_length_and_sign() {
        let samples = click_track(2000, 16000);
        let params = SuperfluxParams::default();
        let result = superflux_novelty(&samples, 8000, 512, 256, &params).unwrap();
        assert_eq!(result.novelty.len(), result.frames.len() - params.mu);
        assert!(result.novelty.iter().all(|&v| v >= 0.0));
        assert_eq!(result.frames[0].len(), params.mel_bins);
    }

    #[test]
    fn test_novelty_responds_to_onsets() {
        // Silence then a tone: the transition frame must dominate
        let mut samples = vec![0.0f32; 8192];
        for (i, s) in samples.iter_mut().enumerate().skip(4096) {
            *s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin();
        }
        let result = plain_novelty(&samples, 512, 256).unwrap();
        let peak = result
            .novelty
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // Onset lives at sample 4096 -> frame 16 at hop 256
        assert!(
            (peak as i64 - 15).abs() <= 2,
            "novelty peak should sit at the onset frame, got {}",
            peak
        );
    }

    #[test]
    fn test_rectified_flux_short_input() {
        let frames = vec![vec![0.0f32; 4]; 2];
        assert!(rectified_flux(&frames, 3).is_empty());
    }

    #[test]
    fn test_superflux_rejects_zero_mu() {
        let samples = vec![0.0f32; 4096];
        let params = SuperfluxParams {
            mu: 0,
            ..SuperfluxParams::default()
        };
        assert!(superflux_novelty(&samples, 8000, 512, 256, &params).is_err());
    }
}
