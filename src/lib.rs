//! # Cadence DSP
//!
//! A beat tracking and tempo estimation engine for streaming and batch
//! audio analysis.
//!
//! ## Features
//!
//! - **Novelty extraction**: spectral-flux and SuperFlux onset-strength curves
//! - **Tempo estimation**: combined autocorrelation / warped-DFT strength curve
//! - **Beat tracking**: dynamic-programming optimal beat sequence
//! - **Online tracking**: bar-pointer Bayes filter driven by live audio chunks
//!
//! ## Quick Start
//!
//! ```no_run
//! use cadence_dsp::{analyze_offline, AnalysisConfig};
//!
//! // Mono samples, normalized to [-1.0, 1.0]
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let result = analyze_offline(&samples, sample_rate, &AnalysisConfig::default())?;
//!
//! println!("Tempo: {:.2} BPM, {} beats", result.tempo.max_bpm, result.beats.len());
//! # Ok::<(), cadence_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Samples -> Spectral Frontend -> Novelty Extractor -> Tempo Estimator -> Beat Tracker
//!                                       |
//!                                       +-> Bar-Pointer Filter (streaming)
//! ```
//!
//! Offline stages are synchronous compute-to-completion functions; the
//! streaming path accepts chunks as they arrive and applies per-frame
//! results strictly in order (see [`online::pipeline`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod features;
pub mod online;
pub mod spectral;
pub mod util;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use config::{AnalysisConfig, NoveltyMethod, OnlineConfig, SuperfluxParams};
pub use error::AnalysisError;
pub use features::tempo::TempoEstimate;
pub use online::{BarPointerFilter, OrderedPipeline, StreamingTracker};

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Novelty variant used ("plain_flux" or "superflux")
    pub novelty_method: String,
}

/// Complete offline analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineAnalysis {
    /// Novelty function, one value per frame transition
    pub novelty: Vec<f32>,

    /// Tempo-strength curve and maximum-likelihood BPM
    pub tempo: TempoEstimate,

    /// Beat locations in novelty-sample indices
    pub beats: Vec<usize>,

    /// Triangular beat activation, one value per novelty sample
    pub ramp: Vec<f32>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Main offline analysis function
///
/// Runs the full batch pipeline: novelty extraction, tempo estimation at
/// the configured hop, and dynamic-programming beat tracking at the
/// maximum-likelihood tempo. A signal whose tempo-strength curve is flat
/// (e.g. silence) yields an empty beat sequence rather than an error.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Errors
///
/// Returns `AnalysisError` if the input is empty, the window configuration
/// does not fit the signal, or a pipeline stage fails.
///
/// # Example
///
/// ```no_run
/// use cadence_dsp::{analyze_offline, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 30];
/// let result = analyze_offline(&samples, 44100, &AnalysisConfig::default())?;
/// # Ok::<(), cadence_dsp::AnalysisError>(())
/// ```
pub fn analyze_offline(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<OfflineAnalysis, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting offline analysis: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }

    let (novelty, method_name) = match config.novelty {
        NoveltyMethod::PlainFlux => {
            let result =
                features::novelty::plain_novelty(samples, config.frame_size, config.hop_size)?;
            (result.novelty, "plain_flux")
        }
        NoveltyMethod::SuperFlux => {
            let result = features::novelty::superflux_novelty(
                samples,
                sample_rate,
                config.frame_size,
                config.hop_size,
                &config.superflux,
            )?;
            (result.novelty, "superflux")
        }
    };

    let tempo = features::tempo::estimate_tempo(
        &novelty,
        config.hop_size,
        sample_rate,
        config.max_possible_bpm,
    )?;

    let beats = if tempo.max_bpm > 0.0 {
        features::beats::track_beats(
            &novelty,
            sample_rate,
            config.hop_size,
            tempo.max_bpm,
            config.alpha,
        )?
    } else {
        log::warn!("flat tempo-strength curve; skipping beat tracking");
        Vec::new()
    };
    let ramp = features::beats::ramp_beats(novelty.len(), &beats);

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "Offline analysis done: {:.2} BPM, {} beats, {:.2} ms",
        tempo.max_bpm,
        beats.len(),
        processing_time_ms
    );

    Ok(OfflineAnalysis {
        novelty,
        tempo,
        beats,
        ramp,
        metadata: AnalysisMetadata {
            duration_seconds: samples.len() as f32 / sample_rate as f32,
            sample_rate,
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            novelty_method: method_name.to_string(),
        },
    })
}
