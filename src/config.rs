//! Configuration parameters for offline and online analysis

/// Novelty extraction variant for the offline pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoveltyMethod {
    /// Half-wave rectified spectral flux on the decibel spectrogram
    PlainFlux,

    /// SuperFlux: mel-projected log spectrogram, flux across a frame gap
    SuperFlux,
}

/// SuperFlux novelty parameters
#[derive(Debug, Clone)]
pub struct SuperfluxParams {
    /// Frame gap between compared spectra (default: 3)
    pub mu: usize,

    /// Offset added before log compression; log10(mel + gamma_log) (default: 1.0)
    pub gamma_log: f32,

    /// Maximum-filter width in mel bins (default: 1)
    ///
    /// Accepted for compatibility with the vibrato-suppression step of
    /// Böck & Widmer (2013) but not applied; this implementation computes
    /// the flux against the unfiltered reference frame.
    pub max_filter_width: usize,

    /// Center frequency of the lowest mel bin in Hz (default: 27.5, A0)
    pub mel_min_freq: f32,

    /// Upper cap on the highest mel bin center in Hz; the effective maximum
    /// is min(mel_max_freq, sr/2) (default: 16000.0)
    pub mel_max_freq: f32,

    /// Number of mel bins (default: 138)
    pub mel_bins: usize,
}

impl Default for SuperfluxParams {
    fn default() -> Self {
        Self {
            mu: 3,
            gamma_log: 1.0,
            max_filter_width: 1,
            mel_min_freq: 27.5,
            mel_max_freq: 16000.0,
            mel_bins: 138,
        }
    }
}

/// Offline analysis configuration
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// STFT window length in samples (default: 1024)
    pub frame_size: usize,

    /// STFT hop length in samples (default: 512)
    pub hop_size: usize,

    /// Novelty variant driving tempo and beat estimation (default: SuperFlux)
    pub novelty: NoveltyMethod,

    /// SuperFlux parameters
    pub superflux: SuperfluxParams,

    /// Highest tempo the estimator will consider, in BPM (default: 400.0)
    pub max_possible_bpm: f32,

    /// Tempo-deviation penalty for the dynamic-programming beat tracker
    /// (default: 100.0)
    pub alpha: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            novelty: NoveltyMethod::SuperFlux,
            superflux: SuperfluxParams::default(),
            max_possible_bpm: 400.0,
            alpha: 100.0,
        }
    }
}

/// Online bar-pointer filter configuration
#[derive(Debug, Clone)]
pub struct OnlineConfig {
    /// Tempo transition sharpness at beat boundaries (default: 80.0)
    ///
    /// Transition probability between beat periods M_i and M_j is
    /// exp(-lam * |M_i/M_j - 1|); larger values make tempo changes rarer.
    pub lam: f32,

    /// Minimum tempo in beats per minute (default: 40.0)
    pub min_bpm: f32,

    /// Maximum tempo in beats per minute (default: 200.0)
    pub max_bpm: f32,

    /// Off-beat measurement weight (default: 0.03)
    ///
    /// Phase cells away from the beat boundary are scaled by this constant
    /// on every observation; the beat cell is scaled by the normalized
    /// novelty instead.
    pub gamma: f32,

    /// Frame gap between compared mel spectra in the streaming front end
    /// (default: 3)
    pub mu: usize,

    /// Offset added before log compression in the streaming front end
    /// (default: 1.0)
    pub gamma_log: f32,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            lam: 80.0,
            min_bpm: 40.0,
            max_bpm: 200.0,
            gamma: 0.03,
            mu: 3,
            gamma_log: 1.0,
        }
    }
}
