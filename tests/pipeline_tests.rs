//! Integration tests for the beat tracking and tempo estimation pipeline

use cadence_dsp::online::{OrderedPipeline, StreamingTracker};
use cadence_dsp::spectral::mel::MelFilterbank;
use cadence_dsp::spectral::spectrogram::spectrogram;
use cadence_dsp::{analyze_offline, AnalysisConfig, OnlineConfig};
use proptest::prelude::*;

/// Synthesize a click track: short decaying bursts every `period` samples
fn click_track(sr: u32, bpm: f32, seconds: f32) -> Vec<f32> {
    let n = (sr as f32 * seconds) as usize;
    let period = (60.0 * sr as f32 / bpm) as usize;
    let mut samples = vec![0.0f32; n];
    let mut i = 0;
    while i < n {
        for j in 0..512.min(n - i) {
            let decay = (-(j as f32) / 64.0).exp();
            samples[i + j] = decay * (2.0 * std::f32::consts::PI * 1000.0 * j as f32
                / sr as f32)
                .sin();
        }
        i += period;
    }
    samples
}

#[test]
fn test_sine_spectrogram_peak_bin() {
    // 1-second 440 Hz sine at 44.1 kHz: peak bin ~= round(440*1024/44100) = 10
    let sr = 44100u32;
    let samples: Vec<f32> = (0..sr as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
        .collect();

    let frames = spectrogram(&samples, 1024, 512, false).unwrap();
    assert!(!frames.is_empty());

    for frame in &frames {
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert!(
            (peak as i64 - 10).abs() <= 1,
            "expected peak bin 10 +/- 1, got {}",
            peak
        );
    }
}

#[test]
fn test_offline_pipeline_on_120bpm_clicks() {
    let sr = 44100u32;
    let samples = click_track(sr, 120.0, 8.0);

    let config = AnalysisConfig::default();
    let result = analyze_offline(&samples, sr, &config).unwrap();

    assert!(!result.novelty.is_empty());
    assert!(result.novelty.iter().all(|&v| v >= 0.0));

    assert!(
        (result.tempo.max_bpm - 120.0).abs() < 5.0,
        "tempo should be close to 120 BPM, got {:.2}",
        result.tempo.max_bpm
    );

    // Beat spacing must match the estimated period within one novelty sample
    assert!(result.beats.len() >= 8, "8s at 120 BPM should yield many beats");
    let period = (60.0 * sr as f32 / config.hop_size as f32) / result.tempo.max_bpm;
    for pair in result.beats.windows(2).skip(1) {
        let gap = (pair[1] - pair[0]) as f32;
        assert!(
            (gap - period).abs() <= 1.5,
            "beat gap {} deviates from period {:.2}",
            gap,
            period
        );
    }

    // Ramp peaks on interior beats
    for &b in result.beats.iter().skip(1).take(result.beats.len() - 2) {
        assert!((result.ramp[b] - 1.0).abs() < 1e-6);
    }

    assert_eq!(result.metadata.sample_rate, sr);
    assert!(result.metadata.duration_seconds > 7.9);
    assert_eq!(result.metadata.novelty_method, "superflux");
}

#[test]
fn test_offline_pipeline_plain_flux_variant() {
    let sr = 44100u32;
    let samples = click_track(sr, 120.0, 6.0);

    let config = AnalysisConfig {
        novelty: cadence_dsp::NoveltyMethod::PlainFlux,
        ..AnalysisConfig::default()
    };
    let result = analyze_offline(&samples, sr, &config).unwrap();

    assert!(result.novelty.iter().all(|&v| v >= 0.0));
    assert!(
        (result.tempo.max_bpm - 120.0).abs() < 5.0,
        "plain flux tempo should be close to 120 BPM, got {:.2}",
        result.tempo.max_bpm
    );
    assert_eq!(result.metadata.novelty_method, "plain_flux");
}

#[test]
fn test_analyze_offline_rejects_empty_input() {
    let result = analyze_offline(&[], 44100, &AnalysisConfig::default());
    assert!(result.is_err());

    let result = analyze_offline(&[0.0; 4096], 0, &AnalysisConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_streaming_matches_batch_regardless_of_workers() {
    let signal = click_track(44100, 120.0, 3.0);
    let config = OnlineConfig::default();

    let mut sync = StreamingTracker::new(44100, 1024, 512, 4, &config).unwrap();
    for chunk in signal.chunks(512) {
        sync.push_chunk(chunk);
    }
    let reference = sync.finish();

    for n_workers in [1usize, 4] {
        let mut pipeline =
            OrderedPipeline::new(44100, 1024, 512, 4, &config, n_workers, None).unwrap();
        for chunk in signal.chunks(512) {
            pipeline.push_chunk(chunk).unwrap();
        }
        let state = pipeline.finish().unwrap();

        assert_eq!(
            state.novelty(),
            reference.novelty(),
            "{}-worker pipeline must reproduce the synchronous novelty curve",
            n_workers
        );
        assert_eq!(
            state.phases(),
            reference.phases(),
            "{}-worker pipeline must reproduce the synchronous phase stream",
            n_workers
        );
    }
}

#[test]
fn test_streaming_phase_stays_in_range() {
    let signal = click_track(44100, 130.0, 4.0);
    let mut tracker = StreamingTracker::new(44100, 1024, 512, 4, &OnlineConfig::default())
        .unwrap();
    for chunk in signal.chunks(1024) {
        tracker.push_chunk(chunk);
    }
    let state = tracker.finish();
    assert!(!state.phases().is_empty());
    assert!(state
        .phases()
        .iter()
        .all(|p| p.is_finite() && (0.0..=1.0).contains(p)));
}

#[test]
fn test_offline_analysis_serializes() {
    let samples = click_track(44100, 120.0, 3.0);
    let result = analyze_offline(&samples, 44100, &AnalysisConfig::default()).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: cadence_dsp::OfflineAnalysis = serde_json::from_str(&json).unwrap();
    assert_eq!(back.beats, result.beats);
    assert_eq!(back.tempo.max_bpm, result.tempo.max_bpm);
}

proptest! {
    /// Any valid filterbank layout yields finite, non-negative triangles
    /// with non-empty support
    #[test]
    fn prop_filterbank_is_valid(
        win_exp in 9usize..12,
        sr in 22050u32..48000,
        min_freq in 20.0f32..100.0,
        ratio in 4.0f32..80.0,
        n_bins in 1usize..64,
    ) {
        let win = 1usize << win_exp;
        let max_freq = (min_freq * ratio).min(sr as f32 / 2.0 * 0.9);
        prop_assume!(max_freq > min_freq);
        // Leave room for the degeneracy clamps to stay inside the FFT range
        let top_bin = (max_freq as f64 * win as f64 / sr as f64).round() as usize;
        prop_assume!(top_bin + n_bins + 2 < win / 2);

        let mel = MelFilterbank::new(win, sr, min_freq, max_freq, n_bins).unwrap();

        let ones = vec![1.0f32; mel.n_fft_bins()];
        let column_sums = mel.project(&ones);
        prop_assert_eq!(column_sums.len(), n_bins);
        for (i, &s) in column_sums.iter().enumerate() {
            prop_assert!(s.is_finite(), "mel bin {} produced a non-finite weight sum", i);
            prop_assert!(s > 0.0, "mel bin {} has no support", i);
        }
    }
}
