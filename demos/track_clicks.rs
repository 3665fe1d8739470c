//! Example: track beats through a synthetic click track
//!
//! Runs the offline pipeline over a generated 120 BPM click track, then
//! replays the same audio chunk-by-chunk through the streaming tracker and
//! reports the phase estimates.

use cadence_dsp::{analyze_offline, AnalysisConfig, OnlineConfig, StreamingTracker};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let sr = 44100u32;
    let bpm = 120.0f32;
    let seconds = 8.0f32;

    // Synthesize the click track
    let period = (60.0 * sr as f32 / bpm) as usize;
    let n = (sr as f32 * seconds) as usize;
    let mut samples = vec![0.0f32; n];
    let mut i = 0;
    while i < n {
        for j in 0..512.min(n - i) {
            let decay = (-(j as f32) / 64.0).exp();
            samples[i + j] =
                decay * (2.0 * std::f32::consts::PI * 1000.0 * j as f32 / sr as f32).sin();
        }
        i += period;
    }

    // Offline analysis
    let config = AnalysisConfig::default();
    let result = analyze_offline(&samples, sr, &config)?;

    println!("Offline analysis:");
    println!("  Tempo: {:.2} BPM", result.tempo.max_bpm);
    println!("  Beats: {}", result.beats.len());
    println!(
        "  First beats (novelty samples): {:?}",
        &result.beats[..result.beats.len().min(8)]
    );
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);

    // Streaming analysis over the same audio
    let mut tracker = StreamingTracker::new(sr, 1024, 512, 4, &OnlineConfig::default())?;
    tracker.set_phase_hook(Box::new(|phase| {
        log::debug!("phase update: {:.3}", phase);
    }));
    for chunk in samples.chunks(512) {
        tracker.push_chunk(chunk);
    }
    let state = tracker.finish();

    println!("Streaming analysis:");
    println!("  Novelty samples: {}", state.novelty().len());
    println!("  Phase updates: {}", state.phases().len());
    println!("  Final phase: {:.3}", state.phase());
    println!("  Tracked tempo: {:.2} BPM", state.filter().tempo_bpm());

    Ok(())
}
