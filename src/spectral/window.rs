//! Windowing and pitch utilities

/// Compute an N-point Hann window
///
/// `w[i] = 0.5 * (1 - cos(2*pi*i/N))`
///
/// The spectrogram routine performs a rectangular (unwindowed) transform;
/// callers that want tapered frames multiply their slices by this window
/// before analysis.
pub fn hann_window(n: usize) -> Vec<f32> {
    let mut window = vec![0.0f32; n];
    for (i, w) in window.iter_mut().enumerate() {
        *w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos());
    }
    window
}

/// Convert a note number to a frequency in Hz, with A4 (440 Hz) as note 0
pub fn note_num_to_freq(p: f32) -> f32 {
    440.0 * (2.0f32).powf(p / 12.0)
}
