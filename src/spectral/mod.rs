//! Spectral frontend modules
//!
//! Everything between raw samples and feature curves:
//! - Windowing utilities
//! - STFT magnitude/power/decibel spectrograms
//! - Mel filterbank projection
//! - Frame-level spectral descriptors

pub mod descriptors;
pub mod mel;
pub mod spectrogram;
pub mod window;

pub use mel::MelFilterbank;
pub use spectrogram::{spectrogram, spectrogram_power};
pub use window::hann_window;
