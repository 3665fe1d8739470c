//! Feature extraction modules
//!
//! The offline analysis stages:
//! - Novelty function extraction (plain flux + SuperFlux)
//! - Tempo estimation (combined autocorrelation / warped DFT)
//! - Beat tracking (dynamic programming)

pub mod beats;
pub mod novelty;
pub mod tempo;

pub use beats::{ramp_beats, track_beats};
pub use novelty::{plain_novelty, superflux_novelty, NoveltyResult};
pub use tempo::{estimate_tempo, k_highest_tempos, TempoEstimate};
