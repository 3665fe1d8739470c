//! Online beat tracking modules
//!
//! Streaming counterpart of the offline pipeline:
//! - Bar-pointer Bayes filter over a joint (tempo, phase) state
//! - Per-frame spectral front end and ordered novelty accumulation
//! - Worker-pool pipeline with a single ordered consumer

pub mod filter;
pub mod pipeline;
pub mod stream;

pub use filter::BarPointerFilter;
pub use pipeline::OrderedPipeline;
pub use stream::{FrameAnalyzer, OnlineState, StreamingTracker};
