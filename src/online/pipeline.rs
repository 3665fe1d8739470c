//! Worker-pool streaming pipeline with an ordered single consumer
//!
//! Each complete frame becomes an independent FFT job on a small worker
//! pool, but results are only applied to the shared tracking state in frame
//! order: a single consumer thread holds out-of-order results in a reorder
//! buffer keyed by frame index and drains it whenever the next expected
//! frame arrives. This preserves the ordering discipline the novelty and
//! filter stages require while letting the per-frame spectral work overlap.
//!
//! No mid-stream cancellation is supported; dropping the producer side
//! simply stops new frames, and everything already submitted drains before
//! [`OrderedPipeline::finish`] returns.

use crate::config::OnlineConfig;
use crate::error::AnalysisError;
use crate::online::filter::BarPointerFilter;
use crate::online::stream::{FrameAnalyzer, OnlineState, PhaseHook};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

struct FrameJob {
    idx: usize,
    samples: Vec<f32>,
}

struct FrameResult {
    idx: usize,
    mel: Vec<f32>,
    energy: f32,
}

/// Concurrent streaming beat tracker
///
/// Producer-side chunk buffering happens on the calling thread; spectral
/// work runs on `n_workers` threads; novelty accumulation and filter
/// updates run on one consumer thread. Output is bit-identical to
/// [`StreamingTracker`](crate::online::stream::StreamingTracker) for the
/// same input.
pub struct OrderedPipeline {
    job_tx: Option<Sender<FrameJob>>,
    workers: Vec<JoinHandle<()>>,
    consumer: Option<JoinHandle<OnlineState>>,
    samples: Vec<f32>,
    win: usize,
    hop: usize,
    next_frame: usize,
}

impl OrderedPipeline {
    /// Build the pipeline and spawn its threads
    ///
    /// # Arguments
    ///
    /// * `sr` - Sample rate in Hz
    /// * `win` - FFT window length in samples
    /// * `hop` - Hop length in samples
    /// * `fac` - Novelty samples aggregated into one filter observation
    /// * `config` - Online filter configuration
    /// * `n_workers` - Spectral worker threads (at least 1)
    /// * `phase_hook` - Optional callback invoked with each phase estimate,
    ///   on the consumer thread
    pub fn new(
        sr: u32,
        win: usize,
        hop: usize,
        fac: usize,
        config: &OnlineConfig,
        n_workers: usize,
        phase_hook: Option<PhaseHook>,
    ) -> Result<Self, AnalysisError> {
        if hop == 0 {
            return Err(AnalysisError::InvalidWindow(
                "hop must be > 0".to_string(),
            ));
        }
        if n_workers == 0 {
            return Err(AnalysisError::InvalidInput(
                "n_workers must be >= 1".to_string(),
            ));
        }

        let analyzer = Arc::new(FrameAnalyzer::new(sr, win, config.gamma_log)?);
        let filter = BarPointerFilter::new(sr, hop, fac, config)?;
        let mut state = OnlineState::new(filter, config.mu, fac)?;
        if let Some(hook) = phase_hook {
            state.set_phase_hook(hook);
        }

        let (job_tx, job_rx) = bounded::<FrameJob>(n_workers * 4);
        let (res_tx, res_rx) = bounded::<FrameResult>(n_workers * 4);

        let mut workers = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let rx: Receiver<FrameJob> = job_rx.clone();
            let tx = res_tx.clone();
            let analyzer = Arc::clone(&analyzer);
            workers.push(std::thread::spawn(move || {
                for job in rx.iter() {
                    let (mel, energy) = analyzer.analyze(&job.samples);
                    if tx
                        .send(FrameResult {
                            idx: job.idx,
                            mel,
                            energy,
                        })
                        .is_err()
                    {
                        // Consumer is gone; nothing left to do
                        return;
                    }
                }
            }));
        }
        // The consumer sees the channel close once every worker has exited
        drop(res_tx);
        drop(job_rx);

        let consumer = std::thread::spawn(move || consume_in_order(res_rx, state));

        log::debug!(
            "Ordered pipeline started: win={}, hop={}, fac={}, {} workers",
            win,
            hop,
            fac,
            n_workers
        );

        Ok(Self {
            job_tx: Some(job_tx),
            workers,
            consumer: Some(consumer),
            samples: Vec::new(),
            win,
            hop,
            next_frame: 0,
        })
    }

    /// Feed one chunk of captured samples
    ///
    /// Slices every frame completed by this chunk and submits it to the
    /// worker pool; blocks only on channel backpressure.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if the pipeline threads
    /// have shut down.
    pub fn push_chunk(&mut self, chunk: &[f32]) -> Result<(), AnalysisError> {
        let tx = self.job_tx.as_ref().ok_or_else(|| {
            AnalysisError::ProcessingError("pipeline already finished".to_string())
        })?;

        self.samples.extend_from_slice(chunk);
        while self.next_frame * self.hop + self.win <= self.samples.len() {
            let start = self.next_frame * self.hop;
            let job = FrameJob {
                idx: self.next_frame,
                samples: self.samples[start..start + self.win].to_vec(),
            };
            tx.send(job).map_err(|_| {
                AnalysisError::ProcessingError("pipeline workers shut down".to_string())
            })?;
            self.next_frame += 1;
        }
        Ok(())
    }

    /// Stop accepting chunks, drain all in-flight frames, and hand back the
    /// accumulated state
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if a pipeline thread
    /// panicked.
    pub fn finish(mut self) -> Result<OnlineState, AnalysisError> {
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            worker.join().map_err(|_| {
                AnalysisError::ProcessingError("spectral worker panicked".to_string())
            })?;
        }
        let consumer = self.consumer.take().ok_or_else(|| {
            AnalysisError::ProcessingError("pipeline already finished".to_string())
        })?;
        consumer.join().map_err(|_| {
            AnalysisError::ProcessingError("ordered consumer panicked".to_string())
        })
    }
}

/// Apply results strictly in frame order, buffering whatever arrives early
fn consume_in_order(res_rx: Receiver<FrameResult>, mut state: OnlineState) -> OnlineState {
    let mut pending: BTreeMap<usize, FrameResult> = BTreeMap::new();
    let mut next = 0usize;

    for result in res_rx.iter() {
        pending.insert(result.idx, result);
        while let Some(result) = pending.remove(&next) {
            state.apply(result.idx, result.mel, result.energy);
            next += 1;
        }
    }

    // Every submitted frame must have been applied; a leftover entry means
    // a frame was lost, which breaks the ordering contract
    assert!(
        pending.is_empty(),
        "streaming order violated: {} frames never finalized (next expected {})",
        pending.len(),
        next
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::online::stream::StreamingTracker;

    fn click_signal(n: usize, period: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; n];
        let mut i = 0;
        while i < n {
            for j in i..(i + 128).min(n) {
                samples[j] = 0.8 * (0.25 * (j - i) as f32).sin();
            }
            i += period;
        }
        samples
    }

    #[test]
    fn test_single_worker_matches_synchronous_tracker() {
        let signal = click_signal(44100, 11025);
        let config = OnlineConfig::default();

        let mut sync = StreamingTracker::new(44100, 1024, 512, 4, &config).unwrap();
        for chunk in signal.chunks(512) {
            sync.push_chunk(chunk);
        }
        let sync_state = sync.finish();

        let mut pipeline =
            OrderedPipeline::new(44100, 1024, 512, 4, &config, 1, None).unwrap();
        for chunk in signal.chunks(512) {
            pipeline.push_chunk(chunk).unwrap();
        }
        let state = pipeline.finish().unwrap();

        assert_eq!(state.novelty(), sync_state.novelty());
        assert_eq!(state.phases(), sync_state.phases());
    }

    #[test]
    fn test_reorder_buffer_applies_in_order() {
        // Results injected out of order must still be applied 0, 1, 2, ...
        let config = OnlineConfig::default();
        let filter = BarPointerFilter::new(44100, 512, 4, &config).unwrap();
        let state = OnlineState::new(filter, 3, 4).unwrap();

        let (tx, rx) = bounded::<FrameResult>(8);
        for idx in [1usize, 0, 3, 2] {
            tx.send(FrameResult {
                idx,
                mel: vec![idx as f32; 138],
                energy: 1.0,
            })
            .unwrap();
        }
        drop(tx);

        let state = consume_in_order(rx, state);
        assert_eq!(state.frames_applied(), 4);
    }

    #[test]
    fn test_finish_without_chunks() {
        let pipeline =
            OrderedPipeline::new(44100, 1024, 512, 4, &OnlineConfig::default(), 2, None)
                .unwrap();
        let state = pipeline.finish().unwrap();
        assert_eq!(state.frames_applied(), 0);
        assert!(state.novelty().is_empty());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = OnlineConfig::default();
        assert!(OrderedPipeline::new(44100, 1024, 512, 4, &config, 0, None).is_err());
    }
}
