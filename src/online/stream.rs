//! Streaming spectral front end and ordered novelty accumulation
//!
//! Splits the online path into two halves so the per-frame FFT work can be
//! farmed out while the stateful half stays strictly ordered:
//! - [`FrameAnalyzer`]: stateless per-frame spectral computation, shareable
//!   across worker threads
//! - [`OnlineState`]: ordered application of finished frames; novelty
//!   accumulation and bar-pointer filter updates
//! - [`StreamingTracker`]: the synchronous composition of the two

use crate::config::OnlineConfig;
use crate::error::AnalysisError;
use crate::online::filter::BarPointerFilter;
use crate::spectral::mel::MelFilterbank;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Callback invoked with each new phase estimate
pub type PhaseHook = Box<dyn FnMut(f32) + Send>;

/// Stateless per-frame spectral computation for the streaming path
///
/// Computes the frame's bin powers, total energy, `ln(power + gamma_log)`
/// log compression, and mel projection. Matching the original streaming
/// path, the log is applied *before* the mel projection (the offline
/// SuperFlux variant projects first); the two novelty scales differ and
/// the filter's running normalizer absorbs the difference.
pub struct FrameAnalyzer {
    win: usize,
    swin: usize,
    gamma_log: f32,
    fft: Arc<dyn Fft<f32>>,
    mel: MelFilterbank,
}

impl FrameAnalyzer {
    /// Build the analyzer for one window size
    ///
    /// The mel layout is the streaming default: 138 bins spanning
    /// 27.5 Hz to min(16000, sr/2) Hz.
    pub fn new(sr: u32, win: usize, gamma_log: f32) -> Result<Self, AnalysisError> {
        if win == 0 {
            return Err(AnalysisError::InvalidWindow(
                "win must be > 0".to_string(),
            ));
        }
        let mel = MelFilterbank::new(win, sr, 27.5, 16000.0f32.min(sr as f32 / 2.0), 138)?;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(win);
        Ok(Self {
            win,
            swin: win / 2 + 1,
            gamma_log,
            fft,
            mel,
        })
    }

    /// Analyze one window-length frame
    ///
    /// Frames shorter than the window are zero-padded, longer ones
    /// truncated.
    ///
    /// # Returns
    ///
    /// The log-compressed mel frame and the frame's raw spectral energy
    pub fn analyze(&self, frame: &[f32]) -> (Vec<f32>, f32) {
        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); self.win];
        for (b, &x) in buffer.iter_mut().zip(frame.iter()) {
            *b = Complex::new(x, 0.0);
        }
        self.fft.process(&mut buffer);

        let mut log_power = vec![0.0f32; self.swin];
        let mut energy = 0.0f32;
        for (k, out) in log_power.iter_mut().enumerate() {
            let ek = buffer[k].re * buffer[k].re + buffer[k].im * buffer[k].im;
            energy += ek;
            *out = (ek + self.gamma_log).ln();
        }

        (self.mel.project(&log_power), energy)
    }

    /// Window length in samples
    pub fn win(&self) -> usize {
        self.win
    }
}

/// Ordered application of finished spectral frames
///
/// Owns the novelty buffer, the energy tracker, and the bar-pointer
/// filter. Frames MUST be applied in ascending index order with no gaps;
/// an out-of-order application is an invariant violation and panics.
pub struct OnlineState {
    mu: usize,
    fac: usize,
    frames: Vec<Vec<f32>>,
    novelty: Vec<f32>,
    filter: BarPointerFilter,
    max_energy: f32,
    energy: f32,
    phases: Vec<f32>,
    phase_hook: Option<PhaseHook>,
}

impl OnlineState {
    /// Wrap a filter with novelty accumulation state
    ///
    /// `mu` is the frame gap for the streaming flux and `fac` the number of
    /// novelty samples aggregated into one filter observation.
    pub fn new(filter: BarPointerFilter, mu: usize, fac: usize) -> Result<Self, AnalysisError> {
        if mu == 0 || fac == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "mu={}, fac={}; both must be > 0",
                mu, fac
            )));
        }
        Ok(Self {
            mu,
            fac,
            frames: Vec::new(),
            novelty: Vec::new(),
            filter,
            max_energy: 1.0,
            energy: 0.0,
            phases: Vec::new(),
            phase_hook: None,
        })
    }

    /// Register a callback invoked with every new phase estimate
    pub fn set_phase_hook(&mut self, hook: PhaseHook) {
        self.phase_hook = Some(hook);
    }

    /// Apply one finished frame
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not the next expected frame index; a later
    /// frame's result arriving before an earlier one means the ordering
    /// barrier upstream is broken, which is fatal by contract.
    pub fn apply(&mut self, idx: usize, mel_frame: Vec<f32>, frame_energy: f32) {
        assert_eq!(
            idx,
            self.frames.len(),
            "streaming order violated: frame {} finalized while {} was expected",
            idx,
            self.frames.len()
        );

        if frame_energy > self.max_energy {
            self.max_energy = frame_energy;
        }
        self.energy = frame_energy / self.max_energy;

        self.frames.push(mel_frame);

        // The first mu+1 frames only prime the comparison buffer
        if idx > self.mu {
            let current = &self.frames[idx];
            let reference = &self.frames[idx - self.mu];
            let mut nov = 0.0f32;
            for (&c, &r) in current.iter().zip(reference.iter()) {
                let diff = c - r;
                if diff > 0.0 {
                    nov += diff;
                }
            }
            self.novelty.push(nov);

            if self.novelty.len() > self.fac && self.novelty.len() % self.fac == 0 {
                let agg: f32 = self.novelty[self.novelty.len() - self.fac..].iter().sum();
                let phase = self.filter.filter(agg);
                self.phases.push(phase);
                if let Some(hook) = self.phase_hook.as_mut() {
                    hook(phase);
                }
            }
        }
    }

    /// Accumulated novelty curve
    pub fn novelty(&self) -> &[f32] {
        &self.novelty
    }

    /// Every phase estimate emitted so far
    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    /// Most recent phase estimate in [0, 1]
    pub fn phase(&self) -> f32 {
        self.filter.phase()
    }

    /// Most recent frame energy relative to the running maximum
    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Number of frames applied so far
    pub fn frames_applied(&self) -> usize {
        self.frames.len()
    }

    /// The underlying bar-pointer filter
    pub fn filter(&self) -> &BarPointerFilter {
        &self.filter
    }
}

/// Single-threaded streaming beat tracker
///
/// Buffers pushed sample chunks, slices every complete hop-aligned frame,
/// and analyzes and applies them in arrival order. The multi-threaded
/// equivalent is [`OrderedPipeline`](crate::online::pipeline::OrderedPipeline);
/// both produce identical output for the same input.
pub struct StreamingTracker {
    analyzer: FrameAnalyzer,
    state: OnlineState,
    samples: Vec<f32>,
    hop: usize,
    next_frame: usize,
}

impl StreamingTracker {
    /// Build a tracker for one stream layout
    ///
    /// # Arguments
    ///
    /// * `sr` - Sample rate in Hz
    /// * `win` - FFT window length in samples
    /// * `hop` - Hop length in samples
    /// * `fac` - Novelty samples aggregated into one filter observation
    /// * `config` - Online filter configuration
    pub fn new(
        sr: u32,
        win: usize,
        hop: usize,
        fac: usize,
        config: &OnlineConfig,
    ) -> Result<Self, AnalysisError> {
        if hop == 0 {
            return Err(AnalysisError::InvalidWindow(
                "hop must be > 0".to_string(),
            ));
        }
        let analyzer = FrameAnalyzer::new(sr, win, config.gamma_log)?;
        let filter = BarPointerFilter::new(sr, hop, fac, config)?;
        let state = OnlineState::new(filter, config.mu, fac)?;
        Ok(Self {
            analyzer,
            state,
            samples: Vec::new(),
            hop,
            next_frame: 0,
        })
    }

    /// Register a callback invoked with every new phase estimate
    pub fn set_phase_hook(&mut self, hook: PhaseHook) {
        self.state.set_phase_hook(hook);
    }

    /// Feed one chunk of captured samples
    ///
    /// Every frame completed by this chunk is analyzed and applied before
    /// the call returns.
    pub fn push_chunk(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);
        let win = self.analyzer.win();
        while self.next_frame * self.hop + win <= self.samples.len() {
            let start = self.next_frame * self.hop;
            let (mel, energy) = self.analyzer.analyze(&self.samples[start..start + win]);
            self.state.apply(self.next_frame, mel, energy);
            self.next_frame += 1;
        }
    }

    /// Most recent phase estimate in [0, 1]
    pub fn phase(&self) -> f32 {
        self.state.phase()
    }

    /// Most recent frame energy relative to the running maximum
    pub fn energy(&self) -> f32 {
        self.state.energy()
    }

    /// Accumulated novelty curve
    pub fn novelty(&self) -> &[f32] {
        self.state.novelty()
    }

    /// Stop tracking and hand back the accumulated state
    pub fn finish(self) -> OnlineState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> StreamingTracker {
        StreamingTracker::new(44100, 1024, 512, 4, &OnlineConfig::default()).unwrap()
    }

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
    fn test_frame_slicing_matches_hop_layout() {
        let mut t = tracker();
        // 3 chunks of 512: one complete 1024 window after the second chunk,
        // another after the third
        t.push_chunk(&vec![0.0f32; 512]);
        assert_eq!(t.state.frames_applied(), 0);
        t.push_chunk(&vec![0.0f32; 512]);
        assert_eq!(t.state.frames_applied(), 1);
        t.push_chunk(&vec![0.0f32; 512]);
        assert_eq!(t.state.frames_applied(), 2);
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let signal = click_signal(44100, 22050);

        let mut a = tracker();
        a.push_chunk(&signal);

        let mut b = tracker();
        for chunk in signal.chunks(512) {
            b.push_chunk(chunk);
        }

        let mut c = tracker();
        for chunk in signal.chunks(701) {
            c.push_chunk(chunk);
        }

        assert_eq!(a.novelty(), b.novelty());
        assert_eq!(a.novelty(), c.novelty());
        assert_eq!(a.phase(), b.phase());
        assert_eq!(a.phase(), c.phase());
    }

    #[test]
    fn test_novelty_is_non_negative() {
        let mut t = tracker();
        t.push_chunk(&click_signal(44100 * 2, 11025));
        assert!(!t.novelty().is_empty());
        assert!(t.novelty().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_phase_hook_fires_per_fac_samples() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let mut t = tracker();
        t.set_phase_hook(Box::new(move |_phase| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        t.push_chunk(&click_signal(44100, 11025));

        let state = t.finish();
        assert_eq!(count.load(Ordering::SeqCst), state.phases().len());
        // First update only once more than fac samples have accumulated
        assert!(state.novelty().len() > 4);
        assert!(!state.phases().is_empty());
    }

    #[test]
    fn test_energy_tracker_stays_normalized() {
        let mut t = tracker();
        t.push_chunk(&click_signal(44100, 8192));
        assert!((0.0..=1.0).contains(&t.energy()));
    }

    #[test]
    #[should_panic(expected = "streaming order violated")]
    fn test_out_of_order_apply_is_fatal() {
        let filter = BarPointerFilter::new(44100, 512, 4, &OnlineConfig::default()).unwrap();
        let mut state = OnlineState::new(filter, 3, 4).unwrap();
        state.apply(0, vec![0.0; 138], 0.0);
        // Frame 2 finalizing before frame 1 must abort
        state.apply(2, vec![0.0; 138], 0.0);
    }

    #[test]
    #[should_panic(expected = "streaming order violated")]
    fn test_duplicate_apply_is_fatal() {
        let filter = BarPointerFilter::new(44100, 512, 4, &OnlineConfig::default()).unwrap();
        let mut state = OnlineState::new(filter, 3, 4).unwrap();
        state.apply(0, vec![0.0; 138], 0.0);
        state.apply(0, vec![0.0; 138], 0.0);
    }
}
