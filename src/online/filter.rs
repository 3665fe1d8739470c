//! Online beat tracking via Bayes filtering on a bar-pointer model
//!
//! The state is a joint probability mass function over (tempo level, phase)
//! pairs. Each tempo level is an integer beat period `M` in filter steps; a
//! pointer advances deterministically through the `M` phase cells of its
//! level, and mass leaving the end of a beat is redistributed across levels
//! by a tempo-transition kernel, so the tempo can only change at beat
//! boundaries. Each novelty observation reweights on-beat cells by the
//! normalized novelty and every other cell by a small constant.
//!
//! # Reference
//!
//! Whiteley, N., Cemgil, A. T., & Godsill, S. (2006). Bayesian Modelling of
//! Temporal Structure in Musical Audio. *Proceedings of ISMIR 2006*.

use crate::config::OnlineConfig;
use crate::error::AnalysisError;

const EPSILON: f32 = 1e-12;

/// Initial novelty normalizer; keeps the first quiet observations from
/// saturating the on-beat pseudo-probability
const INITIAL_MAX_NOV: f32 = 150.0;

/// Discrete bar-pointer Bayes filter
///
/// Owns its joint distribution exclusively; every [`filter`](Self::filter)
/// call mutates it in place. The state is never reset after construction.
#[derive(Debug, Clone)]
pub struct BarPointerFilter {
    /// Beat periods in filter steps, ascending, spanning [M2, M1]
    periods: Vec<usize>,

    /// Joint pmf; `pmf[i][k]` is the mass at tempo level `i`, phase cell `k`
    pmf: Vec<Vec<f32>>,

    /// Symmetric tempo transition table over levels
    btrans: Vec<Vec<f32>>,

    /// Off-beat measurement weight
    gamma: f32,

    /// Seconds per filter step
    delta: f64,

    /// Running maximum of observed novelty
    max_nov: f32,

    /// Most recent phase estimate in [0, 1]
    phase: f32,
}

impl BarPointerFilter {
    /// Set up a uniform initial distribution for online beat tracking
    ///
    /// The filter's time resolution is `delta = hop*fac/sr` seconds per
    /// step: `hop` is the STFT hop length and `fac` the number of adjacent
    /// novelty samples aggregated into one observation. Beat periods run
    /// from `floor(60/(delta*max_bpm))` to `floor(60/(delta*min_bpm))`
    /// steps.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `sr`, `hop`, or `fac` is
    /// zero, the BPM range is invalid, or the resolution leaves no whole
    /// filter step inside the fastest beat period.
    pub fn new(
        sr: u32,
        hop: usize,
        fac: usize,
        config: &OnlineConfig,
    ) -> Result<Self, AnalysisError> {
        if sr == 0 || hop == 0 || fac == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "sr={}, hop={}, fac={}; all must be > 0",
                sr, hop, fac
            )));
        }
        if config.min_bpm <= 0.0 || config.min_bpm >= config.max_bpm {
            return Err(AnalysisError::InvalidInput(format!(
                "BPM range [{:.1}, {:.1}] is not valid",
                config.min_bpm, config.max_bpm
            )));
        }

        let delta = hop as f64 * fac as f64 / sr as f64;
        let m1 = (60.0 / (delta * config.min_bpm as f64)).floor() as i64;
        let m2 = (60.0 / (delta * config.max_bpm as f64)).floor() as i64;
        if m2 < 1 {
            return Err(AnalysisError::InvalidInput(format!(
                "step of {:.3}s cannot resolve {:.1} BPM; reduce hop*fac",
                delta, config.max_bpm
            )));
        }
        if m2 > m1 {
            return Err(AnalysisError::InvalidInput(format!(
                "no whole beat period between {:.1} and {:.1} BPM at a step of {:.3}s",
                config.min_bpm, config.max_bpm, delta
            )));
        }

        let periods: Vec<usize> = (m2..=m1).map(|m| m as usize).collect();
        let total_cells: usize = periods.iter().sum();
        let uniform = 1.0 / total_cells as f32;
        let pmf: Vec<Vec<f32>> = periods.iter().map(|&m| vec![uniform; m]).collect();

        let n = periods.len();
        let mut btrans = vec![vec![0.0f32; n]; n];
        for i in 0..n {
            for j in i..n {
                let ratio = periods[i] as f32 / periods[j] as f32;
                let p = (-config.lam * (ratio - 1.0).abs()).exp();
                btrans[i][j] = p;
                btrans[j][i] = p;
            }
        }

        log::debug!(
            "Bar-pointer filter: {} tempo levels ({}..{} steps/beat), {} cells, delta={:.4}s",
            n,
            periods[0],
            periods[n - 1],
            total_cells,
            delta
        );

        Ok(Self {
            periods,
            pmf,
            btrans,
            gamma: config.gamma,
            delta,
            max_nov: INITIAL_MAX_NOV,
            phase: 0.0,
        })
    }

    /// Perform one in-place Bayes update and return the new phase estimate
    ///
    /// The update advances every pointer by one cell, pools each level's
    /// end-of-beat mass through the tempo transition table into every
    /// level's on-beat cell, reweights on-beat cells by `nov/max_nov` and
    /// all others by `gamma`, and renormalizes. The returned phase is the
    /// pmf-weighted mean of a triangular metric that is 1 on the beat cell
    /// and 0 at the half-beat.
    ///
    /// A fully collapsed distribution (total mass below epsilon) leaves the
    /// state untouched and reports phase 0.
    pub fn filter(&mut self, nov: f32) -> f32 {
        if nov > self.max_nov {
            self.max_nov = nov;
        }
        let n = self.periods.len();

        // Step 1: transition; pointer motion plus beat-boundary tempo mixing
        let mut g: Vec<Vec<f32>> = Vec::with_capacity(n);
        for i in 0..n {
            let m = self.periods[i];
            let mut gm = vec![0.0f32; m];
            let mut beat_mass = 0.0f32;
            for j in 0..n {
                beat_mass += self.btrans[i][j] * self.pmf[j][self.periods[j] - 1];
            }
            gm[0] = beat_mass;
            gm[1..].copy_from_slice(&self.pmf[i][..m - 1]);
            g.push(gm);
        }

        // Step 2: measurement
        let p_beat = nov / self.max_nov;
        let mut norm = 0.0f32;
        let mut mean_phase = 0.0f32;
        for gm in &mut g {
            let m = gm.len() as f32;
            for (k, cell) in gm.iter_mut().enumerate().skip(1) {
                *cell *= self.gamma;
                norm += *cell;
                mean_phase += *cell * 2.0 * (0.5 - k as f32 / m).abs();
            }
            gm[0] *= p_beat;
            norm += gm[0];
            mean_phase += gm[0];
        }

        // Step 3: normalize and store
        if norm <= EPSILON {
            log::warn!("bar-pointer update collapsed to zero mass; state unchanged");
            self.phase = 0.0;
            return self.phase;
        }
        self.phase = mean_phase / norm;
        for (fm, gm) in self.pmf.iter_mut().zip(g.iter()) {
            for (f_cell, &g_cell) in fm.iter_mut().zip(gm.iter()) {
                *f_cell = g_cell / norm;
            }
        }
        self.phase
    }

    /// Most recent phase estimate in [0, 1]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Maximum a posteriori tempo in beats per minute
    ///
    /// The tempo level with the largest marginal mass, converted through
    /// the filter's step duration.
    pub fn tempo_bpm(&self) -> f32 {
        let mut best = 0usize;
        let mut best_mass = f32::MIN;
        for (i, fm) in self.pmf.iter().enumerate() {
            let mass: f32 = fm.iter().sum();
            if mass > best_mass {
                best_mass = mass;
                best = i;
            }
        }
        (60.0 / (self.delta * self.periods[best] as f64)) as f32
    }

    /// Beat periods in filter steps, ascending
    pub fn tempo_levels(&self) -> &[usize] {
        &self.periods
    }

    /// Total mass of the joint distribution (1 up to rounding)
    pub fn total_mass(&self) -> f32 {
        self.pmf.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_filter() -> BarPointerFilter {
        // delta = 512*4/44100 ~= 0.0464s -> periods 6..=32 steps
        BarPointerFilter::new(44100, 512, 4, &OnlineConfig::default()).unwrap()
    }

    #[test]
    fn test_uniform_prior_sums_to_one() {
        let filter = make_filter();
        assert!((filter.total_mass() - 1.0).abs() < 1e-4);
        assert_eq!(filter.tempo_levels().first(), Some(&6));
        assert_eq!(filter.tempo_levels().last(), Some(&32));
    }

    #[test]
    fn test_zero_novelty_stream_stays_normalized() {
        let mut filter = make_filter();
        let mut last_phase = 0.0;
        for _ in 0..500 {
            last_phase = filter.filter(0.0);
        }
        assert!((filter.total_mass() - 1.0).abs() < 1e-3);
        assert!(last_phase.is_finite());
        assert!((0.0..=1.0).contains(&last_phase));
        assert!(filter.pmf.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_periodic_impulses_lock_tempo_level() {
        let mut filter = make_filter();
        let period = 12usize;
        for step in 0..20 * period {
            let nov = if step % period == 0 { 150.0 } else { 0.0 };
            filter.filter(nov);
        }
        let delta = 512.0 * 4.0 / 44100.0;
        let expected = 60.0 / (delta * period as f32);
        let got = filter.tempo_bpm();
        // One level of slack either side of the true period
        let lo = 60.0 / (delta * (period + 1) as f32);
        let hi = 60.0 / (delta * (period - 1) as f32);
        assert!(
            got >= lo - 0.1 && got <= hi + 0.1,
            "expected ~{:.1} BPM, got {:.1}",
            expected,
            got
        );
    }

    #[test]
    fn test_phase_peaks_on_beats() {
        let mut filter = make_filter();
        let period = 10usize;
        let mut on_beat = 0.0f32;
        let mut off_beat = 0.0f32;
        for step in 0..30 * period {
            let nov = if step % period == 0 { 150.0 } else { 0.0 };
            let phase = filter.filter(nov);
            if step > 20 * period {
                if step % period == 0 {
                    on_beat = phase;
                } else if step % period == period / 2 {
                    off_beat = phase;
                }
            }
        }
        assert!(
            on_beat > off_beat,
            "phase on the beat ({:.3}) should exceed the half-beat ({:.3})",
            on_beat,
            off_beat
        );
    }

    #[test]
    fn test_invalid_construction() {
        let config = OnlineConfig::default();
        assert!(BarPointerFilter::new(0, 512, 4, &config).is_err());
        assert!(BarPointerFilter::new(44100, 0, 4, &config).is_err());
        assert!(BarPointerFilter::new(44100, 512, 0, &config).is_err());

        let bad_range = OnlineConfig {
            min_bpm: 200.0,
            max_bpm: 40.0,
            ..OnlineConfig::default()
        };
        assert!(BarPointerFilter::new(44100, 512, 4, &bad_range).is_err());

        // Step too coarse to resolve the fastest tempo
        assert!(BarPointerFilter::new(8000, 8000, 4, &config).is_err());
    }

    #[test]
    fn test_transition_table_symmetric() {
        let filter = make_filter();
        let n = filter.periods.len();
        for i in 0..n {
            for j in 0..n {
                assert!((filter.btrans[i][j] - filter.btrans[j][i]).abs() < 1e-9);
            }
            assert!((filter.btrans[i][i] - 1.0).abs() < 1e-6);
        }
    }
}
