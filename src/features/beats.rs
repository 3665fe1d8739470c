//! Dynamic-programming beat tracking
//!
//! Finds the beat sequence maximizing accumulated novelty plus a
//! log-squared penalty on deviation from the target inter-beat period.
//! Every position's best predecessor is searched over offsets in
//! `[-2*period, -period/2]`; the penalty is symmetric in log space around
//! the ideal period ratio of 1, so halving and doubling cost the same.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use crate::error::AnalysisError;

/// Track beats through a novelty function
///
/// # Arguments
///
/// * `novfn` - Novelty function
/// * `sr` - Sample rate in Hz
/// * `hop` - Hop length in samples between novelty samples
/// * `tempo` - Target tempo in beats per minute
/// * `alpha` - Penalty weight for tempo deviation
///
/// # Returns
///
/// Beat locations as strictly increasing novelty-sample indices
///
/// # Errors
///
/// Returns `AnalysisError::EmptyNovelty` for a zero-length curve and
/// `AnalysisError::InvalidInput` for non-positive tempo, negative alpha,
/// zero hop/sample-rate, or a tempo too fast to span a single novelty
/// sample.
pub fn track_beats(
    novfn: &[f32],
    sr: u32,
    hop: usize,
    tempo: f32,
    alpha: f32,
) -> Result<Vec<usize>, AnalysisError> {
    if novfn.is_empty() {
        return Err(AnalysisError::EmptyNovelty(
            "beat tracking needs at least one novelty sample".to_string(),
        ));
    }
    if sr == 0 || hop == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "sr={}, hop={}; both must be > 0",
            sr, hop
        )));
    }
    if tempo <= 0.0 || alpha < 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "tempo={:.2}, alpha={:.2}; tempo must be > 0 and alpha >= 0",
            tempo, alpha
        )));
    }

    let n = novfn.len();
    let period = ((60.0 * sr as f64 / hop as f64) / tempo as f64).floor() as i64;
    if period < 1 {
        return Err(AnalysisError::InvalidInput(format!(
            "tempo {:.1} BPM is below one novelty sample per beat at hop {}",
            tempo, hop
        )));
    }

    log::debug!(
        "DP beat tracking: {} novelty samples, tempo={:.2} BPM, period={} samples, alpha={:.1}",
        n,
        tempo,
        period,
        alpha
    );

    // Predecessor offsets [-2*period, -period/2], both floored
    let i1 = (-2.0 * period as f64).floor() as i64;
    let i2 = (-(period as f64) / 2.0).floor() as i64;
    let n_offsets = (i2 - i1 + 1) as usize;

    let mut txcost = vec![0.0f32; n_offsets];
    for (k, cost) in txcost.iter_mut().enumerate() {
        let ratio = -(i1 + k as i64) as f64 / period as f64;
        *cost = (-(alpha as f64) * ratio.ln().powi(2)) as f32;
    }

    // The novelty itself seeds the cumulative score; positions without a
    // full predecessor window keep it unchanged, and their backlinks stay
    // at 0 so every backtrace ends at the index-0 self-loop
    let mut cscore: Vec<f32> = novfn.to_vec();
    let mut backlink = vec![0usize; n];
    let mut idx_best = 0usize;

    let start = (-i1 + 1) as usize;
    for i in start..n {
        let base = i as i64 + i1;
        let mut best_k = 0usize;
        let mut best_score = txcost[0] + cscore[base as usize];
        for (k, &cost) in txcost.iter().enumerate().skip(1) {
            let cand = cost + cscore[(base + k as i64) as usize];
            if cand > best_score {
                best_score = cand;
                best_k = k;
            }
        }
        cscore[i] = best_score + novfn[i];
        backlink[i] = (base + best_k as i64) as usize;
        if cscore[i] > cscore[idx_best] {
            idx_best = i;
        }
    }

    // Backtrace from the best cumulative score until a self-loop
    let mut beats = vec![idx_best];
    loop {
        let last = *beats.last().unwrap();
        let prev = backlink[last];
        if prev == last {
            break;
        }
        beats.push(prev);
    }
    beats.reverse();

    log::debug!("DP beat tracking: {} beats, best score at {}", beats.len(), idx_best);

    Ok(beats)
}

/// Convert a beat sequence into a triangular activation signal
///
/// The signal peaks at +1 on each beat and descends to -1 at the midpoint
/// between consecutive beats; samples outside the tracked span are 0.
///
/// # Arguments
///
/// * `len` - Output length in novelty samples
/// * `beats` - Beat locations in novelty samples
pub fn ramp_beats(len: usize, beats: &[usize]) -> Vec<f32> {
    let mut ret = vec![0.0f32; len];
    for pair in beats.windows(2) {
        let (i1, i2) = (pair[0], pair[1]);
        if i2 <= i1 || i2 > len {
            continue;
        }
        let span = (i2 - i1) as f32;
        for k in i1..i2.min(len) {
            let dist = (k - i1).min(i2 - k) as f32;
            ret[k] = 1.0 - 4.0 * dist / span;
        }
    }
    ret
}
