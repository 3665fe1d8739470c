//! Frame-level spectral descriptors

/// Compute the spectral centroid of each frame of a magnitude spectrogram
///
/// The centroid is the magnitude-weighted mean bin index; frames with zero
/// total magnitude yield 0.
pub fn spectral_centroid(frames: &[Vec<f32>]) -> Vec<f32> {
    let mut centroid = vec![0.0f32; frames.len()];
    for (i, frame) in frames.iter().enumerate() {
        let mut weight = 0.0f32;
        let mut sum = 0.0f32;
        for (j, &mag) in frame.iter().enumerate() {
            sum += j as f32 * mag;
            weight += mag;
        }
        if weight > 0.0 {
            centroid[i] = sum / weight;
        }
    }
    centroid
}

/// Compute the spectral rolloff of each frame of a magnitude spectrogram
///
/// Rolloff is the bin index below which 85% of the frame's total magnitude
/// accumulates.
pub fn spectral_rolloff(frames: &[Vec<f32>]) -> Vec<f32> {
    let mut rolloff = vec![0.0f32; frames.len()];
    for (i, frame) in frames.iter().enumerate() {
        let total: f32 = frame.iter().sum();
        let mut mag = 0.0f32;
        for (j, &m) in frame.iter().enumerate() {
            let next = mag + m;
            if mag < 0.85 * total && next >= 0.85 * total {
                rolloff[i] = j as f32;
                break;
            }
            mag = next;
        }
    }
    rolloff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_single_bin() {
        let frames = vec![vec![0.0, 0.0, 1.0, 0.0]];
        let c = spectral_centroid(&frames);
        assert!((c[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_silent_frame() {
        let frames = vec![vec![0.0f32; 8]];
        assert_eq!(spectral_centroid(&frames)[0], 0.0);
    }

    #[test]
    fn test_rolloff_concentrated_energy() {
        let mut frame = vec![0.0f32; 16];
        frame[3] = 1.0;
        let r = spectral_rolloff(&[frame]);
        assert_eq!(r[0], 3.0);
    }
}
