//! Input level metering for the live-mode UI.

/// Estimate the loudness of one microphone frame on a 0-100 display scale.
///
/// Root-mean-square over the normalized samples, scaled by 500 and clamped.
/// The scale factor is an approximate sensitivity chosen for the meter, not a
/// calibrated dBFS mapping.
pub fn input_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / 32768.0;
            normalized * normalized
        })
        .sum();
    let rms = (sum / samples.len() as f64).sqrt();

    (rms * 500.0).min(100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        assert_eq!(input_level(&[]), 0.0);
        assert_eq!(input_level(&[0i16; 1024]), 0.0);
    }

    #[test]
    fn test_full_scale_clamps_to_100() {
        let loud = vec![i16::MAX; 1024];
        assert_eq!(input_level(&loud), 100.0);
    }

    #[test]
    fn test_quiet_signal_is_proportional() {
        // Constant amplitude 328 (~0.01 full scale): rms = 0.01, level = 5.
        let quiet = vec![328i16; 1024];
        let level = input_level(&quiet);
        assert!(level > 4.0 && level < 6.0, "level was {}", level);

        // Louder signal meters higher.
        let louder = vec![3277i16; 1024];
        assert!(input_level(&louder) > level);
    }
}
