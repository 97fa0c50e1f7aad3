//! PCM frame validation and conversion.

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Microphone sample rate (Hz).
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Playback sample rate for model speech (Hz).
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Validate one raw PCM frame.
///
/// Frames must be non-empty, hold whole 16-bit samples, and stay under the
/// configured size cap.
pub fn validate_frame(data: &[u8], max_bytes: usize) -> Result<(), String> {
    if data.is_empty() {
        return Err("Audio frame is empty".to_string());
    }

    if data.len() % BYTES_PER_SAMPLE != 0 {
        return Err("Audio frame length must be even for 16-bit samples".to_string());
    }

    if data.len() > max_bytes {
        return Err(format!(
            "Audio frame of {} bytes exceeds the {} byte limit",
            data.len(),
            max_bytes
        ));
    }

    Ok(())
}

/// Decode little-endian 16-bit PCM bytes into samples.
pub fn decode_samples(data: &[u8]) -> Result<Vec<i16>, String> {
    if data.len() % BYTES_PER_SAMPLE != 0 {
        return Err("PCM data length must be even for 16-bit samples".to_string());
    }

    let mut cursor = Cursor::new(data);
    let mut samples = Vec::with_capacity(data.len() / BYTES_PER_SAMPLE);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }
    Ok(samples)
}

/// Convert 16-bit samples to normalized floats in [-1.0, 1.0].
pub fn samples_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Convert normalized floats back to 16-bit samples.
pub fn float_to_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Playback duration of a raw PCM byte buffer in seconds.
pub fn duration_seconds(byte_len: usize, sample_rate: u32) -> f64 {
    (byte_len / BYTES_PER_SAMPLE) as f64 / sample_rate as f64
}

/// Base64 transport encoding for upstream frames.
pub fn encode_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, String> {
    BASE64_STANDARD
        .decode(data)
        .map_err(|e| format!("Invalid base64 audio payload: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_frame() {
        assert!(validate_frame(&[0u8; 320], 4096).is_ok());
        assert!(validate_frame(&[], 4096).is_err());
        assert!(validate_frame(&[0u8; 15], 4096).is_err());
        assert!(validate_frame(&[0u8; 8192], 4096).is_err());
    }

    #[test]
    fn test_decode_samples_little_endian() {
        // 0x0100 = 256, 0xFFFF = -1
        let data = [0x00, 0x01, 0xFF, 0xFF];
        let samples = decode_samples(&data).unwrap();
        assert_eq!(samples, vec![256, -1]);

        assert!(decode_samples(&[0x00]).is_err());
    }

    #[test]
    fn test_float_conversion_round_trip() {
        let samples = vec![0i16, 16384, -16384, 32767, -32768];
        let floats = samples_to_float(&samples);
        let back = float_to_samples(&floats);

        for (original, converted) in samples.iter().zip(back.iter()) {
            assert!((original - converted).abs() <= 1);
        }
    }

    #[test]
    fn test_duration_seconds() {
        // One second of 24kHz mono 16-bit audio is 48,000 bytes.
        assert!((duration_seconds(48_000, OUTPUT_SAMPLE_RATE) - 1.0).abs() < 1e-9);
        // 4096-byte mic frame at 16kHz = 2048 samples = 128ms.
        assert!((duration_seconds(4096, INPUT_SAMPLE_RATE) - 0.128).abs() < 1e-9);
    }

    #[test]
    fn test_base64_round_trip() {
        let data = vec![1u8, 2, 3, 250, 251];
        let encoded = encode_base64(&data);
        assert_eq!(decode_base64(&encoded).unwrap(), data);
        assert!(decode_base64("***").is_err());
    }
}
