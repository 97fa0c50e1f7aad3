//! # Audio Module
//!
//! PCM frame plumbing for the live voice bridge.
//!
//! ## Audio Formats:
//! - **Microphone (inbound from browser, outbound to upstream)**: 16kHz,
//!   16-bit, mono, little-endian PCM
//! - **Playback (inbound from upstream, outbound to browser)**: 24kHz,
//!   16-bit, mono, little-endian PCM
//! - Transport encoding on the upstream leg is base64
//!
//! ## Key Components:
//! - **pcm**: frame validation, sample decoding, duration math, base64
//! - **level**: RMS input level estimation for the UI meter

pub mod level;
pub mod pcm;
