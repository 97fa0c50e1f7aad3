//! # Live Voice Module
//!
//! Pure state for the live voice call, kept separate from the WebSocket actor
//! so the turn-taking and playback invariants are testable on their own.
//!
//! ## Key Components:
//! - **state**: the `Connecting -> Listening <-> Speaking -> Closed` call
//!   state machine
//! - **playback**: gapless scheduling of inbound audio chunks on a single
//!   timeline via a monotonically advanced next-start cursor
//! - **transcript**: input/output transcription accumulators, the rolling
//!   line window, and turn-completion flushing into permanent messages

pub mod playback;
pub mod state;
pub mod transcript;

pub use playback::PlaybackScheduler;
pub use state::{CallState, CallStateMachine};
pub use transcript::{TranscriptBuffer, TranscriptLine};
