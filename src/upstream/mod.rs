//! # Upstream AI Endpoints
//!
//! Clients for the hosted AI API that carries all of the application's
//! intelligence. Nothing model-shaped is implemented here: the completion
//! endpoint and the realtime voice endpoint are treated as black boxes and
//! this module only handles transport, wire shapes, and contract parsing.
//!
//! ## Key Components:
//! - **Completion client**: HTTP JSON requests for structured chat replies
//!   and session reports
//! - **Live client**: bidirectional WebSocket session streaming base64 PCM
//!   out and audio/transcription/control events in
//! - **Messages**: serde types for the live wire protocol

pub mod completion;
pub mod live;
pub mod messages;

pub use completion::{CompletionClient, StructuredReply};
pub use live::{LiveEvent, LiveSessionHandle};

use std::fmt;

/// Failure classes for upstream calls.
///
/// Transport and status failures come from the network layer; contract
/// failures mean the endpoint answered but the payload did not match the
/// agreed response shape.
#[derive(Debug, Clone)]
pub enum UpstreamError {
    /// Connection/request could not be carried out
    Transport(String),

    /// Endpoint answered with a non-success HTTP status
    Status(u16, String),

    /// Response payload did not match the expected contract
    Contract(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Transport(msg) => write!(f, "Upstream transport error: {}", msg),
            UpstreamError::Status(code, msg) => {
                write!(f, "Upstream returned status {}: {}", code, msg)
            }
            UpstreamError::Contract(msg) => write!(f, "Upstream contract error: {}", msg),
        }
    }
}
