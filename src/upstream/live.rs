//! WebSocket client for the upstream live voice endpoint.
//!
//! One task owns the socket: it drains an outbound channel of microphone
//! frames into the sink and maps inbound server messages to typed
//! [`LiveEvent`]s on an mpsc channel the caller consumes. There is no
//! reconnection - a dropped session surfaces as a terminal event and the
//! call ends, matching the no-retry posture of the rest of the system.

use crate::upstream::messages::{
    RealtimeInputMessage, ServerContent, ServerMessage, SetupMessage,
};
use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Capacity of the outbound microphone-frame channel. Frames beyond this are
/// dropped rather than queued, keeping the stream realtime.
const OUTBOUND_CAPACITY: usize = 256;

/// Typed events surfaced from the upstream session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Session is open and streaming can begin
    Opened,

    /// Transcription delta of the user's speech
    InputTranscript(String),

    /// Transcription delta of the model's speech
    OutputTranscript(String),

    /// Decoded 24kHz mono PCM chunk of model speech
    Audio(Vec<u8>),

    /// The current exchange unit finished
    TurnComplete,

    /// The user barged in; pending model audio is stale
    Interrupted,

    /// Session ended (reason, if the peer gave one)
    Closed(Option<String>),

    /// Transport-level failure; the session is unusable
    TransportError(String),
}

/// Connection parameters for one live session.
#[derive(Debug, Clone)]
pub struct LiveSessionConfig {
    pub ws_url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

enum OutboundFrame {
    Audio(String),
    Close,
}

/// Handle for feeding a live session. Dropping the handle closes the session.
pub struct LiveSessionHandle {
    outbound: mpsc::Sender<OutboundFrame>,
}

impl LiveSessionHandle {
    /// Queue one base64-encoded PCM frame for transmission.
    ///
    /// Returns an error only when the session is gone; a momentarily full
    /// queue drops the frame instead of blocking the audio path.
    pub fn send_audio(&self, base64_pcm: String) -> Result<(), String> {
        match self.outbound.try_send(OutboundFrame::Audio(base64_pcm)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Live session outbound queue full, dropping audio frame");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err("Live session is closed".to_string())
            }
        }
    }

    /// Ask the session task to close the socket.
    pub fn close(&self) {
        let _ = self.outbound.try_send(OutboundFrame::Close);
    }
}

/// Open a live session and spawn its socket task.
///
/// The setup message is sent before this returns, so the first events the
/// caller sees are `Opened` followed by server content.
pub async fn connect(
    config: LiveSessionConfig,
    events: mpsc::Sender<LiveEvent>,
) -> Result<LiveSessionHandle, String> {
    let url = format!("{}?key={}", config.ws_url, config.api_key);

    let (ws_stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| format!("Failed to open live session: {}", e))?;

    info!(model = %config.model, "Connected to upstream live endpoint");

    let (mut ws_sink, ws_stream) = ws_stream.split();

    let setup = SetupMessage::new(&config.model, &config.system_instruction, &config.voice);
    let setup_json = serde_json::to_string(&setup)
        .map_err(|e| format!("Failed to serialize setup message: {}", e))?;
    ws_sink
        .send(Message::Text(setup_json))
        .await
        .map_err(|e| format!("Failed to send setup message: {}", e))?;

    if events.send(LiveEvent::Opened).await.is_err() {
        return Err("Live event receiver dropped before session start".to_string());
    }

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    tokio::spawn(run_session(ws_sink, ws_stream, outbound_rx, events));

    Ok(LiveSessionHandle {
        outbound: outbound_tx,
    })
}

async fn run_session<Si, St>(
    mut ws_sink: Si,
    mut ws_stream: St,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    events: mpsc::Sender<LiveEvent>,
) where
    Si: futures_util::Sink<Message> + Unpin,
    Si::Error: std::fmt::Display,
    St: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(OutboundFrame::Audio(base64_pcm)) => {
                    let msg = RealtimeInputMessage::audio(base64_pcm);
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize realtime input: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = ws_sink.send(Message::Text(json)).await {
                        error!("Failed to send audio frame upstream: {}", e);
                        let _ = events.send(LiveEvent::TransportError(e.to_string())).await;
                        break;
                    }
                }
                // Close requested, or the handle was dropped.
                Some(OutboundFrame::Close) | None => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    let _ = events
                        .send(LiveEvent::Closed(Some("closed by client".to_string())))
                        .await;
                    break;
                }
            },

            incoming = ws_stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !handle_raw_message(text.as_bytes(), &events).await {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if !handle_raw_message(&data, &events).await {
                        break;
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string());
                    let _ = events.send(LiveEvent::Closed(reason)).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Live session transport error: {}", e);
                    let _ = events.send(LiveEvent::TransportError(e.to_string())).await;
                    break;
                }
                None => {
                    let _ = events.send(LiveEvent::Closed(None)).await;
                    break;
                }
            }
        }
    }

    debug!("Live session task finished");
}

/// Parse one raw frame and forward its events. Returns false when the event
/// receiver is gone and the session task should stop.
async fn handle_raw_message(raw: &[u8], events: &mpsc::Sender<LiveEvent>) -> bool {
    let message: ServerMessage = match serde_json::from_slice(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse live server message: {}", e);
            return true;
        }
    };

    if message.setup_complete.is_some() {
        debug!("Live session setup complete");
    }

    if let Some(content) = message.server_content {
        for event in events_from_content(content) {
            if events.send(event).await.is_err() {
                return false;
            }
        }
    }

    true
}

/// Map one `serverContent` body to an ordered event list.
///
/// A single message may carry several fields at once; the emission order
/// mirrors how the protocol is consumed: transcription deltas first, then the
/// turn boundary, then audio, then the interruption flag.
fn events_from_content(content: ServerContent) -> Vec<LiveEvent> {
    let mut out = Vec::new();

    if let Some(delta) = content.output_transcription {
        out.push(LiveEvent::OutputTranscript(delta.text));
    }

    if let Some(delta) = content.input_transcription {
        out.push(LiveEvent::InputTranscript(delta.text));
    }

    if content.turn_complete.unwrap_or(false) {
        out.push(LiveEvent::TurnComplete);
    }

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            if let Some(blob) = part.inline_data {
                match BASE64_STANDARD.decode(&blob.data) {
                    Ok(bytes) => out.push(LiveEvent::Audio(bytes)),
                    Err(e) => warn!("Failed to decode inbound audio chunk: {}", e),
                }
            }
        }
    }

    if content.interrupted.unwrap_or(false) {
        out.push(LiveEvent::Interrupted);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::messages::{MediaBlob, ModelTurn, ModelTurnPart, TranscriptionDelta};

    #[test]
    fn test_events_from_combined_content() {
        let content = ServerContent {
            input_transcription: Some(TranscriptionDelta {
                text: "I was ".to_string(),
            }),
            output_transcription: Some(TranscriptionDelta {
                text: "Oh nice, ".to_string(),
            }),
            model_turn: Some(ModelTurn {
                parts: vec![ModelTurnPart {
                    inline_data: Some(MediaBlob {
                        data: BASE64_STANDARD.encode([0u8, 1, 2, 3]),
                        mime_type: "audio/pcm;rate=24000".to_string(),
                    }),
                    text: None,
                }],
            }),
            turn_complete: Some(true),
            interrupted: None,
        };

        let events = events_from_content(content);
        assert_eq!(
            events,
            vec![
                LiveEvent::OutputTranscript("Oh nice, ".to_string()),
                LiveEvent::InputTranscript("I was ".to_string()),
                LiveEvent::TurnComplete,
                LiveEvent::Audio(vec![0, 1, 2, 3]),
            ]
        );
    }

    #[test]
    fn test_interrupted_is_last() {
        let content = ServerContent {
            interrupted: Some(true),
            model_turn: Some(ModelTurn {
                parts: vec![ModelTurnPart {
                    inline_data: Some(MediaBlob {
                        data: BASE64_STANDARD.encode([9u8, 9]),
                        mime_type: "audio/pcm;rate=24000".to_string(),
                    }),
                    text: None,
                }],
            }),
            ..Default::default()
        };

        let events = events_from_content(content);
        assert_eq!(events.last(), Some(&LiveEvent::Interrupted));
    }

    #[test]
    fn test_invalid_base64_chunk_is_skipped() {
        let content = ServerContent {
            model_turn: Some(ModelTurn {
                parts: vec![ModelTurnPart {
                    inline_data: Some(MediaBlob {
                        data: "!!not base64!!".to_string(),
                        mime_type: "audio/pcm;rate=24000".to_string(),
                    }),
                    text: None,
                }],
            }),
            ..Default::default()
        };

        assert!(events_from_content(content).is_empty());
    }

    #[test]
    fn test_empty_content_produces_no_events() {
        assert!(events_from_content(ServerContent::default()).is_empty());
    }
}
