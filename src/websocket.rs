//! # Live Voice WebSocket Bridge
//!
//! Bridges a browser microphone session to the upstream realtime voice
//! endpoint. Clients connect to `/ws/live`, start a call bound to an existing
//! chat session, and stream raw PCM; the bridge relays audio upstream and
//! feeds decoded model speech, transcription, and turn events back down.
//!
//! ## WebSocket Protocol:
//! - **Client -> Server (JSON)**: `start_call` (with the chat session to
//!   flush turns into), `end_call`, `pong`
//! - **Client -> Server (binary)**: raw 16kHz mono 16-bit LE PCM microphone
//!   frames
//! - **Server -> Client (JSON)**: `call_state`, `input_level` (UI meter),
//!   `audio` (base64 24kHz PCM with its scheduled start offset),
//!   `input_transcript` / `output_transcript` deltas, `turn_complete`,
//!   `interrupted`, `error`, `ping`
//!
//! ## Turn flow:
//! Transcription deltas accumulate per turn; on the upstream turn-complete
//! signal the accumulated text is flushed into the bound chat session's
//! permanent log and the rolling transcript window. A barge-in interruption
//! flushes all pending playback, resets the playback cursor to zero, and
//! discards the in-flight accumulators.

use crate::audio::{level, pcm};
use crate::chat::engine::ChatEngine;
use crate::chat::message::ChatMessage;
use crate::chat::session::ChatSession;
use crate::config::AppConfig;
use crate::live::state::CallState;
use crate::live::{CallStateMachine, PlaybackScheduler, TranscriptBuffer, TranscriptLine};
use crate::state::AppState;
use crate::upstream::live::{self, LiveEvent, LiveSessionConfig, LiveSessionHandle};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Buffered upstream events before the actor consumes them.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Margin added to playback-idle checks so a chunk's tail is not cut off by
/// timer jitter.
const IDLE_CHECK_MARGIN_SECS: f64 = 0.05;

/// WebSocket message types for the browser leg of the bridge.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveWsMessage {
    /// Start a call bound to an existing chat session
    StartCall {
        /// Chat session whose log receives completed turns
        session_id: String,
    },

    /// End the call from the client side
    EndCall,

    /// Heartbeat response from client
    Pong { timestamp: u64 },

    /// Call lifecycle update
    CallState { state: CallState },

    /// Microphone loudness for the UI meter (0-100)
    InputLevel { level: f32 },

    /// One chunk of model speech with its scheduled playback slot
    Audio {
        /// Base64 24kHz mono 16-bit LE PCM
        data: String,
        /// Start offset on the call clock, seconds
        start: f64,
        /// Chunk duration, seconds
        duration: f64,
    },

    /// Transcription delta of the user's current utterance
    InputTranscript { text: String },

    /// Transcription delta of the model's current utterance
    OutputTranscript { text: String },

    /// A turn finished; its messages were flushed to the session log
    TurnComplete {
        messages: Vec<ChatMessage>,
        lines: Vec<TranscriptLine>,
    },

    /// The user barged in; pending playback was flushed
    Interrupted,

    /// Error notification
    Error { code: String, message: String },

    /// Heartbeat from server
    Ping { timestamp: u64 },
}

/// Delivers the connected upstream session to the actor.
#[derive(Message)]
#[rtype(result = "()")]
struct UpstreamReady {
    handle: LiveSessionHandle,
    events: mpsc::Receiver<LiveEvent>,
}

/// Reports a failed upstream connection attempt.
#[derive(Message)]
#[rtype(result = "()")]
struct UpstreamFailed {
    error: String,
}

/// WebSocket actor for one live voice call.
pub struct LiveVoiceSocket {
    app_state: web::Data<AppState>,

    /// Snapshot of the configuration at connection time
    config: AppConfig,

    /// Chat session completed turns are flushed into
    chat_session: Option<Arc<ChatSession>>,

    /// Upstream session handle once connected
    upstream: Option<LiveSessionHandle>,

    state: CallStateMachine,

    playback: PlaybackScheduler,

    transcript: TranscriptBuffer,

    /// Zero point of the call clock
    started_at: Instant,

    /// Whether this call was counted in the active-call metric
    call_counted: bool,

    last_heartbeat: Instant,
}

impl LiveVoiceSocket {
    pub fn new(app_state: web::Data<AppState>) -> Self {
        let config = app_state.get_config();
        let transcript = TranscriptBuffer::new(config.performance.transcript_window);

        Self {
            app_state,
            config,
            chat_session: None,
            upstream: None,
            state: CallStateMachine::new(),
            playback: PlaybackScheduler::new(),
            transcript,
            started_at: Instant::now(),
            call_counted: false,
            last_heartbeat: Instant::now(),
        }
    }

    /// Seconds since the call began; the time base for playback scheduling.
    fn clock(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    fn send_message(&self, ctx: &mut ws::WebsocketContext<Self>, message: &LiveWsMessage) {
        match serde_json::to_string(message) {
            Ok(json) => ctx.text(json),
            Err(e) => error!("Failed to serialize live message: {}", e),
        }
    }

    fn send_state(&self, ctx: &mut ws::WebsocketContext<Self>) {
        self.send_message(
            ctx,
            &LiveWsMessage::CallState {
                state: self.state.state(),
            },
        );
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        warn!("Live call error {}: {}", code, message);
        self.send_message(
            ctx,
            &LiveWsMessage::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Start the call: resolve the profile and target session, then open the
    /// upstream session off-actor and report back via `UpstreamReady`.
    fn handle_start_call(&mut self, session_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        if self.upstream.is_some() || !matches!(self.state.state(), CallState::Connecting) {
            self.send_error(ctx, "call_already_started", "Call already started");
            return;
        }

        let profile = match self.app_state.profiles.get() {
            Some(profile) => profile,
            None => {
                self.send_error(ctx, "not_onboarded", "Complete onboarding before a live call");
                self.finish_call(ctx);
                return;
            }
        };

        let chat_session = match self.app_state.chat_sessions.get_session(&session_id) {
            Some(session) => session,
            None => {
                self.send_error(
                    ctx,
                    "unknown_session",
                    &format!("Unknown session '{}'", session_id),
                );
                self.finish_call(ctx);
                return;
            }
        };
        self.chat_session = Some(chat_session);

        let session_config = LiveSessionConfig {
            ws_url: self.config.upstream.ws_url.clone(),
            api_key: self.config.upstream.api_key.clone(),
            model: self.config.upstream.live_model.clone(),
            voice: self.config.upstream.voice.clone(),
            system_instruction: ChatEngine::live_instruction(&profile),
        };

        info!(session_id = %session_id, "Starting live call");
        let addr = ctx.address();
        tokio::spawn(async move {
            let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            match live::connect(session_config, events_tx).await {
                Ok(handle) => addr.do_send(UpstreamReady {
                    handle,
                    events: events_rx,
                }),
                Err(error) => addr.do_send(UpstreamFailed { error }),
            }
        });
    }

    /// Relay one microphone frame: validate, meter, and forward upstream.
    fn handle_audio_frame(&mut self, data: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        let handle = match &self.upstream {
            Some(handle) => handle,
            None => {
                // Mic data before the call is up is dropped silently.
                return;
            }
        };

        if self.state.is_closed() {
            return;
        }

        if let Err(e) = pcm::validate_frame(data, self.config.audio.max_frame_bytes) {
            self.send_error(ctx, "invalid_audio", &e);
            return;
        }

        let samples = match pcm::decode_samples(data) {
            Ok(samples) => samples,
            Err(e) => {
                self.send_error(ctx, "invalid_audio", &e);
                return;
            }
        };

        let level = level::input_level(&samples);
        self.send_message(ctx, &LiveWsMessage::InputLevel { level });

        if let Err(e) = handle.send_audio(pcm::encode_base64(data)) {
            warn!("Dropping mic frame, upstream session gone: {}", e);
        }
    }

    /// Schedule one inbound model-speech chunk on the playback timeline and
    /// arm the idle check that returns the call to listening.
    fn handle_inbound_audio(&mut self, bytes: Vec<u8>, ctx: &mut ws::WebsocketContext<Self>) {
        if !matches!(
            self.state.state(),
            CallState::Listening | CallState::Speaking
        ) {
            debug!("Discarding inbound audio in state '{}'", self.state.state().as_str());
            return;
        }

        let now = self.clock();
        let duration = pcm::duration_seconds(bytes.len(), self.config.audio.output_sample_rate);
        let start = self.playback.schedule(duration, now);

        if let Err(e) = self.state.speaking_started() {
            warn!("Playback state error: {}", e);
        }
        self.send_state(ctx);

        self.send_message(
            ctx,
            &LiveWsMessage::Audio {
                data: pcm::encode_base64(&bytes),
                start,
                duration,
            },
        );

        // Check for idleness just past the end of everything scheduled.
        let delay = (self.playback.horizon() - now + IDLE_CHECK_MARGIN_SECS).max(0.0);
        ctx.run_later(Duration::from_secs_f64(delay), |act, ctx| {
            let now = act.clock();
            act.playback.release_finished(now);
            if act.playback.is_idle(now) && act.state.state() == CallState::Speaking {
                if let Err(e) = act.state.playback_idle() {
                    warn!("Idle transition error: {}", e);
                }
                act.send_state(ctx);
            }
        });
    }

    /// Flush the completed turn into the bound chat session.
    fn handle_turn_complete(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let messages = self.transcript.flush_turn();
        if messages.is_empty() {
            return;
        }

        if let Some(session) = &self.chat_session {
            for message in &messages {
                if let Err(e) = session.append(message.clone()) {
                    error!("Failed to flush live turn: {}", e);
                }
            }
        }

        self.app_state.record_turn_completed();
        debug!("Turn complete, {} message(s) flushed", messages.len());

        self.send_message(
            ctx,
            &LiveWsMessage::TurnComplete {
                messages,
                lines: self.transcript.lines(),
            },
        );
    }

    /// Barge-in: flush pending playback, reset the cursor, and drop the
    /// in-flight accumulators. The call returns to listening.
    fn handle_interruption(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let flushed = self.playback.interrupt();
        debug!(
            "Interruption flushed {} pending chunk(s), discarded {}/{} in-flight transcript chars",
            flushed,
            self.transcript.active_input().len(),
            self.transcript.active_output().len()
        );
        self.transcript.discard_active();

        if let Err(e) = self.state.playback_idle() {
            warn!("Interruption state error: {}", e);
        }
        self.send_message(ctx, &LiveWsMessage::Interrupted);
        self.send_state(ctx);
    }

    /// Tear down the call and close the browser socket.
    fn finish_call(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(handle) = self.upstream.take() {
            handle.close();
        }

        self.state.close();
        self.send_state(ctx);
        ctx.close(None);
        ctx.stop();
    }
}

impl Actor for LiveVoiceSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Live voice connection started");

        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(60) {
                warn!("Live voice heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }

            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            act.send_message(ctx, &LiveWsMessage::Ping { timestamp });
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("Live voice connection stopped");

        if let Some(handle) = self.upstream.take() {
            handle.close();
        }

        if self.call_counted {
            self.app_state.decrement_active_calls();
        }
    }
}

impl Handler<UpstreamReady> for LiveVoiceSocket {
    type Result = ();

    fn handle(&mut self, msg: UpstreamReady, ctx: &mut Self::Context) {
        self.upstream = Some(msg.handle);
        self.app_state.increment_active_calls();
        self.call_counted = true;

        // Upstream events (starting with Opened) flow into the mailbox and
        // are serialized with everything else this actor handles.
        ctx.add_stream(ReceiverStream::new(msg.events));
    }
}

impl Handler<UpstreamFailed> for LiveVoiceSocket {
    type Result = ();

    fn handle(&mut self, msg: UpstreamFailed, ctx: &mut Self::Context) {
        error!("Live session failed to open: {}", msg.error);
        self.send_error(ctx, "live_unavailable", &msg.error);
        self.finish_call(ctx);
    }
}

/// Upstream live events, one at a time in arrival order.
impl StreamHandler<LiveEvent> for LiveVoiceSocket {
    fn handle(&mut self, event: LiveEvent, ctx: &mut Self::Context) {
        match event {
            LiveEvent::Opened => {
                match self.state.opened() {
                    Ok(()) => self.send_state(ctx),
                    Err(e) => warn!("Open transition error: {}", e),
                }
            }

            LiveEvent::InputTranscript(text) => {
                self.transcript.push_input(&text);
                self.send_message(ctx, &LiveWsMessage::InputTranscript { text });
            }

            LiveEvent::OutputTranscript(text) => {
                self.transcript.push_output(&text);
                self.send_message(ctx, &LiveWsMessage::OutputTranscript { text });
            }

            LiveEvent::Audio(bytes) => {
                self.handle_inbound_audio(bytes, ctx);
            }

            LiveEvent::TurnComplete => {
                self.handle_turn_complete(ctx);
            }

            LiveEvent::Interrupted => {
                self.handle_interruption(ctx);
            }

            LiveEvent::Closed(reason) => {
                info!("Live session closed: {:?}", reason);
                self.finish_call(ctx);
            }

            LiveEvent::TransportError(e) => {
                error!("Live session transport error: {}", e);
                self.send_error(ctx, "live_transport", &e);
                self.finish_call(ctx);
            }
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        debug!("Upstream event stream ended");
        if !self.state.is_closed() {
            self.finish_call(ctx);
        }
    }
}

/// Browser-side WebSocket messages.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for LiveVoiceSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<LiveWsMessage>(&text) {
                Ok(LiveWsMessage::StartCall { session_id }) => {
                    self.handle_start_call(session_id, ctx);
                }
                Ok(LiveWsMessage::EndCall) => {
                    info!("Live call ended by client");
                    self.finish_call(ctx);
                }
                Ok(LiveWsMessage::Pong { .. }) => {
                    self.last_heartbeat = Instant::now();
                }
                Ok(_) => {
                    warn!("Unexpected live message type from client");
                }
                Err(e) => {
                    self.send_error(ctx, "invalid_json", &format!("Invalid JSON: {}", e));
                }
            },
            Ok(ws::Message::Binary(data)) => {
                self.handle_audio_frame(&data, ctx);
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Live voice socket closed: {:?}", reason);
                if let Some(handle) = self.upstream.take() {
                    handle.close();
                }
                self.state.close();
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                error!("Live voice protocol error: {}", e);
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint handler: upgrades the HTTP request and hands the
/// connection to a fresh [`LiveVoiceSocket`] actor.
pub async fn live_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        "New live voice connection from: {:?}",
        req.connection_info().peer_addr()
    );

    ws::start(LiveVoiceSocket::new(app_state), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_call_parsing() {
        let raw = r#"{"type": "start_call", "session_id": "abc-123"}"#;
        match serde_json::from_str::<LiveWsMessage>(raw).unwrap() {
            LiveWsMessage::StartCall { session_id } => assert_eq!(session_id, "abc-123"),
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_audio_message_serialization() {
        let msg = LiveWsMessage::Audio {
            data: "QUJD".to_string(),
            start: 1.25,
            duration: 0.5,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["data"], "QUJD");
        assert_eq!(json["start"], 1.25);
    }

    #[test]
    fn test_call_state_serialization() {
        let msg = LiveWsMessage::CallState {
            state: CallState::Listening,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "call_state");
        assert_eq!(json["state"], "listening");
    }

    #[test]
    fn test_turn_complete_serialization() {
        let msg = LiveWsMessage::TurnComplete {
            messages: vec![ChatMessage::user("I was going to school")],
            lines: vec![TranscriptLine {
                role: crate::chat::message::MessageRole::User,
                text: "I was going to school".to_string(),
            }],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "turn_complete");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["lines"][0]["text"], "I was going to school");
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<LiveWsMessage>(r#"{"type": "mystery"}"#).is_err());
    }
}
