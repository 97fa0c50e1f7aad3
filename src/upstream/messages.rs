//! Wire types for the upstream live voice WebSocket protocol.
//!
//! All messages are JSON. The protocol is asymmetric:
//!
//! Client -> server:
//! - `setup` - opens the session (model, system instruction, voice,
//!   transcription toggles); must be the first message
//! - `realtimeInput` - base64-encoded 16kHz mono PCM microphone frames
//!
//! Server -> client:
//! - `setupComplete` - session is ready
//! - `serverContent` - any combination of input/output transcription deltas,
//!   model-turn inline audio (base64 24kHz PCM), `turnComplete`, and
//!   `interrupted`

use serde::{Deserialize, Serialize};

/// Mime type for outbound microphone PCM frames.
pub const INPUT_PCM_MIME: &str = "audio/pcm;rate=16000";

/// First message on the wire: session configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SetupMessage {
    pub setup: SetupPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPayload {
    pub model: String,
    pub system_instruction: SystemInstruction,
    pub generation_config: LiveGenerationConfig,
    /// Empty objects switch the transcription streams on
    pub input_audio_transcription: serde_json::Value,
    pub output_audio_transcription: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<InstructionPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructionPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl SetupMessage {
    pub fn new(model: &str, system_instruction: &str, voice: &str) -> Self {
        Self {
            setup: SetupPayload {
                model: format!("models/{}", model),
                system_instruction: SystemInstruction {
                    parts: vec![InstructionPart {
                        text: system_instruction.to_string(),
                    }],
                },
                generation_config: LiveGenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: voice.to_string(),
                            },
                        },
                    },
                },
                input_audio_transcription: serde_json::json!({}),
                output_audio_transcription: serde_json::json!({}),
            },
        }
    }
}

/// Streaming microphone input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInputPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputPayload {
    pub media_chunks: Vec<MediaBlob>,
}

impl RealtimeInputMessage {
    pub fn audio(base64_pcm: String) -> Self {
        Self {
            realtime_input: RealtimeInputPayload {
                media_chunks: vec![MediaBlob {
                    data: base64_pcm,
                    mime_type: INPUT_PCM_MIME.to_string(),
                }],
            },
        }
    }
}

/// Base64 payload with a mime type, used in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub data: String,
    pub mime_type: String,
}

/// Envelope for everything the server sends.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

/// Body of a `serverContent` event. Any combination of fields may be present
/// in a single message.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub input_transcription: Option<TranscriptionDelta>,
    pub output_transcription: Option<TranscriptionDelta>,
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionDelta {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<ModelTurnPart>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelTurnPart {
    pub inline_data: Option<MediaBlob>,
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_message_serialization() {
        let msg = SetupMessage::new("live-voice-1", "Be friendly.", "Kore");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["setup"]["model"], "models/live-voice-1");
        assert_eq!(
            json["setup"]["systemInstruction"]["parts"][0]["text"],
            "Be friendly."
        );
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        // Transcription toggles are present-but-empty objects.
        assert!(json["setup"]["inputAudioTranscription"].is_object());
        assert!(json["setup"]["outputAudioTranscription"].is_object());
    }

    #[test]
    fn test_realtime_input_serialization() {
        let msg = RealtimeInputMessage::audio("QUJD".to_string());
        let json = serde_json::to_value(&msg).unwrap();

        let chunk = &json["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["data"], "QUJD");
        assert_eq!(chunk["mimeType"], INPUT_PCM_MIME);
    }

    #[test]
    fn test_server_content_parsing() {
        let raw = r#"{
            "serverContent": {
                "outputTranscription": { "text": "Hello " },
                "modelTurn": {
                    "parts": [ { "inlineData": { "data": "QUJD", "mimeType": "audio/pcm;rate=24000" } } ]
                },
                "turnComplete": true
            }
        }"#;

        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        assert_eq!(content.output_transcription.unwrap().text, "Hello ");
        assert_eq!(content.turn_complete, Some(true));
        assert!(content.interrupted.is_none());

        let audio = content.model_turn.unwrap().parts[0]
            .inline_data
            .clone()
            .unwrap();
        assert_eq!(audio.data, "QUJD");
    }

    #[test]
    fn test_setup_complete_parsing() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }

    #[test]
    fn test_interrupted_parsing() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"interrupted": true}}"#).unwrap();
        assert_eq!(msg.server_content.unwrap().interrupted, Some(true));
    }
}
