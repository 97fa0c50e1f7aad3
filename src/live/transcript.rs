//! Rolling transcript state for a live voice call.
//!
//! Transcription arrives as deltas on two streams (the user's speech and the
//! model's speech) that accumulate until the upstream signals a completed
//! turn. On turn completion each non-empty accumulator becomes one permanent
//! [`ChatMessage`] and one line in the rolling display window; the
//! accumulators are cleared. An interruption discards whatever was
//! accumulating without flushing it.

use crate::chat::message::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One display line in the rolling live transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub role: MessageRole,
    pub text: String,
}

/// Accumulators plus the rolling line window for one call.
#[derive(Debug)]
pub struct TranscriptBuffer {
    /// Maximum lines retained in the display window
    window: usize,

    lines: VecDeque<TranscriptLine>,

    /// In-flight transcription of the user's current utterance
    input: String,

    /// In-flight transcription of the model's current utterance
    output: String,
}

impl TranscriptBuffer {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            lines: VecDeque::new(),
            input: String::new(),
            output: String::new(),
        }
    }

    pub fn push_input(&mut self, delta: &str) {
        self.input.push_str(delta);
    }

    pub fn push_output(&mut self, delta: &str) {
        self.output.push_str(delta);
    }

    pub fn active_input(&self) -> &str {
        &self.input
    }

    pub fn active_output(&self) -> &str {
        &self.output
    }

    /// Complete the current turn.
    ///
    /// Flushes each non-empty accumulator into a permanent message (user
    /// first, then model) and the rolling window, then clears both
    /// accumulators. An empty accumulator produces nothing.
    pub fn flush_turn(&mut self) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if !self.input.is_empty() {
            let text = std::mem::take(&mut self.input);
            self.push_line(MessageRole::User, &text);
            messages.push(ChatMessage::user(text));
        }

        if !self.output.is_empty() {
            let text = std::mem::take(&mut self.output);
            self.push_line(MessageRole::Model, &text);
            messages.push(ChatMessage::model(text, None));
        }

        messages
    }

    /// Drop the in-flight accumulators without flushing. Lines already in the
    /// window are kept.
    pub fn discard_active(&mut self) {
        self.input.clear();
        self.output.clear();
    }

    fn push_line(&mut self, role: MessageRole, text: &str) {
        self.lines.push_back(TranscriptLine {
            role,
            text: text.to_string(),
        });
        while self.lines.len() > self.window {
            self.lines.pop_front();
        }
    }

    /// Snapshot of the rolling window, oldest first.
    pub fn lines(&self) -> Vec<TranscriptLine> {
        self.lines.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_matches_accumulated_deltas() {
        let mut buffer = TranscriptBuffer::new(10);
        buffer.push_input("I was ");
        buffer.push_input("going to school");
        buffer.push_output("Oh nice, ");
        buffer.push_output("tell me more!");

        let expected_input = buffer.active_input().to_string();
        let expected_output = buffer.active_output().to_string();

        let messages = buffer.flush_turn();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].text, expected_input);
        assert_eq!(messages[0].text, "I was going to school");
        assert_eq!(messages[1].role, MessageRole::Model);
        assert_eq!(messages[1].text, expected_output);

        // Accumulators are empty immediately after the flush.
        assert!(buffer.active_input().is_empty());
        assert!(buffer.active_output().is_empty());
    }

    #[test]
    fn test_flush_skips_empty_accumulators() {
        let mut buffer = TranscriptBuffer::new(10);
        buffer.push_output("Just me talking.");

        let messages = buffer.flush_turn();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Model);

        // A turn with nothing accumulated flushes to nothing.
        assert!(buffer.flush_turn().is_empty());
    }

    #[test]
    fn test_window_keeps_last_ten_lines() {
        let mut buffer = TranscriptBuffer::new(10);
        for i in 0..7 {
            buffer.push_input(&format!("user {}", i));
            buffer.push_output(&format!("model {}", i));
            buffer.flush_turn();
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 10);
        // 14 lines were produced; the window holds the last 10.
        assert_eq!(lines[0].text, "user 2");
        assert_eq!(lines[9].text, "model 6");
    }

    #[test]
    fn test_discard_drops_accumulators_but_keeps_lines() {
        let mut buffer = TranscriptBuffer::new(10);
        buffer.push_input("first");
        buffer.flush_turn();

        buffer.push_input("half a sent");
        buffer.push_output("half a rep");
        buffer.discard_active();

        assert!(buffer.active_input().is_empty());
        assert!(buffer.active_output().is_empty());
        assert_eq!(buffer.lines().len(), 1);

        // Nothing from the discarded turn ever reaches the log.
        assert!(buffer.flush_turn().is_empty());
    }
}
