//! Call lifecycle state machine for a live voice session.
//!
//! ## Transitions:
//! - `Connecting -> Listening` when the upstream session opens
//! - `Listening -> Speaking` when inbound model audio is scheduled
//! - `Speaking -> Listening` when the last scheduled chunk finishes playback
//!   (a barge-in interruption also lands here, since it kills all pending
//!   playback)
//! - any state `-> Closed` on explicit end or teardown
//!
//! Everything else is an invalid transition and is rejected.

/// Current phase of a live voice call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Connecting,
    Listening,
    Speaking,
    Closed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Connecting => "connecting",
            CallState::Listening => "listening",
            CallState::Speaking => "speaking",
            CallState::Closed => "closed",
        }
    }
}

/// Validated transitions over [`CallState`].
#[derive(Debug)]
pub struct CallStateMachine {
    state: CallState,
}

impl CallStateMachine {
    pub fn new() -> Self {
        Self {
            state: CallState::Connecting,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Upstream session opened: `Connecting -> Listening`.
    pub fn opened(&mut self) -> Result<(), String> {
        match self.state {
            CallState::Connecting => {
                self.state = CallState::Listening;
                Ok(())
            }
            other => Err(format!("Cannot open call from state '{}'", other.as_str())),
        }
    }

    /// Inbound audio scheduled: `Listening -> Speaking` (staying in Speaking
    /// while further chunks arrive is fine).
    pub fn speaking_started(&mut self) -> Result<(), String> {
        match self.state {
            CallState::Listening | CallState::Speaking => {
                self.state = CallState::Speaking;
                Ok(())
            }
            other => Err(format!(
                "Cannot start speaking from state '{}'",
                other.as_str()
            )),
        }
    }

    /// All scheduled playback finished: `Speaking -> Listening` (a no-op when
    /// already listening, since idle checks can race a fresh chunk).
    pub fn playback_idle(&mut self) -> Result<(), String> {
        match self.state {
            CallState::Speaking => {
                self.state = CallState::Listening;
                Ok(())
            }
            CallState::Listening => Ok(()),
            other => Err(format!(
                "Cannot return to listening from state '{}'",
                other.as_str()
            )),
        }
    }

    /// Explicit end or teardown: any state -> Closed.
    pub fn close(&mut self) {
        self.state = CallState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == CallState::Closed
    }
}

impl Default for CallStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_call_lifecycle() {
        let mut machine = CallStateMachine::new();
        assert_eq!(machine.state(), CallState::Connecting);

        machine.opened().unwrap();
        assert_eq!(machine.state(), CallState::Listening);

        machine.speaking_started().unwrap();
        assert_eq!(machine.state(), CallState::Speaking);

        // More audio while already speaking is fine.
        machine.speaking_started().unwrap();
        assert_eq!(machine.state(), CallState::Speaking);

        machine.playback_idle().unwrap();
        assert_eq!(machine.state(), CallState::Listening);

        machine.close();
        assert!(machine.is_closed());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut machine = CallStateMachine::new();
        // Audio cannot arrive before the session opens.
        assert!(machine.speaking_started().is_err());
        assert!(machine.playback_idle().is_err());

        machine.opened().unwrap();
        assert!(machine.opened().is_err());

        machine.close();
        assert!(machine.opened().is_err());
        assert!(machine.speaking_started().is_err());
    }

    #[test]
    fn test_idle_while_listening_is_noop() {
        let mut machine = CallStateMachine::new();
        machine.opened().unwrap();
        machine.playback_idle().unwrap();
        assert_eq!(machine.state(), CallState::Listening);
    }

    #[test]
    fn test_close_from_any_state() {
        let mut machine = CallStateMachine::new();
        machine.close();
        assert!(machine.is_closed());

        let mut machine = CallStateMachine::new();
        machine.opened().unwrap();
        machine.speaking_started().unwrap();
        machine.close();
        assert!(machine.is_closed());
    }
}
