//! Gapless playback scheduling for inbound model audio.
//!
//! Inbound chunks arrive as fast as the upstream produces them, well ahead of
//! real time. They are serialized onto a single timeline by a monotonically
//! advanced next-start cursor: each chunk starts at `max(cursor, now)` and the
//! cursor advances by the chunk's duration, so consecutive chunks can never
//! overlap. An interruption discards every pending chunk and resets the
//! cursor to zero.
//!
//! Time is a caller-supplied clock in seconds (the call clock), which keeps
//! the scheduler deterministic under test.

/// One chunk placed on the playback timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    /// Start offset on the call clock, seconds
    pub start: f64,

    /// Chunk duration, seconds
    pub duration: f64,
}

impl ScheduledChunk {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Serializes audio chunks onto one gapless timeline.
#[derive(Debug)]
pub struct PlaybackScheduler {
    /// Cumulative end time of everything scheduled so far
    next_start: f64,

    /// Chunks scheduled and not yet known to have finished
    active: Vec<ScheduledChunk>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            next_start: 0.0,
            active: Vec::new(),
        }
    }

    /// Place a chunk on the timeline and return its start offset.
    pub fn schedule(&mut self, duration: f64, now: f64) -> f64 {
        let start = if self.next_start > now {
            self.next_start
        } else {
            now
        };
        self.next_start = start + duration;
        self.active.push(ScheduledChunk { start, duration });
        start
    }

    /// Forget chunks whose playback window has elapsed. Returns how many were
    /// released.
    pub fn release_finished(&mut self, now: f64) -> usize {
        let before = self.active.len();
        self.active.retain(|chunk| chunk.end() > now);
        before - self.active.len()
    }

    /// True when nothing is scheduled to be playing at `now`.
    pub fn is_idle(&self, now: f64) -> bool {
        self.active.iter().all(|chunk| chunk.end() <= now)
    }

    /// End time of the last scheduled chunk.
    pub fn horizon(&self) -> f64 {
        self.next_start
    }

    /// Drop every pending chunk and reset the cursor to zero. Returns how
    /// many chunks were flushed.
    pub fn interrupt(&mut self) -> usize {
        let flushed = self.active.len();
        self.active.clear();
        self.next_start = 0.0;
        flushed
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}
