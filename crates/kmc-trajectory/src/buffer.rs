//! In-memory frame buffering.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::debug;

/// When buffered frames are written out.
///
/// A buffer is drained once it holds more than `max_bytes` or its
/// oldest unwritten frame is older than `max_age`, whichever comes
/// first, and always on flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Size threshold in bytes.
    pub max_bytes: usize,
    /// Wall-clock threshold.
    pub max_age: Duration,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_age: Duration::from_secs(30 * 60),
        }
    }
}

impl BufferPolicy {
    /// Write every frame as soon as it is recorded.
    pub fn unbuffered() -> Self {
        Self {
            max_bytes: 0,
            max_age: Duration::ZERO,
        }
    }
}

/// Text waiting to be written, with the time its first byte arrived.
#[derive(Debug)]
pub(crate) struct FrameBuffer {
    policy: BufferPolicy,
    text: String,
    since: Option<Instant>,
    frames: usize,
}

impl FrameBuffer {
    pub(crate) fn new(policy: BufferPolicy) -> Self {
        Self {
            policy,
            text: String::new(),
            since: None,
            frames: 0,
        }
    }

    pub(crate) fn set_policy(&mut self, policy: BufferPolicy) {
        self.policy = policy;
    }

    /// Append text; `frame` marks the end of a frame.
    pub(crate) fn push(&mut self, text: &str, frame: bool) {
        self.since.get_or_insert_with(Instant::now);
        self.text.push_str(text);
        if frame {
            self.frames += 1;
        }
    }

    pub(crate) fn is_due(&self) -> bool {
        self.text.len() > self.policy.max_bytes
            || self
                .since
                .is_some_and(|t| t.elapsed() >= self.policy.max_age)
    }

    /// Write everything out. On failure the text stays buffered.
    pub(crate) fn drain<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        out.write_all(self.text.as_bytes())?;
        debug!(
            bytes = self.text.len(),
            frames = self.frames,
            "trajectory buffer written"
        );
        self.text.clear();
        self.since = None;
        self.frames = 0;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }
}
