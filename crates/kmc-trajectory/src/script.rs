//! Script-format trajectory sink.
//!
//! [`ScriptTrajectory`] streams frames to any `Write` sink in the script
//! format documented at the crate root. The header is staged with the
//! first frame, since it needs the lattice and the type table.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use kmc_core::Vec3;
use kmc_engine::{Frame, TrajectorySink};

use crate::buffer::{BufferPolicy, FrameBuffer};
use crate::error::TrajectoryError;
use crate::SCRIPT_VERSION;

/// Writes script-format trajectories.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use a `File`.
///
/// # Examples
///
/// ```
/// use kmc_trajectory::{BufferPolicy, ScriptTrajectory};
///
/// let sink = ScriptTrajectory::new(Vec::new())
///     .with_creation_time(0)
///     .with_policy(BufferPolicy::unbuffered());
/// assert_eq!(sink.frames_recorded(), 0);
/// ```
pub struct ScriptTrajectory<W: Write> {
    writer: W,
    buffer: FrameBuffer,
    creation_time: Option<u64>,
    header_staged: bool,
    last_staged: Option<(u64, u64)>,
    frames_recorded: u64,
}

impl ScriptTrajectory<File> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> ScriptTrajectory<W> {
    /// A sink writing to `writer` under the default [`BufferPolicy`].
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: FrameBuffer::new(BufferPolicy::default()),
            creation_time: None,
            header_staged: false,
            last_staged: None,
            frames_recorded: 0,
        }
    }

    /// Fix the `creation_time` header field (unix seconds) instead of
    /// reading the clock.
    pub fn with_creation_time(mut self, secs: u64) -> Self {
        self.creation_time = Some(secs);
        self
    }

    /// Replace the buffer policy.
    pub fn with_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer.set_policy(policy);
        self
    }

    /// Frames accepted so far.
    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded
    }

    /// Bytes staged but not yet written.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the sink and return the underlying writer. Staged frames
    /// are lost unless [`TrajectorySink::flush`] ran first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn header(&self, frame: &Frame<'_>) -> io::Result<String> {
        let created = self.creation_time.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs())
        });
        let names: Vec<&str> = frame.types.declared().map(|(_, n)| n).collect();
        let sites: Vec<Vec3> = (0..frame.lattice.site_count())
            .map(|s| frame.lattice.coords(s))
            .collect();

        let mut h = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(h, "# KMC trajectory");
        let _ = writeln!(h, "version=\"{SCRIPT_VERSION}\"");
        let _ = writeln!(h, "creation_time=\"{created}\"");
        let _ = writeln!(h, "possible_types={}", serde_json::to_string(&names)?);
        let _ = writeln!(h, "sites={}", serde_json::to_string(&sites)?);
        h.push_str("times=[]\nsteps=[]\ntypes=[]\n");
        Ok(h)
    }
}

fn frame_lines(frame: &Frame<'_>) -> io::Result<String> {
    let labels = frame.configuration.labels(frame.types);
    Ok(format!(
        "times.append({})\nsteps.append({})\ntypes.append({})\n",
        serde_json::to_string(&frame.time)?,
        frame.step,
        serde_json::to_string(&labels)?,
    ))
}

impl<W: Write> TrajectorySink for ScriptTrajectory<W> {
    fn name(&self) -> &str {
        "script-trajectory"
    }

    /// Stage the frame and write out the buffer when the policy says so.
    /// A retried frame is not staged twice.
    fn record(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let key = (frame.step, frame.time.to_bits());
        if self.last_staged != Some(key) {
            if !self.header_staged {
                let header = self.header(frame)?;
                self.buffer.push(&header, false);
                self.header_staged = true;
            }
            self.buffer.push(&frame_lines(frame)?, true);
            self.last_staged = Some(key);
            self.frames_recorded += 1;
        }
        if self.buffer.is_due() {
            self.buffer.drain(&mut self.writer)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buffer.drain(&mut self.writer)?;
        self.writer.flush()
    }
}
