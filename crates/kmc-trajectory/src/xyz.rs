//! XYZ-format trajectory sink.
//!
//! ```text
//! KMCLib XYZ FORMAT VERSION 2013.10.15
//!
//! CELL VECTORS
//! a: 1.0000000000e0 0.0000000000e0 0.0000000000e0
//! b: ...
//! c: ...
//!
//! REPETITIONS 10 10 10
//!
//! PERIODICITY True True True
//!
//! STEP 0
//!           1000
//!     TIME 0.0
//! A 0.0000000000e0 0.0000000000e0 0.0000000000e0 0
//! ...
//! ```
//!
//! One atom line per site: type name, site coordinates, particle id.
//! Bucket configurations have no single type per site and are rejected.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use kmc_engine::{Frame, TrajectorySink};

use crate::buffer::{BufferPolicy, FrameBuffer};
use crate::error::TrajectoryError;
use crate::XYZ_HEADER;

/// Writes XYZ trajectories of single-occupancy configurations.
pub struct XyzTrajectory<W: Write> {
    writer: W,
    buffer: FrameBuffer,
    header_staged: bool,
    last_staged: Option<(u64, u64)>,
    frames_recorded: u64,
}

impl XyzTrajectory<File> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        Ok(Self::new(File::create(path)?))
    }
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

impl<W: Write> XyzTrajectory<W> {
    /// A sink writing to `writer` under the default [`BufferPolicy`].
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: FrameBuffer::new(BufferPolicy::default()),
            header_staged: false,
            last_staged: None,
            frames_recorded: 0,
        }
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

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn stage(&mut self, frame: &Frame<'_>) -> Result<(), TrajectoryError> {
        let config = frame.configuration;
        let Some(types) = config.types() else {
            return Err(TrajectoryError::Unsupported {
                reason: "XYZ output needs single-occupancy sites".into(),
            });
        };

        let mut text = String::new();
        if !self.header_staged {
            let lattice = frame.lattice;
            let [a, b, c] = lattice.unit_cell().cell_vectors();
            let [ra, rb, rc] = lattice.repetitions();
            let [pa, pb, pc] = lattice.periodic();
            let _ = writeln!(text, "{XYZ_HEADER}\n\nCELL VECTORS");
            for (label, v) in [("a", a), ("b", b), ("c", c)] {
                let _ = writeln!(text, "{label}: {:.10e} {:.10e} {:.10e}", v[0], v[1], v[2]);
            }
            let _ = writeln!(text, "\nREPETITIONS {ra} {rb} {rc}\n");
            let _ = writeln!(
                text,
                "PERIODICITY {} {} {}\n",
                py_bool(pa),
                py_bool(pb),
                py_bool(pc)
            );
        }

        let _ = writeln!(text, "STEP {}", frame.step);
        let _ = writeln!(text, "          {}", types.len());
        let _ = writeln!(text, "    TIME {:.10e}", frame.time);
        for (site, &t) in types.iter().enumerate() {
            let [x, y, z] = config.site_coords(site);
            let id = config.id_at(site).map_or(0, |id| id.0);
            let _ = writeln!(
                text,
                "{} {x:.10e} {y:.10e} {z:.10e} {id}",
                frame.types.name(t)
            );
        }

        self.buffer.push(&text, true);
        self.header_staged = true;
        Ok(())
    }
}

impl<W: Write> TrajectorySink for XyzTrajectory<W> {
    fn name(&self) -> &str {
        "xyz-trajectory"
    }

    fn record(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let key = (frame.step, frame.time.to_bits());
        if self.last_staged != Some(key) {
            self.stage(frame)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_engine::LatticeModel;
    use kmc_test_utils::fixtures::chain_walker;

    #[test]
    fn frame_lists_every_site_with_its_id() {
        let model = LatticeModel::from_record(&chain_walker(3, 1.0, 1.0)).unwrap();
        let mut sink = XyzTrajectory::new(Vec::new());
        let frame = Frame {
            time: 0.0,
            step: 0,
            configuration: model.configuration(),
            lattice: model.lattice(),
            types: model.types(),
        };
        sink.record(&frame).unwrap();
        sink.flush().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], XYZ_HEADER);
        assert_eq!(lines[2], "CELL VECTORS");
        assert!(lines[3].starts_with("a: 1.0000000000e0"));
        assert_eq!(lines[7], "REPETITIONS 3 1 1");
        assert_eq!(lines[9], "PERIODICITY True True True");
        assert_eq!(lines[11], "STEP 0");
        assert_eq!(lines[12].trim(), "3");
        assert_eq!(lines[13].trim(), "TIME 0.0000000000e0");
        assert!(lines[14].starts_with("B 0.0000000000e0"));
        assert!(lines[14].ends_with(" 0"));
        assert!(lines[16].starts_with("A 2.0000000000e0"));
        assert!(lines[16].ends_with(" 2"));
        assert_eq!(lines.len(), 17);
    }
}
