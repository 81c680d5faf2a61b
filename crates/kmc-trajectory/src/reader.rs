//! Script-format trajectory reader.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;

use kmc_core::{ConfigurationRecord, Occupancy, Vec3};

use crate::error::TrajectoryError;

/// A script-format trajectory parsed into memory.
///
/// # Examples
///
/// ```
/// use kmc_trajectory::ScriptTrajectoryReader;
///
/// let text = "\
/// ## KMC trajectory
/// version=\"2013.1.0\"
/// creation_time=\"0\"
/// possible_types=[\"A\",\"B\"]
/// sites=[[0.0,0.0,0.0],[1.0,0.0,0.0]]
/// times=[]
/// steps=[]
/// types=[]
/// times.append(0.5)
/// steps.append(3)
/// types.append([\"B\",\"A\"])
/// ";
/// let traj = ScriptTrajectoryReader::parse(text).unwrap();
/// assert_eq!(traj.frame_count(), 1);
/// assert_eq!(traj.steps(), &[3]);
/// assert_eq!(traj.last_types().unwrap()[0].names(), vec!["B"]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptTrajectoryReader {
    version: String,
    creation_time: String,
    possible_types: Vec<String>,
    sites: Vec<Vec3>,
    times: Vec<f64>,
    steps: Vec<u64>,
    types: Vec<Vec<Occupancy>>,
}

#[derive(Default)]
struct Partial {
    version: Option<String>,
    creation_time: Option<String>,
    possible_types: Option<Vec<String>>,
    sites: Option<Vec<Vec3>>,
    lists: usize,
    times: Vec<f64>,
    steps: Vec<u64>,
    types: Vec<Vec<Occupancy>>,
}

fn literal<T: DeserializeOwned>(line: usize, text: &str) -> Result<T, TrajectoryError> {
    serde_json::from_str(text).map_err(|e| TrajectoryError::malformed(line, e.to_string()))
}

fn call<'a>(stmt: &'a str, prefix: &str) -> Option<&'a str> {
    stmt.strip_prefix(prefix)?.strip_suffix(')')
}

impl ScriptTrajectoryReader {
    /// Parse a whole trajectory.
    pub fn parse(text: &str) -> Result<Self, TrajectoryError> {
        let mut p = Partial::default();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let stmt = raw.trim();
            if stmt.is_empty() || stmt.starts_with('#') {
                continue;
            }
            if let Some(v) = call(stmt, "times.append(") {
                p.times.push(literal(line, v)?);
            } else if let Some(v) = call(stmt, "steps.append(") {
                p.steps.push(literal(line, v)?);
            } else if let Some(v) = call(stmt, "types.append(") {
                let frame: Vec<Occupancy> = literal(line, v)?;
                if let Some(sites) = &p.sites {
                    if frame.len() != sites.len() {
                        return Err(TrajectoryError::malformed(
                            line,
                            format!("{} types for {} sites", frame.len(), sites.len()),
                        ));
                    }
                }
                p.types.push(frame);
            } else if let Some((key, value)) = stmt.split_once('=') {
                match key.trim() {
                    "version" => p.version = Some(literal(line, value)?),
                    "creation_time" => p.creation_time = Some(literal(line, value)?),
                    "possible_types" => p.possible_types = Some(literal(line, value)?),
                    "sites" => p.sites = Some(literal(line, value)?),
                    "times" | "steps" | "types" => {
                        let empty: Vec<serde_json::Value> = literal(line, value)?;
                        if !empty.is_empty() {
                            return Err(TrajectoryError::malformed(
                                line,
                                format!("{} must start empty", key.trim()),
                            ));
                        }
                        p.lists += 1;
                    }
                    other => {
                        return Err(TrajectoryError::malformed(
                            line,
                            format!("unknown field {other:?}"),
                        ))
                    }
                }
            } else {
                return Err(TrajectoryError::malformed(line, "unrecognised statement"));
            }
        }
        Self::finish(p)
    }

    fn finish(p: Partial) -> Result<Self, TrajectoryError> {
        let missing = |what: &str| TrajectoryError::malformed(0, format!("missing {what}"));
        let version = p.version.ok_or_else(|| missing("version"))?;
        let creation_time = p.creation_time.ok_or_else(|| missing("creation_time"))?;
        let possible_types = p.possible_types.ok_or_else(|| missing("possible_types"))?;
        let sites = p.sites.ok_or_else(|| missing("sites"))?;
        if p.lists != 3 {
            return Err(missing("times/steps/types declarations"));
        }
        if p.times.len() != p.steps.len() || p.times.len() != p.types.len() {
            return Err(TrajectoryError::malformed(
                0,
                format!(
                    "{} times, {} steps, {} type frames",
                    p.times.len(),
                    p.steps.len(),
                    p.types.len()
                ),
            ));
        }
        Ok(Self {
            version,
            creation_time,
            possible_types,
            sites,
            times: p.times,
            steps: p.steps,
            types: p.types,
        })
    }

    /// Parse from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, TrajectoryError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Parse the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Format version from the header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `creation_time` from the header, as written.
    pub fn creation_time(&self) -> &str {
        &self.creation_time
    }

    /// Declared type names.
    pub fn possible_types(&self) -> &[String] {
        &self.possible_types
    }

    /// Cartesian site coordinates.
    pub fn sites(&self) -> &[Vec3] {
        &self.sites
    }

    /// Frame times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Frame step numbers.
    pub fn steps(&self) -> &[u64] {
        &self.steps
    }

    /// Site contents per frame.
    pub fn types(&self) -> &[Vec<Occupancy>] {
        &self.types
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.types.len()
    }

    /// Site contents of the last frame.
    pub fn last_types(&self) -> Option<&[Occupancy]> {
        self.types.last().map(Vec::as_slice)
    }

    /// The last frame as a configuration to restart from.
    pub fn configuration_record(&self) -> Option<ConfigurationRecord> {
        self.last_types().map(|types| ConfigurationRecord {
            types: types.to_vec(),
            possible_types: self.possible_types.clone(),
        })
    }
}
