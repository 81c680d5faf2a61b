//! Structured input records.
//!
//! These are produced by whatever surface layer the host uses (a JSON
//! file, a scripting front end, a test fixture) and consumed once at
//! setup. They are plain data: validation happens when the consuming
//! crate turns a record into an engine object.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::Vec3;

/// Unit cell: three cell vectors (rows) and K basis points in
/// fractional coordinates, each component in `[0, 1)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitCellRecord {
    /// Cell vectors `a`, `b`, `c` in cartesian units.
    pub cell_vectors: [Vec3; 3],
    /// Basis points in fractional coordinates.
    pub basis_points: Vec<Vec3>,
}

/// A periodic crystalline grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeRecord {
    /// The repeated cell.
    pub unit_cell: UnitCellRecord,
    /// Repetitions along `a`, `b`, `c`. Each must be positive.
    pub repetitions: [u32; 3],
    /// Periodicity flags along `a`, `b`, `c`.
    pub periodic: [bool; 3],
}

/// Content of one site, or one pattern position.
///
/// A single name in single-occupancy mode; a list of names, read as a
/// multiset, in bucket mode. `["A", "A", "B"]` is two A and one B.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Occupancy {
    /// Exactly one particle of the named type.
    One(String),
    /// A multiset of particles.
    Many(Vec<String>),
}

impl Occupancy {
    /// The names in this occupancy, with multiplicity.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(n) => vec![n.as_str()],
            Self::Many(ns) => ns.iter().map(String::as_str).collect(),
        }
    }

    /// Whether this is the multiset form.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

impl From<&str> for Occupancy {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

/// The initial configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Content of every site, in site-index order.
    pub types: Vec<Occupancy>,
    /// The closed set of type names the simulation may produce.
    pub possible_types: Vec<String>,
}

/// `(position_index, [dx, dy, dz])`: the particle at a pattern position
/// moves by a fractional displacement.
pub type MoveVector = (usize, Vec3);

/// `(delta, type_name)`: a signed count change of one type at a bucket
/// pattern position.
pub type UpdateEntry = (i32, String);

/// One local process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Pattern offsets in fractional units. The first must be the origin.
    pub coordinates: Vec<Vec3>,
    /// Required content at each offset before firing.
    pub elements_before: Vec<Occupancy>,
    /// Content after firing (single-occupancy processes).
    #[serde(default)]
    pub elements_after: Option<Vec<Occupancy>>,
    /// Count changes per offset (bucket processes).
    #[serde(default)]
    pub update: Option<Vec<Vec<UpdateEntry>>>,
    /// Tracked particle moves.
    #[serde(default)]
    pub move_vectors: Vec<MoveVector>,
    /// Basis indices at which the process may fire.
    pub basis_sites: Vec<usize>,
    /// Rate constant, strictly positive.
    pub rate_constant: f64,
}

impl ProcessRecord {
    /// Whether this is a bucket process.
    pub fn is_bucket(&self) -> bool {
        self.update.is_some() || self.elements_before.iter().any(Occupancy::is_many)
    }
}

fn default_true() -> bool {
    true
}

/// The list of processes and how to compile them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionsRecord {
    /// Processes, in id order.
    pub processes: Vec<ProcessRecord>,
    /// Insert wildcards where a process lacks an offset another uses.
    #[serde(default = "default_true")]
    pub implicit_wildcards: bool,
    /// Explicit neighbourhood radius in cell units. Default: the largest
    /// process offset.
    #[serde(default)]
    pub cutoff: Option<f64>,
}

/// Everything needed to build a lattice model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Lattice geometry.
    pub lattice: LatticeRecord,
    /// Initial configuration.
    pub configuration: ConfigurationRecord,
    /// Processes.
    pub interactions: InteractionsRecord,
}

impl ModelRecord {
    /// Parse a model from JSON text.
    pub fn from_json(text: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, InputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the configuration or any process uses bucket occupancy.
    pub fn is_bucket(&self) -> bool {
        self.configuration.types.iter().any(Occupancy::is_many)
            || self.interactions.processes.iter().any(ProcessRecord::is_bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLIP: &str = r#"{
        "lattice": {
            "unit_cell": {
                "cell_vectors": [[1,0,0],[0,1,0],[0,0,1]],
                "basis_points": [[0,0,0]]
            },
            "repetitions": [1,1,1],
            "periodic": [true,true,true]
        },
        "configuration": { "types": ["U"], "possible_types": ["U","D"] },
        "interactions": {
            "processes": [
                { "coordinates": [[0,0,0]], "elements_before": ["U"],
                  "elements_after": ["D"], "basis_sites": [0], "rate_constant": 1.0 },
                { "coordinates": [[0,0,0]], "elements_before": ["D"],
                  "elements_after": ["U"], "basis_sites": [0], "rate_constant": 1.0 }
            ]
        }
    }"#;

    #[test]
    fn parses_single_occupancy_model() {
        let m = ModelRecord::from_json(FLIP).unwrap();
        assert_eq!(m.lattice.repetitions, [1, 1, 1]);
        assert_eq!(m.configuration.types, vec![Occupancy::from("U")]);
        assert_eq!(m.interactions.processes.len(), 2);
        assert!(m.interactions.implicit_wildcards, "defaults to true");
        assert!(m.interactions.cutoff.is_none());
        assert!(!m.is_bucket());
    }

    #[test]
    fn parses_bucket_process_and_moves() {
        let text = r#"{
            "coordinates": [[0,0,0],[1,0,0]],
            "elements_before": [["A","A"], "B"],
            "update": [[[-1,"A"]], [[1,"A"]]],
            "basis_sites": [0],
            "rate_constant": 2.0
        }"#;
        let p: ProcessRecord = serde_json::from_str(text).unwrap();
        assert!(p.is_bucket());
        assert_eq!(p.elements_before[0].names(), vec!["A", "A"]);
        assert_eq!(p.update.as_ref().unwrap()[1], vec![(1, "A".to_string())]);

        let text = r#"{
            "coordinates": [[0,0,0],[1,0,0]],
            "elements_before": ["V","O"],
            "elements_after": ["O","V"],
            "move_vectors": [[0, [1,0,0]], [1, [-1,0,0]]],
            "basis_sites": [0],
            "rate_constant": 1.0
        }"#;
        let p: ProcessRecord = serde_json::from_str(text).unwrap();
        assert!(!p.is_bucket());
        assert_eq!(p.move_vectors[1], (1, [-1.0, 0.0, 0.0]));
    }

    #[test]
    fn json_round_trip() {
        let m = ModelRecord::from_json(FLIP).unwrap();
        let again = ModelRecord::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(m, again);
    }
}
