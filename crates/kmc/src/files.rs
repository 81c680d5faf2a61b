//! Loading inputs from JSON files and writing analysis results.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use kmc_core::{InputError, ModelRecord, MpiFacade};
use kmc_engine::{Analysis, ControlParameters, LatticeModel, ModelError};

/// Errors from [`load_record`], [`load_model`] and [`load_control`].
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The file was read but its content is invalid.
    Input(InputError),
    /// The record is well-formed but the model cannot be built.
    Model(ModelError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Input(e) => write!(f, "{e}"),
            Self::Model(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Input(e) => Some(e),
            Self::Model(e) => Some(e),
        }
    }
}

impl From<InputError> for LoadError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<ModelError> for LoadError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a model record from a JSON file.
pub fn load_record(path: impl AsRef<Path>) -> Result<ModelRecord, LoadError> {
    Ok(ModelRecord::from_json(&read(path.as_ref())?)?)
}

/// Parse and build a model from a JSON file.
pub fn load_model(path: impl AsRef<Path>) -> Result<LatticeModel, LoadError> {
    let path = path.as_ref();
    let model = LatticeModel::from_record(&load_record(path)?)?;
    info!(path = %path.display(), "model loaded");
    Ok(model)
}

/// Parse and validate control parameters from a JSON file. Missing
/// fields take their defaults.
pub fn load_control(path: impl AsRef<Path>) -> Result<ControlParameters, LoadError> {
    let text = read(path.as_ref())?;
    let control: ControlParameters = serde_json::from_str(&text).map_err(InputError::from)?;
    control.validate()?;
    Ok(control)
}

/// Write an analysis' results to `path` on the master rank. Returns
/// whether this rank wrote the file.
pub fn write_results(
    analysis: &dyn Analysis,
    path: impl AsRef<Path>,
    mpi: &dyn MpiFacade,
) -> io::Result<bool> {
    if !mpi.is_master() {
        return Ok(false);
    }
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    analysis.write_results(&mut out)?;
    out.flush()?;
    info!(
        analysis = analysis.name(),
        path = %path.as_ref().display(),
        "results written"
    );
    Ok(true)
}
