/// Error types for level setup and session persistence.
///
/// Level errors are fatal at setup time: a level whose data does not
/// provide every layer its rules reference is refused before play starts.
/// Save errors are reported in-game and never abort the session.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {0} does not exist")]
    UnknownLevel(u32),

    #[error("level {level}: layer `{layer}` is required but not defined")]
    MissingLayer { level: u32, layer: &'static str },

    #[error("level {level}: unknown layer name `{name}`")]
    UnknownLayer { level: u32, name: String },

    #[error("level {level}: {reason}")]
    Malformed { level: u32, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed save file: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("could not encode save: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Anything that ends the program early.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error(transparent)]
    Level(#[from] LevelError),
}
