use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::effect_kind::ParamError;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("storage failure at {}: {source}", path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("playback engine failed to start: {0}")]
    EngineStartFailure(String),

    #[error("cannot {op} while {state}")]
    InvalidState { op: &'static str, state: &'static str },

    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
}

impl AudioError {
    pub fn storage(path: &Path, source: std::io::Error) -> Self {
        AudioError::StorageFailure { path: path.to_path_buf(), source }
    }

    // hound wraps io errors; flatten everything else into an io::Error so
    // StorageFailure always carries one kind of source
    pub fn from_wav(path: &Path, err: hound::Error) -> Self {
        let source = match err {
            hound::Error::IoError(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        };
        Self::storage(path, source)
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
