use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AudioError, Result};

/// One finished take. Only a recorder produces these, and there is never more
/// than one owner: not `Clone`, and discarding consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct AudioClip {
    path: PathBuf,
    title: String,
    recorded: bool,
    sample_rate: u32,
    frames: u64,
}

impl AudioClip {
    pub(crate) fn recorded(path: PathBuf, sample_rate: u32, frames: u64) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, title, recorded: true, sample_rate, frames }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // The file stem: the recording timestamp `DDMMYYYY-HHMMSS`, with `-N`
    // appended when a take from the same second already had that name.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn is_valid(&self) -> bool {
        self.recorded && self.path.is_file()
    }

    // Delete the file. A file that is already gone counts as discarded.
    pub fn discard(self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AudioError::storage(&self.path, e)),
        }
    }

    // Give up ownership without touching the file.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_the_file_stem() {
        let clip = AudioClip::recorded(PathBuf::from("/tmp/16102026-142501.wav"), 48000, 96000);
        assert_eq!(clip.title(), "16102026-142501");
        assert_eq!(clip.duration(), Duration::from_secs(2));

        let second = AudioClip::recorded(PathBuf::from("/tmp/16102026-142501-1.wav"), 48000, 0);
        assert_eq!(second.title(), "16102026-142501-1");
    }

    #[test]
    fn discard_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let clip = AudioClip::recorded(path.clone(), 8000, 0);
        assert!(clip.is_valid());
        clip.discard().unwrap();
        assert!(!path.exists());

        let ghost = AudioClip::recorded(path, 8000, 0);
        assert!(!ghost.is_valid());
        ghost.discard().unwrap();
    }
}
