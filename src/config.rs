// Loaded on startup from <project>/.pitchperfect/config.json; every field has a default
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effect_kind::{check_range, EffectTable, ParamError, MIX_RANGE};
use crate::session::{PlaybackSettings, RecorderSettings};

pub const APP_DIR: &str = ".pitchperfect";
const CONFIG_FILE: &str = "config.json";
const RECORDINGS_DIR: &str = "recordings";
const LOG_FILE: &str = "pitchperfect.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidParameter(#[from] ParamError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub recordings_dir: Option<PathBuf>,
    pub keep_recordings: bool,
    pub allow_pause: bool,
    pub effects: EffectTable,
    pub reverb: ReverbConfig,
    pub delay: DelayConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReverbConfig {
    pub decay_seconds: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayConfig {
    pub feedback: f32,
    pub mix: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            keep_recordings: false,
            allow_pause: true,
            effects: EffectTable::default(),
            reverb: ReverbConfig::default(),
            delay: DelayConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self { decay_seconds: 3.0 } // long enough to pass for a cathedral
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self { feedback: 0.5, mix: 50.0 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

// <project_dir>/.pitchperfect/config.json
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(APP_DIR).join(CONFIG_FILE)
}

pub fn log_path(project_dir: &Path) -> PathBuf {
    project_dir.join(APP_DIR).join(LOG_FILE)
}

impl Config {
    // Missing file means defaults; anything unreadable or out of range is an error.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_path(project_dir);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        let config: Config =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    // Save the config to disk, making the files if they don't exist already
    pub fn save(&self, project_dir: &Path) -> Result<(), ConfigError> {
        let path = config_path(project_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Io { path: parent.to_path_buf(), source })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
        std::fs::write(&path, json).map_err(|source| ConfigError::Io { path, source })
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        self.effects.validate()?;
        check_range("reverb.decaySeconds", self.reverb.decay_seconds, (0.1, 30.0))?;
        check_range("delay.feedback", self.delay.feedback, (0.0, 0.95))?;
        check_range("delay.mix", self.delay.mix, MIX_RANGE)
    }

    pub fn recordings_dir(&self, project_dir: &Path) -> PathBuf {
        self.recordings_dir
            .clone()
            .unwrap_or_else(|| project_dir.join(APP_DIR).join(RECORDINGS_DIR))
    }

    pub fn recorder_settings(&self, project_dir: &Path) -> RecorderSettings {
        RecorderSettings {
            dir: self.recordings_dir(project_dir),
            allow_pause: self.allow_pause,
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            effects: self.effects.clone(),
            reverb_decay_seconds: self.reverb.decay_seconds,
            delay_feedback: self.delay.feedback,
            delay_mix: self.delay.mix,
            keep_recordings: self.keep_recordings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.recordings_dir(dir.path()),
            dir.path().join(".pitchperfect").join("recordings")
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.keep_recordings = true;
        config.effects.delay_seconds = 0.3;
        config.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(APP_DIR)).unwrap();
        std::fs::write(
            config_path(dir.path()),
            r#"{ "allowPause": false, "effects": { "slowRate": 0.75 } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(!config.allow_pause);
        assert_eq!(config.effects.slow_rate, 0.75);
        assert_eq!(config.effects.fast_rate, 1.5);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn out_of_range_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(APP_DIR)).unwrap();
        std::fs::write(config_path(dir.path()), r#"{ "effects": { "reverbMix": 140 } }"#).unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter(ParamError { name: "wetDryMix", .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(APP_DIR)).unwrap();
        std::fs::write(config_path(dir.path()), "{ not json").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn settings_carry_config_values() {
        let config = Config { keep_recordings: true, allow_pause: false, ..Config::default() };
        let dir = Path::new("/project");
        assert!(config.playback_settings().keep_recordings);
        assert!(!config.recorder_settings(dir).allow_pause);
        assert_eq!(config.playback_settings().delay_mix, 50.0);
    }
}
