use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub(crate) const CONFIG_ENV_VAR: &str = "MANOR_CONFIG";
pub(crate) const START_ROOM_ENV_VAR: &str = "MANOR_START_ROOM";
pub(crate) const SCRIPT_ENV_VAR: &str = "MANOR_SCRIPT";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}{}: {message}", at_json_path(.json_path))]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("invalid value for {var}: '{value}' is not a room index")]
    InvalidEnv { var: &'static str, value: String },
    #[error("validation failed at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn at_json_path(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) target_tps: u32,
    /// Caps the ticks a single `wait` may run.
    pub(crate) max_ticks_per_advance: u32,
    pub(crate) start_room: usize,
    pub(crate) speech_enabled: bool,
    pub(crate) audio_enabled: bool,
    pub(crate) blueprint_path: Option<PathBuf>,
    pub(crate) script_path: Option<PathBuf>,
    pub(crate) echo_presentation: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks_per_advance: 60 * 60 * 10,
            start_room: 0,
            speech_enabled: true,
            audio_enabled: true,
            blueprint_path: None,
            script_path: None,
            echo_presentation: true,
        }
    }
}

impl GameConfig {
    /// Reads `MANOR_CONFIG` (if set) and applies the env overrides on top.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    pub(crate) fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV_VAR).filter(|raw| !raw.trim().is_empty()) {
            Some(path) => Self::load_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        if let Some(raw) = lookup(START_ROOM_ENV_VAR) {
            config.start_room = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: START_ROOM_ENV_VAR,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(SCRIPT_ENV_VAR).filter(|raw| !raw.trim().is_empty()) {
            config.script_path = Some(PathBuf::from(raw.trim()));
        }
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse_json(path, &raw)?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    pub(crate) fn parse_json(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                json_path,
                message: error.into_inner().to_string(),
            }
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.target_tps == 0 {
            return Err(ConfigError::Invalid {
                field: "target_tps",
                message: "expected at least 1, got 0".to_string(),
            });
        }
        if self.max_ticks_per_advance == 0 {
            return Err(ConfigError::Invalid {
                field: "max_ticks_per_advance",
                message: "expected at least 1, got 0".to_string(),
            });
        }
        Ok(())
    }

    /// Checked once the blueprint is known.
    pub(crate) fn validate_start_room(&self, room_count: usize) -> Result<(), ConfigError> {
        if self.start_room >= room_count {
            return Err(ConfigError::Invalid {
                field: "start_room",
                message: format!("expected less than {room_count}, got {}", self.start_room),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = GameConfig::load_with(env(&[])).expect("defaults");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.target_tps, 60);
        assert!(config.echo_presentation);
    }

    #[test]
    fn config_file_fields_merge_over_defaults() {
        let temp = tempfile::TempDir::new().expect("temp");
        let path = temp.path().join("manor.json");
        fs::write(&path, r#"{ "start_room": 2, "speech_enabled": false }"#).expect("write");

        let config = GameConfig::load_with(env(&[(CONFIG_ENV_VAR, path.to_str().expect("utf8"))]))
            .expect("load");
        assert_eq!(config.start_room, 2);
        assert!(!config.speech_enabled);
        assert!(config.audio_enabled);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let temp = tempfile::TempDir::new().expect("temp");
        let path = temp.path().join("manor.json");
        fs::write(&path, r#"{ "start_room": 2 }"#).expect("write");

        let config = GameConfig::load_with(env(&[
            (CONFIG_ENV_VAR, path.to_str().expect("utf8")),
            (START_ROOM_ENV_VAR, " 3 "),
            (SCRIPT_ENV_VAR, "demo.txt"),
        ]))
        .expect("load");
        assert_eq!(config.start_room, 3);
        assert_eq!(config.script_path, Some(PathBuf::from("demo.txt")));
    }

    #[test]
    fn parse_errors_report_the_json_path() {
        let error = GameConfig::parse_json(Path::new("manor.json"), r#"{ "target_tps": "fast" }"#)
            .expect_err("type mismatch");
        let message = error.to_string();
        assert!(message.contains("at target_tps"), "{message}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = GameConfig::parse_json(Path::new("manor.json"), r#"{ "fov": 90 }"#)
            .expect_err("unknown field");
        assert!(error.to_string().contains("fov"));
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let error = GameConfig::load_with(env(&[(CONFIG_ENV_VAR, "/definitely/not/here.json")]))
            .expect_err("missing");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_start_room_env_is_rejected() {
        let error = GameConfig::load_with(env(&[(START_ROOM_ENV_VAR, "attic")]))
            .expect_err("not a number");
        assert!(matches!(error, ConfigError::InvalidEnv { var: START_ROOM_ENV_VAR, .. }));
    }

    #[test]
    fn zero_tick_rate_fails_validation() {
        let config = GameConfig {
            target_tps: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "target_tps", .. })
        ));
    }

    #[test]
    fn start_room_must_exist() {
        let config = GameConfig {
            start_room: 4,
            ..GameConfig::default()
        };
        assert!(config.validate_start_room(4).is_err());
        assert!(config.validate_start_room(5).is_ok());
    }
}
