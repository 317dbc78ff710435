use std::path::Path;

use serde::{Deserialize, Serialize};

use statute_core::naming::DEFAULT_BASE_NAME;
use statute_storage::DEFAULT_TEMP_ORDER_OFFSET;

use crate::error::EngineError;

pub const DEFAULT_UNDO_CAPACITY: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub undo_capacity: usize,
    pub autosave_interval_secs: u64,
    pub draft_max_age_secs: u64,
    pub temp_order_offset: i64,
    pub default_base_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            autosave_interval_secs: 30,
            draft_max_age_secs: 24 * 60 * 60,
            temp_order_offset: DEFAULT_TEMP_ORDER_OFFSET,
            default_base_name: DEFAULT_BASE_NAME.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Read `path` (defaults when it does not exist), then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                return Err(EngineError::Config(format!(
                    "read {}: {err}",
                    path.display()
                )));
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("STATUTE_UNDO_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => self.undo_capacity = value,
                Ok(_) => tracing::warn!("STATUTE_UNDO_CAPACITY must be positive, ignoring"),
                Err(err) => tracing::warn!("invalid STATUTE_UNDO_CAPACITY, ignoring: {err}"),
            }
        }

        if let Some(raw) = lookup("STATUTE_AUTOSAVE_INTERVAL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(value) => self.autosave_interval_secs = value,
                Err(err) => {
                    tracing::warn!("invalid STATUTE_AUTOSAVE_INTERVAL_SECS, ignoring: {err}")
                }
            }
        }
    }

    pub fn draft_max_age_ms(&self) -> u64 {
        self.draft_max_age_secs.saturating_mul(1000)
    }

    pub fn autosave_interval_ms(&self) -> u64 {
        self.autosave_interval_secs.saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = EditorConfig::from_toml_str("undo_capacity = 10\n").unwrap();
        assert_eq!(config.undo_capacity, 10);
        assert_eq!(config.draft_max_age_secs, 86_400);
        assert_eq!(config.temp_order_offset, 900_000);
        assert_eq!(config.default_base_name, "Pseudo");
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut expected = EditorConfig::default();
        expected.apply_env_overrides();
        let config = EditorConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, expected);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        let config = EditorConfig {
            autosave_interval_secs: 5,
            default_base_name: "Draft".into(),
            ..EditorConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        let loaded = EditorConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(EditorConfig::from_toml_str("undo_capacity = \"many\"").is_err());
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut config = EditorConfig::default();
        config.apply_overrides(|key| match key {
            "STATUTE_UNDO_CAPACITY" => Some("0".into()),
            "STATUTE_AUTOSAVE_INTERVAL_SECS" => Some(" 12 ".into()),
            _ => None,
        });
        assert_eq!(config.undo_capacity, DEFAULT_UNDO_CAPACITY);
        assert_eq!(config.autosave_interval_secs, 12);

        config.apply_overrides(|key| (key == "STATUTE_UNDO_CAPACITY").then(|| "lots".into()));
        assert_eq!(config.undo_capacity, DEFAULT_UNDO_CAPACITY);
    }
}
