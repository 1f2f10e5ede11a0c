//! Runtime configuration.
//!
//! Defaults live here as constants. [`Settings::from_env`] loads `.env` (if
//! any) and overrides them from `FIELDMAP_*` variables; CLI flags override
//! settings in turn.

use std::env;
use std::path::PathBuf;

use crate::api::logs::log_warning;

/// HTTP port for `fieldmap serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Directory holding saved mapping configurations.
pub const DEFAULT_REGISTRY_DIR: &str = ".fieldmap/configs";

/// Suggestions must score strictly above this to be applied.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Entity whose catalog stands in for unknown entities.
pub const DEFAULT_ENTITY: &str = "PFA";

/// Model used by the automap client.
pub const DEFAULT_AI_MODEL: &str = "claude-sonnet-4-20250514";

/// Sample rows shown by preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

pub const ENV_PORT: &str = "FIELDMAP_PORT";
pub const ENV_REGISTRY_DIR: &str = "FIELDMAP_REGISTRY_DIR";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "FIELDMAP_CONFIDENCE_THRESHOLD";
pub const ENV_DEFAULT_ENTITY: &str = "FIELDMAP_DEFAULT_ENTITY";
pub const ENV_AI_MODEL: &str = "FIELDMAP_AI_MODEL";
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub registry_dir: PathBuf,
    pub confidence_threshold: f64,
    pub default_entity: String,
    pub ai_model: String,
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            default_entity: DEFAULT_ENTITY.to_string(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Load `.env`, then read the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup. Malformed values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(raw) = get(ENV_PORT) {
            match raw.parse::<u16>() {
                Ok(port) => settings.port = port,
                Err(_) => log_warning(format!("{}={} is not a port, using {}", ENV_PORT, raw, DEFAULT_PORT)),
            }
        }

        if let Some(dir) = get(ENV_REGISTRY_DIR) {
            settings.registry_dir = PathBuf::from(dir);
        }

        if let Some(raw) = get(ENV_CONFIDENCE_THRESHOLD) {
            match raw.parse::<f64>() {
                Ok(t) if (0.0..=1.0).contains(&t) => settings.confidence_threshold = t,
                _ => log_warning(format!(
                    "{}={} is not in 0..=1, using {}",
                    ENV_CONFIDENCE_THRESHOLD, raw, DEFAULT_CONFIDENCE_THRESHOLD
                )),
            }
        }

        if let Some(entity) = get(ENV_DEFAULT_ENTITY) {
            settings.default_entity = entity;
        }

        if let Some(model) = get(ENV_AI_MODEL) {
            settings.ai_model = model;
        }

        settings.api_key = get(ENV_API_KEY);
        settings
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Whether the AI automap client can be built.
    pub fn has_ai(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert!(!settings.has_ai());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_PORT, "8080"),
            (ENV_REGISTRY_DIR, "/tmp/maps"),
            (ENV_CONFIDENCE_THRESHOLD, "0.75"),
            (ENV_DEFAULT_ENTITY, "Asset"),
            (ENV_API_KEY, "sk-test"),
        ]));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.registry_dir, PathBuf::from("/tmp/maps"));
        assert_eq!(settings.confidence_threshold, 0.75);
        assert_eq!(settings.default_entity, "Asset");
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        assert!(settings.has_ai());
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_PORT, "eighty"),
            (ENV_CONFIDENCE_THRESHOLD, "2.5"),
            (ENV_API_KEY, "   "),
        ]));
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(settings.api_key.is_none());
    }
}
