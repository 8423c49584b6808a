use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ShowError;

/// What to do when the GPU reports an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlErrorPolicy {
    /// Stop at the first error so it can be inspected.
    Halt,
    /// Log the error and keep rendering.
    Log,
}

impl Default for GlErrorPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            GlErrorPolicy::Halt
        } else {
            GlErrorPolicy::Log
        }
    }
}

/// Parameters for bitmap mask pre-processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceFieldConfig {
    /// Spread radius in pixels.
    pub radius: f64,
    /// Bias added to the normalized distance before encoding.
    pub cutoff: f64,
    /// Transparent border added on every side.
    pub padding: u32,
}

impl Default for DistanceFieldConfig {
    fn default() -> Self {
        Self {
            radius: 8.0,
            cutoff: 0.25,
            padding: 0,
        }
    }
}

/// Host-side runtime configuration (JSON).
///
/// Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub width: u32,
    pub height: u32,
    pub gl_errors: GlErrorPolicy,
    /// Drive the clock from an audio device. Failing to open one is fatal when set.
    pub audio: bool,
    /// Initial playback pitch.
    pub pitch: f64,
    pub sdf: DistanceFieldConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            gl_errors: GlErrorPolicy::default(),
            audio: false,
            pitch: 1.0,
            sdf: DistanceFieldConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from `path` if it exists, defaults otherwise. A present but malformed file is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ShowError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        load_runtime_config(path)
    }
}

pub fn load_runtime_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ShowError> {
    load_typed_json(path)
}

/// Read and deserialize a JSON file, attaching the path to any failure.
pub fn load_typed_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ShowError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let text = std::fs::read_to_string(&path).map_err(|source| ShowError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ShowError::Json { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn policy_parses_lowercase() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{ "gl_errors": "log", "sdf": { "radius": 4.0 } }"#).unwrap();
        assert_eq!(cfg.gl_errors, GlErrorPolicy::Log);
        assert_eq!(cfg.sdf.radius, 4.0);
        assert_eq!(cfg.sdf.cutoff, 0.25);
    }

    #[test]
    fn missing_file_is_default_but_bad_path_load_fails() {
        let missing = std::env::temp_dir().join("pulse_core_config_does_not_exist.json");
        assert_eq!(
            RuntimeConfig::load_or_default(&missing).unwrap(),
            RuntimeConfig::default()
        );
        assert!(matches!(
            load_runtime_config(&missing),
            Err(ShowError::Io { .. })
        ));
    }
}
