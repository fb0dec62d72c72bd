//! Application configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to
//! the built-in defaults:
//!
//! ```toml
//! [defaults]
//! filter = "sepia_tone"
//!
//! [defaults.parameters]
//! intensity = 0.5
//! radius = 100.0
//!
//! [review]
//! threshold = 5
//! store_path = "instafilter-state.json"
//!
//! [engine]
//! max_extent = 16384
//!
//! [worker]
//! threads = 2
//! ```

use crate::core::error::ConfigError;
use crate::core::types::{FilterKind, ParameterSet};
use crate::filters::engine::DEFAULT_MAX_EXTENT;
use crate::filters::BuiltinEngine;
use crate::pipeline::worker::DEFAULT_WORKER_THREADS;
use crate::pipeline::PipelineBuilder;
use crate::review::{JsonFileStore, DEFAULT_REVIEW_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub defaults: DefaultsConfig,
    pub review: ReviewConfig,
    pub engine: EngineConfig,
    pub worker: WorkerConfig,
}

/// Initial filter and slider values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub filter: FilterKind,
    pub parameters: ParameterSet,
}

/// Review prompt settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Filter changes between prompts.
    pub threshold: u32,
    /// Where the counter is persisted; in memory if unset.
    pub store_path: Option<PathBuf>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REVIEW_THRESHOLD,
            store_path: None,
        }
    }
}

/// Filter engine limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted image edge in pixels.
    pub max_extent: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_extent: DEFAULT_MAX_EXTENT,
        }
    }
}

/// Background worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Render threads.
    pub threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKER_THREADS,
        }
    }
}

impl AppConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.parameters.validate()?;
        if self.review.threshold == 0 {
            return Err(ConfigError::Invalid("review.threshold must be at least 1".to_string()));
        }
        if self.engine.max_extent == 0 {
            return Err(ConfigError::Invalid("engine.max_extent must be at least 1".to_string()));
        }
        if self.worker.threads == 0 {
            return Err(ConfigError::Invalid("worker.threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// A pipeline builder configured from these settings.
    pub fn pipeline_builder(&self) -> Result<PipelineBuilder, ConfigError> {
        let mut builder = PipelineBuilder::new()
            .with_engine(BuiltinEngine::new().with_max_extent(self.engine.max_extent))
            .with_review_threshold(self.review.threshold)
            .with_filter(self.defaults.filter)
            .with_parameters(self.defaults.parameters)?;

        if let Some(path) = &self.review.store_path {
            builder = builder.with_counter_store(JsonFileStore::new(path));
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ParameterName;
    use crate::review::FILTER_COUNT_KEY;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.defaults.filter, FilterKind::SepiaTone);
        assert_eq!(config.review.threshold, 5);
        assert_eq!(config.worker.threads, 2);
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [defaults]
            filter = "gaussian_blur"

            [defaults.parameters]
            radius = 12.0

            [review]
            threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.filter, FilterKind::GaussianBlur);
        assert_eq!(config.defaults.parameters.radius, 12.0);
        assert_eq!(config.defaults.parameters.intensity, 0.5);
        assert_eq!(config.review.threshold, 3);
        assert_eq!(config.engine.max_extent, DEFAULT_MAX_EXTENT);
    }

    #[test]
    fn test_out_of_range_default_rejected() {
        let err = AppConfig::from_toml_str("[defaults.parameters]\nintensity = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parameter(ref e) if e.name == ParameterName::Intensity));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = AppConfig::from_toml_str("[review]\nthreshold = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let err = AppConfig::from_toml_str("[defaults]\nfilter = \"posterize\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_builds_persistent_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("state.json");
        let config_path = dir.path().join("instafilter.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "[defaults]\nfilter = \"hue_adjust\"\n").unwrap();
        writeln!(file, "[review]\nthreshold = 2\nstore_path = {:?}", store_path.display().to_string()).unwrap();
        drop(file);

        let config = AppConfig::load(&config_path).unwrap();
        let mut pipeline = config.pipeline_builder().unwrap().build();
        assert_eq!(pipeline.filter_kind(), FilterKind::HueAdjust);

        pipeline.set_filter_kind(FilterKind::Edges);
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
        assert_eq!(saved[FILTER_COUNT_KEY], 1);

        // A fresh pipeline picks the counter back up
        let pipeline = config.pipeline_builder().unwrap().build();
        assert_eq!(pipeline.review_count(), 1);
    }
}
