use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{InteropError, Result};

/// Default object name of the concept map manifest in the mapping store.
pub const DEFAULT_MANIFEST_NAME: &str = "DataNormalizationRegistry.json";

/// Fields the localizer never descends into.
pub const DEFAULT_LOCALIZATION_IGNORED_FIELDS: &[&str] = &["contained", "version_id"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InteropConfig {
    pub concept_maps: ConceptMapConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptMapConfig {
    /// Object name of the registry manifest
    pub manifest_name: String,
    /// How long a tenant's view of the registry stays fresh
    pub reload_interval: Duration,
    /// Upper bound for a single manifest or mapping document fetch
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub localization_ignored_fields: Vec<String>,
}

impl Default for ConceptMapConfig {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            reload_interval: Duration::from_secs(2 * 60 * 60), // 2 hours
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            localization_ignored_fields: DEFAULT_LOCALIZATION_IGNORED_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

impl InteropConfig {
    /// Parse a configuration document. Missing sections fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concept_maps.manifest_name.trim().is_empty() {
            return Err(InteropError::configuration(
                "concept map manifest name cannot be empty",
            ));
        }
        if self.concept_maps.fetch_timeout.is_zero() {
            return Err(InteropError::configuration(
                "concept map fetch timeout cannot be zero",
            ));
        }
        Ok(())
    }

    pub fn with_concept_maps(mut self, concept_maps: ConceptMapConfig) -> Self {
        self.concept_maps = concept_maps;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}

impl ConceptMapConfig {
    pub fn with_manifest_name(mut self, manifest_name: impl Into<String>) -> Self {
        self.manifest_name = manifest_name.into();
        self
    }

    pub fn with_reload_interval(mut self, reload_interval: Duration) -> Self {
        self.reload_interval = reload_interval;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Short intervals for local development against a mapping store that is
    /// being edited.
    pub fn development() -> Self {
        Self {
            reload_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn reload_interval_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.reload_interval).unwrap_or(chrono::Duration::MAX)
    }
}

impl PipelineConfig {
    pub fn with_ignored_field(mut self, field: impl Into<String>) -> Self {
        self.localization_ignored_fields.push(field.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InteropConfig::default();
        assert_eq!(config.concept_maps.manifest_name, DEFAULT_MANIFEST_NAME);
        assert_eq!(
            config.concept_maps.reload_interval,
            Duration::from_secs(7200)
        );
        assert_eq!(
            config.pipeline.localization_ignored_fields,
            vec!["contained".to_string(), "version_id".to_string()]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = InteropConfig::from_json(
            r#"{"concept_maps": {"manifest_name": "registry.json"}}"#,
        )
        .unwrap();
        assert_eq!(config.concept_maps.manifest_name, "registry.json");
        assert_eq!(config.concept_maps.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_empty_manifest_name() {
        let result = InteropConfig::from_json(r#"{"concept_maps": {"manifest_name": " "}}"#);
        assert!(matches!(result, Err(InteropError::Configuration { .. })));
    }
}
