pub mod config;

pub use config::{
    ConceptMapConfig, DEFAULT_LOCALIZATION_IGNORED_FIELDS, DEFAULT_MANIFEST_NAME, InteropConfig,
    PipelineConfig,
};
