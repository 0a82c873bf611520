//! # OctoFHIR Interop
//!
//! Tenant-aware transformation of incoming FHIR resources into canonical
//! profiles.
//!
//! ## Features
//!
//! - **Copy-on-write transforms**: typed traversal over resource graphs that
//!   hands back the input untouched when nothing changed
//! - **Normalization**: legacy code system identifiers rewritten to canonical
//!   URIs, missing concept text filled in
//! - **Localization**: resource ids and references scoped to the tenant
//! - **Concept maps**: tenant source codes translated through mapping
//!   documents listed in a registry manifest, cached per tenant
//! - **Profiles**: staged pipelines producing a validated canonical resource,
//!   with multi-profile resolution for resource types with several shapes
//! - **Reporting**: validation issues forwarded to an issue tracker
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use octofhir_interop::*;
//!
//! # async fn example() -> Result<()> {
//! let config = InteropConfig::default();
//! let store = Arc::new(MemoryObjectStore::new());
//! let client = Arc::new(ConceptMapClient::new(store, config.concept_maps.clone()));
//!
//! let pipeline = ProfilePipeline::new(AppointmentShape::new(), client, &config.pipeline);
//! let appointment: Appointment = serde_json::from_str(r#"{"id": "a1", "status": "NS"}"#)?;
//! let outcome = pipeline.transform(&appointment, "tenant-a", None).await;
//!
//! if !outcome.validation.is_empty() {
//!     let reporter = ValidationReporter::new(Arc::new(InMemoryIssueTracker::new()));
//!     reporter.report(&outcome.validation, &appointment, "tenant-a").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod conceptmap;
pub mod core;
pub mod error;
pub mod profile;
pub mod storage;
pub mod transform;
pub mod types;
pub mod validation;

pub use conceptmap::{ConceptMapCache, ConceptMapClient, ConceptMapping, ConceptTranslation};
pub use crate::core::config::{ConceptMapConfig, InteropConfig, PipelineConfig};
pub use error::Result; // Our Result type takes precedence
pub use error::InteropError;
pub use profile::{
    AppointmentShape, ConditionEncounterDiagnosisShape, ConditionProblemsShape,
    MultiProfileResolver, PatientShape, ProfileDescriptor, ProfileOutcome, ProfilePipeline,
    ProfileShape, condition_resolver,
};
pub use storage::*;
pub use transform::{Change, Localizer, Normalizer, Transform, TransformContext, Visitor};
pub use types::*;
pub use validation::{
    InMemoryIssueTracker, IssueTracker, Validation, ValidationIssue, ValidationReporter,
    ValidationSeverity,
};
