//! Target profiles: the canonical shapes tenant resources are transformed
//! into, and the machinery that picks and runs them.
//!
//! - [`ProfileDescriptor`] is the object-safe surface callers work with.
//! - [`pipeline::ProfilePipeline`] runs the transformation stages for one
//!   [`pipeline::ProfileShape`].
//! - [`resolver::MultiProfileResolver`] picks the single qualifying profile
//!   out of several candidates for the same resource type.

pub mod appointment;
pub mod condition;
pub mod patient;
pub mod pipeline;
pub mod resolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::transform::systems::element_system_name;
use crate::types::{DomainResource, Extension, Identifier, Reference};
use crate::validation::{LocationContext, Validation, ValidationIssue, codes};

pub use appointment::AppointmentShape;
pub use condition::{ConditionEncounterDiagnosisShape, ConditionProblemsShape, condition_resolver};
pub use patient::PatientShape;
pub use pipeline::{ConceptMapper, ProfilePipeline, ProfileShape};
pub use resolver::MultiProfileResolver;

/// Identifier system carrying the tenant a resource came from.
pub const TENANT_ID_SYSTEM: &str = "http://octofhir.io/id/tenantId";
/// Identifier system carrying the tenant-scoped resource id.
pub const FHIR_ID_SYSTEM: &str = "http://octofhir.io/id/fhirId";
pub const PROFILE_BASE: &str = "http://octofhir.io/fhir/StructureDefinition";
/// Prefix of the extensions recording tenant source values.
pub const SOURCE_EXTENSION_BASE: &str =
    "http://octofhir.io/fhir/StructureDefinition/tenant-source";

/// Resources transformed concurrently by [`transform_all`].
const BATCH_CONCURRENCY: usize = 8;

/// `Appointment.status` -> `.../tenant-sourceAppointmentStatus`
pub fn source_extension_url(element: &str) -> String {
    format!("{SOURCE_EXTENSION_BASE}{}", element_system_name(element))
}

pub fn profile_url(name: &str) -> String {
    format!("{PROFILE_BASE}/{name}")
}

/// Result of running a profile: the transformed resource when it was
/// accepted, and every issue found along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutcome<R> {
    pub resource: Option<R>,
    pub validation: Validation,
}

impl<R> ProfileOutcome<R> {
    pub fn accepted(resource: R, validation: Validation) -> Self {
        Self {
            resource: Some(resource),
            validation,
        }
    }

    pub fn rejected(validation: Validation) -> Self {
        Self {
            resource: None,
            validation,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.resource.is_some()
    }
}

#[async_trait]
pub trait ProfileDescriptor<R: DomainResource>: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `resource` is meant to be shaped by this profile.
    fn qualifies(&self, resource: &R) -> bool;

    /// Check a resource that is already in this profile's shape.
    fn validate(&self, resource: &R) -> Validation;

    /// Transform a tenant resource into this profile's shape.
    ///
    /// `force_reload_after` forces a concept map reload for the tenant when
    /// its last reload happened before that instant.
    async fn transform(
        &self,
        resource: &R,
        tenant: &str,
        force_reload_after: Option<DateTime<Utc>>,
    ) -> ProfileOutcome<R>;
}

/// Transform a batch of resources, keeping input order in the output.
pub async fn transform_all<R: DomainResource>(
    descriptor: &dyn ProfileDescriptor<R>,
    resources: &[R],
    tenant: &str,
    force_reload_after: Option<DateTime<Utc>>,
) -> Vec<ProfileOutcome<R>> {
    stream::iter(resources)
        .map(|resource| descriptor.transform(resource, tenant, force_reload_after))
        .buffered(BATCH_CONCURRENCY)
        .collect()
        .await
}

/// Add `extension`, replacing an existing extension with the same url.
pub fn upsert_extension(extensions: &mut Vec<Extension>, extension: Extension) {
    match extensions.iter_mut().find(|existing| existing.url == extension.url) {
        Some(existing) => *existing = extension,
        None => extensions.push(extension),
    }
}

/// Add `identifier`, replacing the value of an existing identifier of the same
/// system.
pub fn upsert_identifier(identifiers: &mut Vec<Identifier>, identifier: Identifier) {
    match identifiers
        .iter_mut()
        .find(|existing| existing.system.is_some() && existing.system == identifier.system)
    {
        Some(existing) => existing.value = identifier.value,
        None => identifiers.push(identifier),
    }
}

/// Record an issue of `severity` when `reference` points at a resource type
/// outside `allowed`. References without a recognizable type are left to
/// other checks.
pub fn validate_reference_type(
    validation: &mut Validation,
    reference: &Reference,
    allowed: &[&str],
    location: &LocationContext,
    as_error: bool,
) -> bool {
    let Some(target) = reference.target_type() else {
        return true;
    };
    validation.check_true(allowed.contains(&target), || {
        let description = format!(
            "Reference to '{target}' is not allowed, expected one of: {}",
            allowed.join(", ")
        );
        let issue = if as_error {
            ValidationIssue::error(codes::INVALID_REFERENCE_TYPE, description)
        } else {
            ValidationIssue::warning(codes::INVALID_REFERENCE_TYPE, description)
        };
        issue.at(location)
    })
}

/// Checks every profile applies to its own output: canonical identifiers
/// and the profile claim in `meta.profile`.
pub fn validate_canonical<R: DomainResource>(resource: &R, profile_url: &str) -> Validation {
    let mut validation = Validation::new();
    let location = LocationContext::new(R::RESOURCE_TYPE);

    for system in [TENANT_ID_SYSTEM, FHIR_ID_SYSTEM] {
        let present = resource
            .find_identifier(system)
            .and_then(|identifier| identifier.value.as_deref())
            .is_some_and(|value| !value.is_empty());
        validation.check_true(present, || {
            ValidationIssue::error(
                codes::MISSING_CANONICAL_IDENTIFIER,
                format!("Identifier with system '{system}' is required"),
            )
            .at(&location.field("identifier"))
        });
    }

    let claims_profile = resource
        .meta()
        .is_some_and(|meta| meta.profile.iter().any(|url| url == profile_url));
    validation.check_true(claims_profile, || {
        ValidationIssue::error(
            codes::MISSING_PROFILE,
            format!("meta.profile must contain '{profile_url}'"),
        )
        .at(&location.field("meta").field("profile"))
    });

    validation
}
