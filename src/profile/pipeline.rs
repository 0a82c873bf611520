use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    FHIR_ID_SYSTEM, ProfileDescriptor, ProfileOutcome, TENANT_ID_SYSTEM, upsert_identifier,
    validate_canonical,
};
use crate::conceptmap::{ConceptMapClient, ConceptTranslation};
use crate::core::config::PipelineConfig;
use crate::transform::localizer::localize_id;
use crate::transform::systems::tenant_source_system;
use crate::transform::{Localizer, Normalizer};
use crate::types::{CodeableConcept, Coding, DomainResource, Extension, Identifier, Meta};
use crate::validation::{LocationContext, Validation, ValidationIssue, codes};

/// The shape-specific parts of a profile. [`ProfilePipeline`] supplies the
/// stages every profile shares.
#[async_trait]
pub trait ProfileShape: Send + Sync + 'static {
    type Resource: DomainResource;

    fn name(&self) -> &str;

    fn profile_url(&self) -> &str;

    fn qualifies(&self, _resource: &Self::Resource) -> bool {
        true
    }

    /// Replace tenant source values with their canonical targets. Lookup
    /// failures are recorded by `mapper`.
    async fn map_concepts(
        &self,
        resource: Self::Resource,
        _mapper: &mut ConceptMapper<'_>,
    ) -> Self::Resource {
        resource
    }

    /// Shape-specific structural edits. `None` rejects the resource.
    fn transform_internal(
        &self,
        resource: &Self::Resource,
        _tenant: &str,
    ) -> Option<Self::Resource> {
        Some(resource.clone())
    }

    fn validate_shape(&self, resource: &Self::Resource) -> Validation;
}

/// Concept map lookups on behalf of a single pipeline run.
pub struct ConceptMapper<'a> {
    client: &'a ConceptMapClient,
    tenant: &'a str,
    resource_type: &'static str,
    force_reload_after: Option<DateTime<Utc>>,
    validation: Validation,
}

impl<'a> ConceptMapper<'a> {
    pub fn new(
        client: &'a ConceptMapClient,
        tenant: &'a str,
        resource_type: &'static str,
        force_reload_after: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            client,
            tenant,
            resource_type,
            force_reload_after,
            validation: Validation::new(),
        }
    }

    pub fn tenant(&self) -> &str {
        self.tenant
    }

    /// Map a bare code sent in the tenant's source system for `element`.
    pub async fn map_code(
        &mut self,
        element: &str,
        value: &str,
        location: &LocationContext,
    ) -> Option<(String, Extension)> {
        let source = Coding::new(tenant_source_system(self.tenant, element), value);
        let mapping = self
            .client
            .get_concept_mapping_with_refresh(
                self.tenant,
                self.resource_type,
                element,
                &source,
                self.force_reload_after,
            )
            .await;

        match mapping.and_then(|mapping| Some((mapping.coding.code?, mapping.extension))) {
            Some(mapped) => Some(mapped),
            None => {
                self.lookup_failed(element, value, location);
                None
            }
        }
    }

    pub async fn map_concept(
        &mut self,
        element: &str,
        concept: &CodeableConcept,
        location: &LocationContext,
    ) -> Option<ConceptTranslation> {
        let translation = self
            .client
            .get_concept_mapping_for_concept(
                self.tenant,
                self.resource_type,
                element,
                concept,
                self.force_reload_after,
            )
            .await;

        if translation.is_none() {
            let value = concept
                .coding
                .iter()
                .filter_map(|coding| coding.code.as_deref())
                .collect::<Vec<_>>()
                .join(", ");
            let value = if value.is_empty() {
                concept.text.clone().unwrap_or_default()
            } else {
                value
            };
            self.lookup_failed(element, &value, location);
        }
        translation
    }

    fn lookup_failed(&mut self, element: &str, value: &str, location: &LocationContext) {
        let map_name = format!("any {element} concept map for tenant '{}'", self.tenant);
        self.validation.push(ValidationIssue::failed_concept_map_lookup(
            location, value, &map_name,
        ));
    }

    pub fn into_validation(self) -> Validation {
        self.validation
    }
}

/// Runs precheck, normalization, concept mapping, structural transformation,
/// localization and validation for one [`ProfileShape`].
pub struct ProfilePipeline<S: ProfileShape> {
    shape: S,
    client: Arc<ConceptMapClient>,
    normalizer: Normalizer,
    localizer: Localizer,
}

impl<S: ProfileShape> ProfilePipeline<S> {
    pub fn new(shape: S, client: Arc<ConceptMapClient>, config: &PipelineConfig) -> Self {
        Self {
            shape,
            client,
            normalizer: Normalizer::new(),
            localizer: Localizer::with_ignored_fields(
                config.localization_ignored_fields.iter().cloned(),
            ),
        }
    }

    pub fn shape(&self) -> &S {
        &self.shape
    }

    /// Canonical identifiers and the profile claim, then the shape's edits.
    fn structural_transform(&self, resource: &S::Resource, tenant: &str) -> Option<S::Resource> {
        let id = resource.id()?.as_str();
        let scoped_id = localize_id(id, tenant).unwrap_or_else(|| id.to_string());

        let mut transformed = self.shape.transform_internal(resource, tenant)?;
        upsert_identifier(
            transformed.identifiers_mut(),
            Identifier::new(TENANT_ID_SYSTEM, tenant),
        );
        upsert_identifier(
            transformed.identifiers_mut(),
            Identifier::new(FHIR_ID_SYSTEM, scoped_id),
        );
        transformed
            .meta_mut()
            .get_or_insert_with(Meta::default)
            .profile = vec![self.shape.profile_url().to_string()];
        Some(transformed)
    }

    async fn run(
        &self,
        resource: &S::Resource,
        tenant: &str,
        force_reload_after: Option<DateTime<Utc>>,
    ) -> ProfileOutcome<S::Resource> {
        let resource_type = <S::Resource as DomainResource>::RESOURCE_TYPE;
        let mut validation = Validation::new();
        validation.check_not_null(
            resource.id(),
            &LocationContext::new(resource_type).field("id"),
        );

        let normalized = self.normalizer.normalize(resource).into_owned();

        let mut mapper =
            ConceptMapper::new(&self.client, tenant, resource_type, force_reload_after);
        let mapped = self.shape.map_concepts(normalized, &mut mapper).await;
        validation.merge(mapper.into_validation());

        let candidate = match self.structural_transform(&mapped, tenant) {
            Some(transformed) => {
                let localized = self.localizer.localize(&transformed, tenant).into_owned();
                validation.merge(validate_canonical(&localized, self.shape.profile_url()));
                validation.merge(self.shape.validate_shape(&localized));
                Some(localized)
            }
            None => {
                if !validation.has_errors() {
                    validation.push(
                        ValidationIssue::error(
                            codes::TRANSFORM_FAILED,
                            format!(
                                "{resource_type} could not be transformed to {}",
                                self.shape.name()
                            ),
                        )
                        .with_location(resource_type),
                    );
                }
                validation.merge(self.shape.validate_shape(resource));
                None
            }
        };

        if validation.has_errors() {
            tracing::info!(
                tenant,
                profile = self.shape.name(),
                errors = validation.error_count(),
                warnings = validation.warning_count(),
                "resource rejected"
            );
            return ProfileOutcome::rejected(validation);
        }

        tracing::debug!(
            tenant,
            profile = self.shape.name(),
            warnings = validation.warning_count(),
            "resource accepted"
        );
        match candidate {
            Some(resource) => ProfileOutcome::accepted(resource, validation),
            None => ProfileOutcome::rejected(validation),
        }
    }
}

#[async_trait]
impl<S: ProfileShape> ProfileDescriptor<S::Resource> for ProfilePipeline<S> {
    fn name(&self) -> &str {
        self.shape.name()
    }

    fn qualifies(&self, resource: &S::Resource) -> bool {
        self.shape.qualifies(resource)
    }

    fn validate(&self, resource: &S::Resource) -> Validation {
        let mut validation = validate_canonical(resource, self.shape.profile_url());
        validation.merge(self.shape.validate_shape(resource));
        validation
    }

    async fn transform(
        &self,
        resource: &S::Resource,
        tenant: &str,
        force_reload_after: Option<DateTime<Utc>>,
    ) -> ProfileOutcome<S::Resource> {
        self.run(resource, tenant, force_reload_after).await
    }
}

impl<S: ProfileShape + std::fmt::Debug> std::fmt::Debug for ProfilePipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilePipeline")
            .field("shape", &self.shape)
            .field("localizer", &self.localizer)
            .finish_non_exhaustive()
    }
}
