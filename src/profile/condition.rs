use std::sync::Arc;

use async_trait::async_trait;

use super::pipeline::{ConceptMapper, ProfilePipeline, ProfileShape};
use super::resolver::MultiProfileResolver;
use super::{profile_url, source_extension_url, upsert_extension, validate_reference_type};
use crate::conceptmap::ConceptMapClient;
use crate::core::config::PipelineConfig;
use crate::types::{Condition, DomainResource};
use crate::validation::{LocationContext, Validation, ValidationIssue, codes};

pub const CODE_ELEMENT: &str = "Condition.code";
pub const CATEGORY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-category";

const CLINICAL_STATUS_VALUES: &[&str] = &[
    "active",
    "recurrence",
    "relapse",
    "inactive",
    "remission",
    "resolved",
];

fn has_category(condition: &Condition, wanted: &[&str]) -> bool {
    condition
        .category
        .iter()
        .flat_map(|category| &category.coding)
        .any(|coding| {
            coding
                .system
                .as_deref()
                .is_none_or(|system| system == CATEGORY_SYSTEM)
                && coding
                    .code
                    .as_deref()
                    .is_some_and(|code| wanted.contains(&code))
        })
}

async fn map_condition_code(mut resource: Condition, mapper: &mut ConceptMapper<'_>) -> Condition {
    let Some(code) = resource.code.clone() else {
        return resource;
    };
    let location = LocationContext::new(Condition::RESOURCE_TYPE).field("code");
    if let Some(translation) = mapper.map_concept(CODE_ELEMENT, &code, &location).await {
        resource.code = Some(translation.concept);
        upsert_extension(&mut resource.extension, translation.extension);
    }
    resource
}

/// Checks shared by every Condition shape.
fn validate_condition(resource: &Condition, code_extension_url: &str) -> Validation {
    let mut validation = Validation::new();
    let location = LocationContext::new(Condition::RESOURCE_TYPE);

    validation.check_not_null(resource.code.as_ref(), &location.field("code"));

    let subject = location.field("subject");
    if let Some(reference) = &resource.subject {
        validate_reference_type(&mut validation, reference, &["Patient"], &subject, true);
    } else {
        validation.push(ValidationIssue::required_field(&subject));
    }

    validation.check_true(resource.find_extension(code_extension_url).is_some(), || {
        ValidationIssue::error(
            codes::MISSING_SOURCE_EXTENSION,
            format!("Extension '{code_extension_url}' with the tenant source code is required"),
        )
        .at(&location.field("extension"))
    });

    if let Some(clinical_status) = &resource.clinical_status {
        let status_location = location.field("clinicalStatus");
        let in_value_set = clinical_status.coding.iter().any(|coding| {
            coding
                .code
                .as_deref()
                .is_some_and(|code| CLINICAL_STATUS_VALUES.contains(&code))
        });
        validation.check_true(in_value_set, || {
            let value = clinical_status
                .coding
                .iter()
                .find_map(|coding| coding.code.clone())
                .or_else(|| clinical_status.text.clone())
                .unwrap_or_default();
            ValidationIssue::invalid_value_set(&status_location, &value)
        });
    }

    validation
}

/// Conditions recorded as the diagnosis of an encounter.
#[derive(Debug, Clone)]
pub struct ConditionEncounterDiagnosisShape {
    profile_url: String,
    code_extension_url: String,
}

impl ConditionEncounterDiagnosisShape {
    pub fn new() -> Self {
        Self {
            profile_url: profile_url("ConditionEncounterDiagnosis"),
            code_extension_url: source_extension_url(CODE_ELEMENT),
        }
    }
}

impl Default for ConditionEncounterDiagnosisShape {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileShape for ConditionEncounterDiagnosisShape {
    type Resource = Condition;

    fn name(&self) -> &str {
        "ConditionEncounterDiagnosis"
    }

    fn profile_url(&self) -> &str {
        &self.profile_url
    }

    fn qualifies(&self, resource: &Condition) -> bool {
        has_category(resource, &["encounter-diagnosis"])
    }

    async fn map_concepts(
        &self,
        resource: Condition,
        mapper: &mut ConceptMapper<'_>,
    ) -> Condition {
        map_condition_code(resource, mapper).await
    }

    fn validate_shape(&self, resource: &Condition) -> Validation {
        let mut validation = validate_condition(resource, &self.code_extension_url);
        let encounter = LocationContext::new(Condition::RESOURCE_TYPE).field("encounter");
        validation.check_true(resource.encounter.is_some(), || {
            ValidationIssue::warning(
                codes::RECOMMENDED_FIELD,
                "An encounter diagnosis should reference its encounter",
            )
            .at(&encounter)
        });
        validation
    }
}

/// Conditions kept on a problem list or recorded as health concerns.
#[derive(Debug, Clone)]
pub struct ConditionProblemsShape {
    profile_url: String,
    code_extension_url: String,
}

impl ConditionProblemsShape {
    pub fn new() -> Self {
        Self {
            profile_url: profile_url("ConditionProblemsHealthConcerns"),
            code_extension_url: source_extension_url(CODE_ELEMENT),
        }
    }
}

impl Default for ConditionProblemsShape {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileShape for ConditionProblemsShape {
    type Resource = Condition;

    fn name(&self) -> &str {
        "ConditionProblemsHealthConcerns"
    }

    fn profile_url(&self) -> &str {
        &self.profile_url
    }

    fn qualifies(&self, resource: &Condition) -> bool {
        has_category(resource, &["problem-list-item", "health-concern"])
    }

    async fn map_concepts(
        &self,
        resource: Condition,
        mapper: &mut ConceptMapper<'_>,
    ) -> Condition {
        map_condition_code(resource, mapper).await
    }

    fn validate_shape(&self, resource: &Condition) -> Validation {
        validate_condition(resource, &self.code_extension_url)
    }
}

/// Resolver choosing between the Condition shapes by category.
pub fn condition_resolver(
    client: Arc<ConceptMapClient>,
    config: &PipelineConfig,
) -> MultiProfileResolver<Condition> {
    MultiProfileResolver::new(
        "Condition",
        vec![
            Arc::new(ProfilePipeline::new(
                ConditionEncounterDiagnosisShape::new(),
                Arc::clone(&client),
                config,
            )),
            Arc::new(ProfilePipeline::new(
                ConditionProblemsShape::new(),
                client,
                config,
            )),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeableConcept, Coding, DynamicValue, Extension, Reference};

    fn condition(category: &str) -> Condition {
        Condition {
            category: vec![CodeableConcept::from_coding(Coding::new(
                CATEGORY_SYSTEM,
                category,
            ))],
            code: Some(CodeableConcept::from_coding(Coding::new(
                "http://snomed.info/sct",
                "44054006",
            ))),
            subject: Some(Reference::to("Patient/abc-p1")),
            extension: vec![Extension::new(
                source_extension_url(CODE_ELEMENT),
                DynamicValue::CodeableConcept(CodeableConcept::from_text("diabetes")),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_qualification_by_category() {
        let diagnosis = ConditionEncounterDiagnosisShape::new();
        let problems = ConditionProblemsShape::new();

        let encounter_diagnosis = condition("encounter-diagnosis");
        assert!(diagnosis.qualifies(&encounter_diagnosis));
        assert!(!problems.qualifies(&encounter_diagnosis));

        let concern = condition("health-concern");
        assert!(!diagnosis.qualifies(&concern));
        assert!(problems.qualifies(&concern));

        assert!(!diagnosis.qualifies(&Condition::default()));
        assert!(!problems.qualifies(&Condition::default()));
    }

    #[test]
    fn test_encounter_diagnosis_without_encounter_warns() {
        let validation =
            ConditionEncounterDiagnosisShape::new().validate_shape(&condition("encounter-diagnosis"));
        assert!(!validation.has_errors());
        assert_eq!(validation.warning_count(), 1);
    }

    #[test]
    fn test_subject_must_be_patient() {
        let mut resource = condition("problem-list-item");
        resource.subject = Some(Reference::to("Group/g1"));
        let validation = ConditionProblemsShape::new().validate_shape(&resource);
        assert!(validation.has_issue(codes::INVALID_REFERENCE_TYPE));
        assert!(validation.has_errors());

        resource.subject = None;
        let validation = ConditionProblemsShape::new().validate_shape(&resource);
        assert!(validation.has_issue(codes::REQUIRED_FIELD));
    }

    #[test]
    fn test_clinical_status_value_set() {
        let mut resource = condition("problem-list-item");
        resource.clinical_status = Some(CodeableConcept::from_coding(Coding::new(
            "http://terminology.hl7.org/CodeSystem/condition-clinical",
            "active",
        )));
        assert!(ConditionProblemsShape::new().validate_shape(&resource).is_empty());

        resource.clinical_status = Some(CodeableConcept::from_text("ongoing"));
        let validation = ConditionProblemsShape::new().validate_shape(&resource);
        assert!(validation.has_issue(codes::INVALID_VALUE_SET));
    }
}
