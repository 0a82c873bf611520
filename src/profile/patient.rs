use async_trait::async_trait;

use super::pipeline::ProfileShape;
use super::profile_url;
use crate::types::{DomainResource, Patient};
use crate::validation::{LocationContext, Validation, ValidationIssue, codes};

const GENDER_VALUES: &[&str] = &["male", "female", "other", "unknown"];

/// Canonical Patient. Patients carry no tenant-coded elements.
#[derive(Debug, Clone)]
pub struct PatientShape {
    profile_url: String,
}

impl PatientShape {
    pub fn new() -> Self {
        Self {
            profile_url: profile_url("Patient"),
        }
    }
}

impl Default for PatientShape {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileShape for PatientShape {
    type Resource = Patient;

    fn name(&self) -> &str {
        "Patient"
    }

    fn profile_url(&self) -> &str {
        &self.profile_url
    }

    fn validate_shape(&self, resource: &Patient) -> Validation {
        let mut validation = Validation::new();
        let location = LocationContext::new(Patient::RESOURCE_TYPE);

        validation.check_not_empty(&resource.name, &location.field("name"));

        if let Some(gender) = resource.gender.as_deref() {
            validation.check_true(GENDER_VALUES.contains(&gender), || {
                ValidationIssue::invalid_value_set(&location.field("gender"), gender)
            });
        }

        let birth_date = location.field("birthDate");
        validation.check_true(resource.birth_date.is_some(), || {
            ValidationIssue::warning(
                codes::RECOMMENDED_FIELD,
                format!("{birth_date} should be provided"),
            )
            .at(&birth_date)
        });

        validation
    }
}
