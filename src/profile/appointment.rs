use async_trait::async_trait;

use super::pipeline::{ConceptMapper, ProfileShape};
use super::{profile_url, source_extension_url, upsert_extension, validate_reference_type};
use crate::types::{Appointment, DomainResource};
use crate::validation::{LocationContext, Validation, ValidationIssue, codes};

pub const STATUS_ELEMENT: &str = "Appointment.status";

const STATUS_VALUES: &[&str] = &[
    "proposed",
    "pending",
    "booked",
    "arrived",
    "fulfilled",
    "cancelled",
    "noshow",
    "entered-in-error",
    "checked-in",
    "waitlist",
];

/// Statuses that may omit start and end.
const UNSCHEDULED_STATUSES: &[&str] = &["proposed", "cancelled", "waitlist"];

const ACTOR_TYPES: &[&str] = &[
    "Patient",
    "Practitioner",
    "PractitionerRole",
    "RelatedPerson",
    "Device",
    "HealthcareService",
    "Location",
];

/// Canonical Appointment. Maps the tenant's status codes.
#[derive(Debug, Clone)]
pub struct AppointmentShape {
    profile_url: String,
    status_extension_url: String,
}

impl AppointmentShape {
    pub fn new() -> Self {
        Self {
            profile_url: profile_url("Appointment"),
            status_extension_url: source_extension_url(STATUS_ELEMENT),
        }
    }
}

impl Default for AppointmentShape {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileShape for AppointmentShape {
    type Resource = Appointment;

    fn name(&self) -> &str {
        "Appointment"
    }

    fn profile_url(&self) -> &str {
        &self.profile_url
    }

    async fn map_concepts(
        &self,
        mut resource: Appointment,
        mapper: &mut ConceptMapper<'_>,
    ) -> Appointment {
        let Some(status) = resource.status.clone() else {
            return resource;
        };
        let location = LocationContext::new(Appointment::RESOURCE_TYPE).field("status");
        if let Some((code, extension)) = mapper.map_code(STATUS_ELEMENT, &status, &location).await
        {
            resource.status = Some(code);
            upsert_extension(&mut resource.extension, extension);
        }
        resource
    }

    fn validate_shape(&self, resource: &Appointment) -> Validation {
        let mut validation = Validation::new();
        let location = LocationContext::new(Appointment::RESOURCE_TYPE);

        let status_location = location.field("status");
        if validation.check_not_null(resource.status.as_ref(), &status_location) {
            let status = resource.status.as_deref().unwrap_or_default();
            validation.check_true(STATUS_VALUES.contains(&status), || {
                ValidationIssue::invalid_value_set(&status_location, status)
            });
        }

        validation.check_true(
            resource.find_extension(&self.status_extension_url).is_some(),
            || {
                ValidationIssue::error(
                    codes::MISSING_SOURCE_EXTENSION,
                    format!(
                        "Extension '{}' with the tenant source status is required",
                        self.status_extension_url
                    ),
                )
                .at(&location.field("extension"))
            },
        );

        let participants = location.field("participant");
        validation.check_not_empty(&resource.participant, &participants);
        for (index, participant) in resource.participant.iter().enumerate() {
            let participant_location = participants.index(index);
            validation.check_true(
                !participant.type_.is_empty() || participant.actor.is_some(),
                || {
                    ValidationIssue::error(
                        codes::INVARIANT,
                        "app-1: Either the type or actor on the participant SHALL be specified",
                    )
                    .at(&participant_location)
                },
            );
            if let Some(actor) = &participant.actor {
                validate_reference_type(
                    &mut validation,
                    actor,
                    ACTOR_TYPES,
                    &participant_location.field("actor"),
                    false,
                );
            }
        }

        let unscheduled = resource
            .status
            .as_deref()
            .is_some_and(|status| UNSCHEDULED_STATUSES.contains(&status));
        validation.check_true(
            unscheduled || (resource.start.is_some() && resource.end.is_some()),
            || {
                ValidationIssue::error(
                    codes::INVARIANT,
                    "app-3: Only proposed or cancelled appointments can be missing start/end dates",
                )
                .at(&location)
            },
        );

        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppointmentParticipant, Coding, DynamicValue, Extension, Reference};

    fn scheduled_appointment() -> Appointment {
        let shape = AppointmentShape::new();
        Appointment {
            status: Some("booked".to_string()),
            start: Some("2024-05-01T09:00:00Z".to_string()),
            end: Some("2024-05-01T09:30:00Z".to_string()),
            extension: vec![Extension::new(
                shape.status_extension_url.clone(),
                DynamicValue::Coding(Coding::new("http://example.org", "BK")),
            )],
            participant: vec![AppointmentParticipant {
                actor: Some(Reference::to("Patient/p1")),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_appointment() {
        let validation = AppointmentShape::new().validate_shape(&scheduled_appointment());
        assert!(validation.is_empty(), "{:?}", validation.issues());
    }

    #[test]
    fn test_status_outside_value_set() {
        let mut appointment = scheduled_appointment();
        appointment.status = Some("NS".to_string());
        let validation = AppointmentShape::new().validate_shape(&appointment);
        assert!(validation.has_issue(codes::INVALID_VALUE_SET));
    }

    #[test]
    fn test_missing_dates_allowed_only_when_unscheduled() {
        let mut appointment = scheduled_appointment();
        appointment.start = None;
        let validation = AppointmentShape::new().validate_shape(&appointment);
        assert!(validation.has_issue(codes::INVARIANT));

        appointment.status = Some("proposed".to_string());
        appointment.end = None;
        let validation = AppointmentShape::new().validate_shape(&appointment);
        assert!(validation.is_empty(), "{:?}", validation.issues());
    }

    #[test]
    fn test_participant_rules() {
        let mut appointment = scheduled_appointment();
        appointment.participant = vec![
            AppointmentParticipant::default(),
            AppointmentParticipant {
                actor: Some(Reference::to("Group/g1")),
                ..Default::default()
            },
        ];
        let validation = AppointmentShape::new().validate_shape(&appointment);
        assert_eq!(validation.error_count(), 1);
        assert_eq!(validation.warning_count(), 1);
        assert_eq!(
            validation.issues()[0].location.as_deref(),
            Some("Appointment.participant[0]")
        );

        appointment.participant.clear();
        let validation = AppointmentShape::new().validate_shape(&appointment);
        assert!(validation.has_issue(codes::REQUIRED_FIELD));
    }
}
