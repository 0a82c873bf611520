//! Resources handled by the pipeline and the [`DomainResource`] capability the
//! pipeline is written against.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::datatypes::{
    CodeableConcept, ContactPoint, Extension, HumanName, Id, Identifier, Meta, Period, Reference,
};
use crate::transform::{Transform, transform_record, transform_union};

/// Common surface of every resource type the pipeline can transform.
pub trait DomainResource:
    Transform + Serialize + Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static
{
    const RESOURCE_TYPE: &'static str;

    fn id(&self) -> Option<&Id>;
    fn meta(&self) -> Option<&Meta>;
    fn meta_mut(&mut self) -> &mut Option<Meta>;
    fn identifiers(&self) -> &[Identifier];
    fn identifiers_mut(&mut self) -> &mut Vec<Identifier>;
    fn extensions(&self) -> &[Extension];
    fn extensions_mut(&mut self) -> &mut Vec<Extension>;

    fn resource_type(&self) -> &'static str {
        Self::RESOURCE_TYPE
    }

    /// FHIR JSON of the resource including its `resourceType`.
    fn to_json(&self) -> serde_json::Result<Value> {
        let mut json = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut json {
            map.insert(
                "resourceType".to_string(),
                Value::String(Self::RESOURCE_TYPE.to_string()),
            );
        }
        Ok(json)
    }

    fn find_extension(&self, url: &str) -> Option<&Extension> {
        self.extensions().iter().find(|extension| extension.url == url)
    }

    fn find_identifier(&self, system: &str) -> Option<&Identifier> {
        self.identifiers()
            .iter()
            .find(|identifier| identifier.system.as_deref() == Some(system))
    }
}

macro_rules! domain_resource {
    ($ty:ident) => {
        impl DomainResource for $ty {
            const RESOURCE_TYPE: &'static str = stringify!($ty);

            fn id(&self) -> Option<&Id> {
                self.id.as_ref()
            }

            fn meta(&self) -> Option<&Meta> {
                self.meta.as_ref()
            }

            fn meta_mut(&mut self) -> &mut Option<Meta> {
                &mut self.meta
            }

            fn identifiers(&self) -> &[Identifier] {
                &self.identifier
            }

            fn identifiers_mut(&mut self) -> &mut Vec<Identifier> {
                &mut self.identifier
            }

            fn extensions(&self) -> &[Extension] {
                &self.extension
            }

            fn extensions_mut(&mut self) -> &mut Vec<Extension> {
                &mut self.extension
            }
        }
    };
}

/// Any resource that can appear in `contained`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Appointment(Box<Appointment>),
    Condition(Box<Condition>),
    Patient(Box<Patient>),
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Appointment(_) => Appointment::RESOURCE_TYPE,
            Resource::Condition(_) => Condition::RESOURCE_TYPE,
            Resource::Patient(_) => Patient::RESOURCE_TYPE,
        }
    }

    pub fn id(&self) -> Option<&Id> {
        match self {
            Resource::Appointment(resource) => resource.id(),
            Resource::Condition(resource) => resource.id(),
            Resource::Patient(resource) => resource.id(),
        }
    }
}

transform_union!(Resource {
    Appointment,
    Condition,
    Patient,
});

/// A booking of a healthcare event among patient(s), practitioner(s), related
/// person(s) and/or device(s) for a specific date/time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelation_reason: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_category: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_type: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialty: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_reference: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slot: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<AppointmentParticipant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_period: Vec<Period>,
}

domain_resource!(Appointment);

transform_record!(Appointment {
    id,
    meta,
    contained,
    extension,
    identifier,
    status,
    cancelation_reason,
    service_category,
    service_type,
    specialty,
    appointment_type,
    reason_code,
    reason_reference,
    priority,
    description,
    start,
    end,
    minutes_duration,
    slot,
    created,
    comment,
    participant,
    requested_period,
});

/// Participants involved in an appointment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppointmentParticipant {
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

transform_record!(AppointmentParticipant { type_, actor, required, status, period });

/// Demographics and other administrative information about an individual
/// receiving care.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_practitioner: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,
}

domain_resource!(Patient);

transform_record!(Patient {
    id,
    meta,
    contained,
    extension,
    identifier,
    active,
    name,
    telecom,
    gender,
    birth_date,
    marital_status,
    general_practitioner,
    managing_organization,
});

/// A clinical condition, problem, diagnosis, or other event, situation, issue,
/// or clinical concept that has risen to a level of concern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_site: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorder: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asserter: Option<Reference>,
}

domain_resource!(Condition);

transform_record!(Condition {
    id,
    meta,
    contained,
    extension,
    identifier,
    clinical_status,
    verification_status,
    category,
    severity,
    code,
    body_site,
    subject,
    encounter,
    onset_date_time,
    recorded_date,
    recorder,
    asserter,
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appointment_from_fhir_json() {
        let appointment: Appointment = serde_json::from_value(json!({
            "resourceType": "Appointment",
            "id": "12345",
            "status": "booked",
            "minutesDuration": 15,
            "participant": [
                {"actor": {"reference": "Patient/p1"}, "status": "accepted"}
            ]
        }))
        .unwrap();

        assert_eq!(appointment.id, Some(Id::new("12345")));
        assert_eq!(appointment.minutes_duration, Some(15));
        assert_eq!(appointment.participant.len(), 1);
    }

    #[test]
    fn test_to_json_includes_resource_type() {
        let patient = Patient {
            id: Some(Id::new("p1")),
            ..Default::default()
        };
        let json = patient.to_json().unwrap();
        assert_eq!(json["resourceType"], "Patient");
        assert_eq!(json["id"], "p1");
    }

    #[test]
    fn test_contained_resources_are_tagged() {
        let condition: Condition = serde_json::from_value(json!({
            "resourceType": "Condition",
            "id": "c1",
            "contained": [{"resourceType": "Patient", "id": "inner"}]
        }))
        .unwrap();

        assert_eq!(condition.contained.len(), 1);
        assert_eq!(condition.contained[0].resource_type(), "Patient");
        assert_eq!(condition.contained[0].id(), Some(&Id::new("inner")));
    }
}
