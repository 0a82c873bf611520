use std::sync::Arc;

use async_trait::async_trait;
use octofhir_interop::profile::source_extension_url;
use octofhir_interop::validation::{NewResource, TrackedResource};
use octofhir_interop::*;
use serde_json::{Value, json};

#[allow(dead_code)]
pub const TENANT: &str = "abc";
#[allow(dead_code)]
pub const MANIFEST: &str = "DataNormalizationRegistry.json";
#[allow(dead_code)]
pub const STATUS_DOCUMENT: &str = "AppointmentStatus.json";
#[allow(dead_code)]
pub const CONDITION_DOCUMENT: &str = "ConditionCode.json";
#[allow(dead_code)]
pub const APPOINTMENT_STATUS_SYSTEM: &str = "http://hl7.org/fhir/appointmentstatus";

#[allow(dead_code)]
pub fn manifest_entry(
    uuid: &str,
    element: &str,
    filename: &str,
    version: &str,
    tenant: Option<&str>,
) -> Value {
    let resource_type = element.split('.').next().unwrap_or_default();
    json!({
        "registry_uuid": uuid,
        "data_element": element,
        "filename": filename,
        "version": version,
        "source_extension_url": source_extension_url(element),
        "resource_type": resource_type,
        "tenant_id": tenant,
    })
}

#[allow(dead_code)]
pub fn status_entry(version: &str) -> Value {
    manifest_entry("status-map", "Appointment.status", STATUS_DOCUMENT, version, Some(TENANT))
}

#[allow(dead_code)]
pub fn condition_entry(version: &str) -> Value {
    manifest_entry("condition-map", "Condition.code", CONDITION_DOCUMENT, version, None)
}

#[allow(dead_code)]
pub fn status_document(booked_target: &str) -> Value {
    json!({
        "group": [{
            "source": "http://octofhir.io/fhir/CodeSystem/AppointmentStatus",
            "target": APPOINTMENT_STATUS_SYSTEM,
            "element": [
                {"code": "BK", "target": [{"code": booked_target}]},
                {"code": "NS", "target": [{"code": "noshow", "display": "No Show"}]},
                {"code": "CX", "target": [{"code": "cancelled"}]},
                {"code": "PR", "target": [{"code": "proposed"}]}
            ]
        }]
    })
}

#[allow(dead_code)]
pub fn condition_document() -> Value {
    json!({
        "group": [{
            "source": "http://hl7.org/fhir/sid/icd-10-cm",
            "target": "http://snomed.info/sct",
            "element": [
                {"code": "E11.9", "target": [{"code": "44054006", "display": "Diabetes mellitus type 2"}]},
                {"code": "I10", "target": [{"code": "38341003", "display": "Hypertensive disorder"}]}
            ]
        }]
    })
}

/// Store holding the manifest and both mapping documents.
#[allow(dead_code)]
pub async fn seeded_store() -> MemoryObjectStore {
    let store = MemoryObjectStore::new();
    store
        .put_json(MANIFEST, &json!([status_entry("1"), condition_entry("1")]))
        .await
        .unwrap();
    store
        .put_json(STATUS_DOCUMENT, &status_document("booked"))
        .await
        .unwrap();
    store
        .put_json(CONDITION_DOCUMENT, &condition_document())
        .await
        .unwrap();
    store
}

#[allow(dead_code)]
pub fn client_for(store: &MemoryObjectStore) -> Arc<ConceptMapClient> {
    Arc::new(ConceptMapClient::new(
        Arc::new(store.clone()),
        ConceptMapConfig::default(),
    ))
}

#[allow(dead_code)]
pub fn appointment_json(status: &str) -> Value {
    json!({
        "resourceType": "Appointment",
        "id": "a1",
        "status": status,
        "start": "2024-05-01T09:00:00Z",
        "end": "2024-05-01T09:30:00Z",
        "participant": [{
            "type": [{
                "coding": [{
                    "system": "urn:oid:2.16.840.1.113883.6.96",
                    "code": "PPRF",
                    "display": "Primary performer"
                }]
            }],
            "actor": {"reference": "https://ehr.example.org/fhir/Practitioner/pr1"},
            "status": "accepted"
        }, {
            "actor": {"reference": "Patient/p1"},
            "status": "accepted"
        }]
    })
}

#[allow(dead_code)]
pub fn appointment(status: &str) -> Appointment {
    serde_json::from_value(appointment_json(status)).unwrap()
}

#[allow(dead_code)]
pub fn patient() -> Patient {
    serde_json::from_value(json!({
        "resourceType": "Patient",
        "id": "p1",
        "name": [{"family": "Chalmers", "given": ["Peter", "James"]}],
        "gender": "male",
        "birthDate": "1974-12-25",
        "managingOrganization": {"reference": "Organization/o1"}
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn condition(category: &str) -> Condition {
    serde_json::from_value(json!({
        "resourceType": "Condition",
        "id": "c1",
        "category": [{
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/condition-category",
                "code": category
            }]
        }],
        "code": {
            "coding": [{"system": "urn:oid:2.16.840.1.113883.6.90", "code": "E11.9", "display": "Type 2 diabetes"}]
        },
        "clinicalStatus": {
            "coding": [{"system": "http://terminology.hl7.org/CodeSystem/condition-clinical", "code": "active"}]
        },
        "subject": {"reference": "Patient/p1"}
    }))
    .unwrap()
}

/// Tracker that rejects every submission.
#[allow(dead_code)]
pub struct UnavailableTracker;

#[async_trait]
impl IssueTracker for UnavailableTracker {
    async fn add_resource(&self, _resource: NewResource) -> Result<TrackedResource> {
        Err(InteropError::store("issue tracker unavailable"))
    }
}
