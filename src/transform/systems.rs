//! Legacy code system identifiers and their canonical URIs.
//!
//! Source systems frequently send HL7 OIDs (bare or as `urn:oid:` URNs) where
//! FHIR expects the canonical `http` URI of the code system. The same table is
//! used when normalizing resources and when keying concept map lookups, so a
//! lookup always sees the system the normalizer would have produced.

/// Base URI for tenant-specific source code systems. A tenant's local codes for
/// an element live under `<base>/<tenant>/<ElementName>`.
pub const TENANT_SOURCE_SYSTEM_BASE: &str = "http://octofhir.io/fhir/CodeSystem";

const OID_URN_PREFIX: &str = "urn:oid:";

/// (OID, canonical URI)
const LEGACY_SYSTEMS: &[(&str, &str)] = &[
    ("2.16.840.1.113883.6.96", "http://snomed.info/sct"),
    ("2.16.840.1.113883.6.1", "http://loinc.org"),
    ("2.16.840.1.113883.6.88", "http://www.nlm.nih.gov/research/umls/rxnorm"),
    ("2.16.840.1.113883.6.90", "http://hl7.org/fhir/sid/icd-10-cm"),
    ("2.16.840.1.113883.6.103", "http://hl7.org/fhir/sid/icd-9-cm"),
    ("2.16.840.1.113883.6.12", "http://www.ama-assn.org/go/cpt"),
    ("2.16.840.1.113883.6.69", "http://hl7.org/fhir/sid/ndc"),
    ("2.16.840.1.113883.12.292", "http://hl7.org/fhir/sid/cvx"),
    ("2.16.840.1.113883.4.6", "http://hl7.org/fhir/sid/us-npi"),
    ("2.16.840.1.113883.4.1", "http://hl7.org/fhir/sid/us-ssn"),
];

/// Canonical URI for a legacy system identifier, or `None` if the system is
/// not a known legacy identifier.
pub fn canonical_system(system: &str) -> Option<&'static str> {
    let oid = system.strip_prefix(OID_URN_PREFIX).unwrap_or(system);
    LEGACY_SYSTEMS
        .iter()
        .find(|(legacy, _)| *legacy == oid)
        .map(|(_, canonical)| *canonical)
}

/// System after canonicalization; unknown systems pass through.
pub fn normalize_system(system: &str) -> &str {
    canonical_system(system).unwrap_or(system)
}

/// Source system URI a tenant's local codes for `element` (e.g.
/// `Appointment.status`) are reported under.
pub fn tenant_source_system(tenant: &str, element: &str) -> String {
    format!(
        "{TENANT_SOURCE_SYSTEM_BASE}/{tenant}/{}",
        element_system_name(element)
    )
}

/// Tenant-agnostic, canonical form of `system` used as a concept map key.
///
/// Legacy identifiers are canonicalized, and tenant source systems lose their
/// tenant segment so one mapping document can serve every tenant.
pub fn tenant_agnostic_system(system: &str, tenant: &str) -> String {
    let system = normalize_system(system);
    let tenant_prefix = format!("{TENANT_SOURCE_SYSTEM_BASE}/{tenant}/");
    match system.strip_prefix(&tenant_prefix) {
        Some(rest) => format!("{TENANT_SOURCE_SYSTEM_BASE}/{rest}"),
        None => system.to_string(),
    }
}

/// `Appointment.status` -> `AppointmentStatus`
pub(crate) fn element_system_name(element: &str) -> String {
    element
        .split('.')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
