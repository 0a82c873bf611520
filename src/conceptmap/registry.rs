//! Wire formats of the concept map manifest and mapping documents, and the
//! registry entries compiled from them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::transform::systems::{normalize_system, tenant_agnostic_system};
use crate::types::Coding;

/// One entry of the manifest object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub registry_uuid: String,
    pub data_element: String,
    pub filename: String,
    pub version: String,
    pub source_extension_url: String,
    pub resource_type: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl ManifestEntry {
    /// Parse the manifest object. Entries whose source extension URL is not an
    /// absolute URL are dropped with a warning.
    pub fn parse_manifest(json: &str) -> Result<Vec<ManifestEntry>> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(json)?;
        Ok(entries
            .into_iter()
            .filter(|entry| match entry.source_extension() {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(
                        registry_uuid = %entry.registry_uuid,
                        url = %entry.source_extension_url,
                        error = %e,
                        "skipping manifest entry with invalid source extension url"
                    );
                    false
                }
            })
            .collect())
    }

    pub fn source_extension(&self) -> Result<Url> {
        Ok(Url::parse(&self.source_extension_url)?)
    }
}

/// A mapping document: groups of source codes mapped into one target system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub group: Vec<MappingGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingGroup {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub element: Vec<MappingElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingElement {
    pub code: String,
    #[serde(default)]
    pub target: Vec<MappingTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTarget {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub code: String,
    pub system: String,
}

impl SourceKey {
    pub fn new(code: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: system.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCoding {
    pub code: String,
    pub system: Option<String>,
    pub display: Option<String>,
}

impl TargetCoding {
    pub fn to_coding(&self) -> Coding {
        Coding {
            system: self.system.clone(),
            code: Some(self.code.clone()),
            display: self.display.clone(),
            ..Default::default()
        }
    }
}

/// Source key to target lookup table compiled from a mapping document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledMap {
    targets: HashMap<SourceKey, TargetCoding>,
}

impl CompiledMap {
    /// Compile `document`. Source systems are keyed in their tenant-agnostic
    /// form for `tenant`, or only canonicalized for universal entries.
    ///
    /// Elements without targets are skipped. When an element lists several
    /// targets only the first is kept.
    pub fn compile(document: &MappingDocument, tenant: Option<&str>) -> Self {
        let mut targets = HashMap::new();
        for group in &document.group {
            let source = group.source.as_deref().unwrap_or_default();
            let source = match tenant {
                Some(tenant) => tenant_agnostic_system(source, tenant),
                None => normalize_system(source).to_string(),
            };

            for element in &group.element {
                let Some(first) = element.target.first() else {
                    continue;
                };
                if element.target.len() > 1 {
                    tracing::debug!(
                        code = %element.code,
                        targets = element.target.len(),
                        "mapping element declares several targets, keeping the first"
                    );
                }
                targets
                    .entry(SourceKey::new(element.code.clone(), source.clone()))
                    .or_insert_with(|| TargetCoding {
                        code: first.code.clone(),
                        system: group.target.clone(),
                        display: first.display.clone(),
                    });
            }
        }
        Self { targets }
    }

    pub fn get(&self, key: &SourceKey) -> Option<&TargetCoding> {
        self.targets.get(key)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Manifest metadata plus the compiled map, once one was built, and the
/// manifest version it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub uuid: String,
    pub data_element: String,
    pub source_file: String,
    pub version: String,
    pub source_extension_url: String,
    pub resource_type: String,
    pub tenant_id: Option<String>,
    pub compiled: Option<Arc<CompiledMap>>,
    pub compiled_version: Option<String>,
}

impl RegistryEntry {
    pub fn from_manifest(entry: ManifestEntry) -> Self {
        Self {
            uuid: entry.registry_uuid,
            data_element: entry.data_element,
            source_file: entry.filename,
            version: entry.version,
            source_extension_url: entry.source_extension_url,
            resource_type: entry.resource_type,
            tenant_id: entry.tenant_id,
            compiled: None,
            compiled_version: None,
        }
    }

    pub fn with_compiled(mut self, compiled: CompiledMap) -> Self {
        self.compiled = Some(Arc::new(compiled));
        self.compiled_version = Some(self.version.clone());
        self
    }

    /// Carry over the compiled map of `prior`, keeping the version it was
    /// built from.
    pub fn with_prior(mut self, prior: &RegistryEntry) -> Self {
        self.compiled = prior.compiled.clone();
        self.compiled_version = prior.compiled_version.clone();
        self
    }

    /// Whether the compiled map is missing or was built from another
    /// manifest version.
    pub fn is_stale(&self) -> bool {
        self.compiled.is_none() || self.compiled_version.as_deref() != Some(self.version.as_str())
    }

    /// Universal entries serve every tenant.
    pub fn is_relevant_to(&self, tenant: &str) -> bool {
        self.tenant_id.as_deref().is_none_or(|owner| owner == tenant)
    }

    pub fn matches(&self, tenant: &str, resource_type: &str, element: &str) -> bool {
        self.is_relevant_to(tenant)
            && self.resource_type == resource_type
            && self.data_element == element
    }

    /// Name the lookup failure message refers to.
    pub fn display_name(&self) -> &str {
        &self.source_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_document() -> MappingDocument {
        serde_json::from_value(json!({
            "group": [{
                "source": "http://octofhir.io/fhir/CodeSystem/abc/AppointmentStatus",
                "target": "http://hl7.org/fhir/appointmentstatus",
                "element": [
                    {"code": "NS", "target": [{"code": "noshow", "display": "No Show"}, {"code": "cancelled"}]},
                    {"code": "BK", "target": [{"code": "booked"}]},
                    {"code": "XX", "target": []}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_compile_keeps_first_target_and_skips_empty() {
        let compiled = CompiledMap::compile(&status_document(), Some("abc"));
        assert_eq!(compiled.len(), 2);

        let key = SourceKey::new("NS", "http://octofhir.io/fhir/CodeSystem/AppointmentStatus");
        let target = compiled.get(&key).unwrap();
        assert_eq!(target.code, "noshow");
        assert_eq!(target.display.as_deref(), Some("No Show"));
        assert_eq!(
            target.system.as_deref(),
            Some("http://hl7.org/fhir/appointmentstatus")
        );
        assert!(
            compiled
                .get(&SourceKey::new(
                    "XX",
                    "http://octofhir.io/fhir/CodeSystem/AppointmentStatus"
                ))
                .is_none()
        );
    }

    #[test]
    fn test_compile_universal_canonicalizes_oid_source() {
        let document: MappingDocument = serde_json::from_value(json!({
            "group": [{
                "source": "urn:oid:2.16.840.1.113883.6.90",
                "target": "http://snomed.info/sct",
                "element": [{"code": "E11.9", "target": [{"code": "44054006"}]}]
            }]
        }))
        .unwrap();
        let compiled = CompiledMap::compile(&document, None);
        let target = compiled
            .get(&SourceKey::new("E11.9", "http://hl7.org/fhir/sid/icd-10-cm"))
            .unwrap();
        assert_eq!(target.to_coding(), Coding::new("http://snomed.info/sct", "44054006"));
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = json!([
            {
                "registry_uuid": "u1",
                "data_element": "Appointment.status",
                "filename": "AppointmentStatus.json",
                "version": "1",
                "source_extension_url": "http://octofhir.io/fhir/StructureDefinition/tenant-sourceAppointmentStatus",
                "resource_type": "Appointment",
                "tenant_id": null
            },
            {
                "registry_uuid": "u2",
                "data_element": "Appointment.status",
                "filename": "Broken.json",
                "version": "1",
                "source_extension_url": "not a url",
                "resource_type": "Appointment"
            }
        ]);
        let entries = ManifestEntry::parse_manifest(&manifest.to_string()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tenant_id, None);

        let entry = RegistryEntry::from_manifest(entries[0].clone());
        assert!(entry.is_relevant_to("anyone"));
        assert!(entry.matches("abc", "Appointment", "Appointment.status"));
        assert!(!entry.matches("abc", "Patient", "Appointment.status"));
        assert!(entry.compiled.is_none());
    }

    #[test]
    fn test_tenant_entry_relevance() {
        let entry = RegistryEntry {
            uuid: "u1".to_string(),
            data_element: "Appointment.status".to_string(),
            source_file: "AppointmentStatus.json".to_string(),
            version: "1".to_string(),
            source_extension_url: "http://example.org/ext".to_string(),
            resource_type: "Appointment".to_string(),
            tenant_id: Some("abc".to_string()),
            compiled: None,
            compiled_version: None,
        };
        assert!(entry.is_relevant_to("abc"));
        assert!(!entry.is_relevant_to("xyz"));
    }

    #[test]
    fn test_carried_map_keeps_its_build_version() {
        let manifest = json!([{
            "registry_uuid": "u1",
            "data_element": "Appointment.status",
            "filename": "AppointmentStatus.json",
            "version": "1",
            "source_extension_url": "http://example.org/ext",
            "resource_type": "Appointment",
            "tenant_id": "xyz"
        }]);
        let mut entries = ManifestEntry::parse_manifest(&manifest.to_string()).unwrap();
        let v1 = RegistryEntry::from_manifest(entries[0].clone());
        assert!(v1.is_stale());

        let v1 = v1.with_compiled(CompiledMap::compile(&status_document(), Some("xyz")));
        assert!(!v1.is_stale());
        assert_eq!(v1.compiled_version.as_deref(), Some("1"));

        entries[0].version = "2".to_string();
        let v2 = RegistryEntry::from_manifest(entries.remove(0)).with_prior(&v1);
        assert_eq!(v2.version, "2");
        assert_eq!(v2.compiled_version.as_deref(), Some("1"));
        assert!(v2.is_stale());
    }

    #[test]
    fn test_source_extension_parse_error() {
        let entry = ManifestEntry {
            registry_uuid: "u1".to_string(),
            data_element: "Appointment.status".to_string(),
            filename: "AppointmentStatus.json".to_string(),
            version: "1".to_string(),
            source_extension_url: "tenant-sourceAppointmentStatus".to_string(),
            resource_type: "Appointment".to_string(),
            tenant_id: None,
        };
        let err = entry.source_extension().unwrap_err();
        assert!(matches!(err, crate::error::InteropError::UrlParse(_)));
    }
}
