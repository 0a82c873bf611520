//! FHIR datatypes shared across resources.
//!
//! Only the subset of the FHIR datatype catalogue the pipeline works with is
//! modelled. JSON names follow the FHIR JSON representation.

use serde::{Deserialize, Serialize};

use crate::transform::{transform_record, transform_union, Change, Transform, TransformContext, Visitor};

/// Logical id of a resource. Tenant localization rewrites these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Transform for Id {
    fn transform<V: Visitor + ?Sized>(
        &self,
        visitor: &V,
        cx: &TransformContext<'_>,
    ) -> Change<Self> {
        visitor.visit_id(self, cx)
    }
}

/// A reference to a code defined by a terminology system
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_selected: Option<bool>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_user_selected(mut self, user_selected: bool) -> Self {
        self.user_selected = Some(user_selected);
        self
    }

    /// Whether this coding carries the given system and code.
    pub fn is(&self, system: &str, code: &str) -> bool {
        self.system.as_deref() == Some(system) && self.code.as_deref() == Some(code)
    }
}

transform_record!(Coding { system, version, code, display, user_selected }, hook = visit_coding);

/// A concept that may be defined by one or more codings, plus free text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn has_coding(&self, system: &str, code: &str) -> bool {
        self.coding.iter().any(|coding| coding.is(system, code))
    }
}

transform_record!(CodeableConcept { coding, text }, hook = visit_codeable_concept);

/// Time range defined by start and end date/time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

transform_record!(Period { start, end });

/// An identifier intended for computation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigner: Option<Box<Reference>>,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_: CodeableConcept) -> Self {
        self.type_ = Some(type_);
        self
    }
}

transform_record!(
    Identifier { use_, type_, system, value, period, assigner },
    hook = visit_identifier
);

/// A reference from one resource to another
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Box<Identifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    /// Resource type named by the reference, either through `type` or the
    /// leading segment of a relative reference.
    pub fn target_type(&self) -> Option<&str> {
        if let Some(type_) = self.type_.as_deref() {
            return Some(type_);
        }
        let reference = self.reference.as_deref()?;
        let (resource_type, _) = reference.split_once('/')?;
        resource_type
            .chars()
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .map(|_| resource_type)
    }
}

transform_record!(
    Reference { reference, type_, identifier, display },
    hook = visit_reference
);

/// Name of a person
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

transform_record!(HumanName { use_, text, family, given, prefix, suffix, period });

/// Details of a technology mediated contact point (phone, email, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

transform_record!(ContactPoint { system, value, use_, rank, period });

/// Polymorphic `value[x]` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicValue {
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueCode")]
    Code(String),
    #[serde(rename = "valueUri")]
    Uri(String),
    #[serde(rename = "valueDateTime")]
    DateTime(String),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "valueIdentifier")]
    Identifier(Identifier),
    #[serde(rename = "valueReference")]
    Reference(Reference),
    #[serde(rename = "valuePeriod")]
    Period(Period),
}

transform_union!(DynamicValue {
    Boolean,
    Integer,
    String,
    Code,
    Uri,
    DateTime,
    Coding,
    CodeableConcept,
    Identifier,
    Reference,
    Period,
});

/// Additional content defined by implementations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub url: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub value: Option<DynamicValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl Extension {
    pub fn new(url: impl Into<String>, value: DynamicValue) -> Self {
        Self {
            url: url.into(),
            value: Some(value),
            extension: Vec::new(),
        }
    }

    pub fn value_coding(&self) -> Option<&Coding> {
        match &self.value {
            Some(DynamicValue::Coding(coding)) => Some(coding),
            _ => None,
        }
    }

    pub fn value_codeable_concept(&self) -> Option<&CodeableConcept> {
        match &self.value {
            Some(DynamicValue::CodeableConcept(concept)) => Some(concept),
            _ => None,
        }
    }
}

transform_record!(Extension { url, value, extension });

/// Metadata about a resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Coding>,
}

transform_record!(Meta { version_id, last_updated, source, profile, security, tag });

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_value_json() {
        let extension = Extension::new(
            "http://example.org/ext",
            DynamicValue::Coding(Coding::new("local-sys", "noshow")),
        );
        let value = serde_json::to_value(&extension).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "http://example.org/ext",
                "valueCoding": {"system": "local-sys", "code": "noshow"}
            })
        );

        let parsed: Extension = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, extension);
    }

    #[test]
    fn test_identifier_json_names() {
        let identifier: Identifier = serde_json::from_value(json!({
            "use": "official",
            "type": {"text": "MRN"},
            "system": "urn:oid:1.2.3",
            "value": "12345"
        }))
        .unwrap();
        assert_eq!(identifier.use_.as_deref(), Some("official"));
        assert_eq!(identifier.type_.unwrap().text.as_deref(), Some("MRN"));
    }

    #[test]
    fn test_reference_target_type() {
        assert_eq!(Reference::to("Patient/123").target_type(), Some("Patient"));
        assert_eq!(Reference::to("#contained").target_type(), None);
        let typed = Reference {
            type_: Some("Location".to_string()),
            ..Default::default()
        };
        assert_eq!(typed.target_type(), Some("Location"));
    }
}
