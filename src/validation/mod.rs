//! Validation issues and the accumulator the pipeline threads through its
//! stages.

pub mod reporting;

use serde::{Deserialize, Serialize};

pub use reporting::{
    InMemoryIssueTracker, IssueTracker, NewIssue, NewResource, TrackedResource, ValidationReporter,
};

/// Issue codes emitted by the pipeline.
pub mod codes {
    pub const REQUIRED_FIELD: &str = "REQ_FIELD";
    pub const INVALID_VALUE_SET: &str = "INV_VALUE_SET";
    pub const INVALID_REFERENCE_TYPE: &str = "INV_REF_TYPE";
    pub const FAILED_CONCEPT_MAP_LOOKUP: &str = "NOV_CONMAP_LOOKUP";
    pub const MISSING_SOURCE_EXTENSION: &str = "REQ_SOURCE_EXT";
    pub const MISSING_CANONICAL_IDENTIFIER: &str = "REQ_CANONICAL_ID";
    pub const MISSING_PROFILE: &str = "REQ_META_PROFILE";
    pub const TRANSFORM_FAILED: &str = "TRANSFORM_FAILED";
    pub const PROFILE_NONE_QUALIFIED: &str = "PROFILE_NONE_QUALIFIED";
    pub const PROFILE_MULTIPLE_QUALIFIED: &str = "PROFILE_MULTIPLE_QUALIFIED";
    pub const INVARIANT: &str = "INV_CONSTRAINT";
    pub const RECOMMENDED_FIELD: &str = "REC_FIELD";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationSeverity::Error => write!(f, "ERROR"),
            ValidationSeverity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Dotted location of an element inside a resource, e.g.
/// `Appointment.participant[0].actor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationContext {
    path: String,
}

impl LocationContext {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            path: element.into(),
        }
    }

    pub fn field(&self, name: &str) -> Self {
        Self {
            path: format!("{}.{}", self.path, name),
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self {
            path: format!("{}[{}]", self.path, index),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Display for LocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub code: String,
    pub description: String,
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            code: code.into(),
            description: description.into(),
            location: None,
        }
    }

    pub fn warning(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            code: code.into(),
            description: description.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: &LocationContext) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }

    pub fn required_field(location: &LocationContext) -> Self {
        Self::error(
            codes::REQUIRED_FIELD,
            format!("{location} is a required element"),
        )
        .at(location)
    }

    pub fn invalid_value_set(location: &LocationContext, value: &str) -> Self {
        Self::error(
            codes::INVALID_VALUE_SET,
            format!("'{value}' is outside of required value set"),
        )
        .at(location)
    }

    pub fn failed_concept_map_lookup(
        location: &LocationContext,
        value: &str,
        map_name: &str,
    ) -> Self {
        Self::error(
            codes::FAILED_CONCEPT_MAP_LOOKUP,
            format!("Tenant source value '{value}' has no target defined in {map_name}"),
        )
        .at(location)
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.description)?;
        if let Some(location) = &self.location {
            write!(f, " @ {location}")?;
        }
        Ok(())
    }
}

/// Ordered collection of issues accumulated across pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    issues: Vec<ValidationIssue>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Record `issue` unless `condition` holds. Returns `condition`.
    pub fn check_true(&mut self, condition: bool, issue: impl FnOnce() -> ValidationIssue) -> bool {
        if !condition {
            self.push(issue());
        }
        condition
    }

    /// Record a required-field error when `value` is absent.
    pub fn check_not_null<T>(&mut self, value: Option<&T>, location: &LocationContext) -> bool {
        self.check_true(value.is_some(), || {
            ValidationIssue::required_field(location)
        })
    }

    /// Record a required-field error when `values` is empty.
    pub fn check_not_empty<T>(&mut self, values: &[T], location: &LocationContext) -> bool {
        self.check_true(!values.is_empty(), || {
            ValidationIssue::required_field(location)
        })
    }

    pub fn merge(&mut self, other: Validation) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    pub fn has_issue(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}
