//! Submission of validation issues to an external issue tracker.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Validation, ValidationIssue, ValidationSeverity};
use crate::error::{InteropError, Result};
use crate::types::DomainResource;

/// Severity label used by the tracker for blocking issues.
pub const SEVERITY_FAILED: &str = "FAILED";
/// Severity label used by the tracker for non-blocking issues.
pub const SEVERITY_WARNING: &str = "WARNING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub severity: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<&ValidationIssue> for NewIssue {
    fn from(issue: &ValidationIssue) -> Self {
        let severity = match issue.severity {
            ValidationSeverity::Error => SEVERITY_FAILED,
            ValidationSeverity::Warning => SEVERITY_WARNING,
        };
        Self {
            severity: severity.to_string(),
            type_: issue.code.clone(),
            description: issue.description.clone(),
            location: issue.location.clone(),
        }
    }
}

/// A resource and every issue found on it, submitted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub organization_id: String,
    pub resource_type: String,
    pub resource_json: serde_json::Value,
    pub issues: Vec<NewIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedResource {
    pub id: Uuid,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn add_resource(&self, resource: NewResource) -> Result<TrackedResource>;
}

/// Forwards pipeline validations to an [`IssueTracker`].
pub struct ValidationReporter {
    tracker: Arc<dyn IssueTracker>,
}

impl ValidationReporter {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Submit `validation` together with the resource it was produced for.
    ///
    /// Empty validations are rejected; tracker failures are returned as
    /// reporting errors and not retried.
    pub async fn report<R: DomainResource>(
        &self,
        validation: &Validation,
        resource: &R,
        tenant: &str,
    ) -> Result<Uuid> {
        if validation.is_empty() {
            return Err(InteropError::reporting(format!(
                "refusing to report an empty validation for {} {}",
                R::RESOURCE_TYPE,
                resource.id().map(|id| id.as_str()).unwrap_or("<no id>")
            )));
        }

        let submission = NewResource {
            organization_id: tenant.to_string(),
            resource_type: R::RESOURCE_TYPE.to_string(),
            resource_json: resource.to_json()?,
            issues: validation.issues().iter().map(NewIssue::from).collect(),
        };

        match self.tracker.add_resource(submission).await {
            Ok(tracked) => {
                tracing::info!(
                    tenant,
                    resource_type = R::RESOURCE_TYPE,
                    tracked_id = %tracked.id,
                    errors = validation.error_count(),
                    warnings = validation.warning_count(),
                    "reported validation issues"
                );
                Ok(tracked.id)
            }
            Err(e) => {
                tracing::error!(
                    tenant,
                    resource_type = R::RESOURCE_TYPE,
                    error = %e,
                    "failed to report validation issues"
                );
                if matches!(e, InteropError::Reporting { .. }) {
                    Err(e)
                } else {
                    Err(InteropError::reporting(e.to_string()))
                }
            }
        }
    }
}

impl std::fmt::Debug for ValidationReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationReporter").finish_non_exhaustive()
    }
}

/// Issue tracker keeping submissions in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssueTracker {
    submissions: Arc<RwLock<Vec<(Uuid, NewResource)>>>,
}

impl InMemoryIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submissions(&self) -> Vec<(Uuid, NewResource)> {
        self.submissions.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<NewResource> {
        self.submissions
            .read()
            .await
            .iter()
            .find(|(tracked, _)| *tracked == id)
            .map(|(_, resource)| resource.clone())
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssueTracker {
    async fn add_resource(&self, resource: NewResource) -> Result<TrackedResource> {
        let id = Uuid::new_v4();
        self.submissions.write().await.push((id, resource));
        Ok(TrackedResource { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Id, Patient};
    use crate::validation::codes;

    #[test]
    fn test_issue_conversion() {
        let issue = ValidationIssue::warning(codes::RECOMMENDED_FIELD, "birthDate is missing")
            .with_location("Patient.birthDate");
        let converted = NewIssue::from(&issue);
        assert_eq!(converted.severity, "WARNING");
        assert_eq!(converted.type_, "REC_FIELD");
        assert_eq!(converted.location.as_deref(), Some("Patient.birthDate"));

        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(json["type"], "REC_FIELD");
    }

    #[tokio::test]
    async fn test_empty_validation_rejected() {
        let tracker = InMemoryIssueTracker::new();
        let reporter = ValidationReporter::new(Arc::new(tracker.clone()));
        let patient = Patient {
            id: Some(Id::new("p1")),
            ..Default::default()
        };

        let err = reporter
            .report(&Validation::new(), &patient, "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, InteropError::Reporting { .. }));
        assert!(tracker.submissions().await.is_empty());
    }
}
