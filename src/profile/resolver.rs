use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ProfileDescriptor, ProfileOutcome};
use crate::types::DomainResource;
use crate::validation::{Validation, ValidationIssue, codes};

/// Chooses between several profiles for the same resource type. Exactly one
/// candidate must qualify for a resource; zero or several matches reject it.
pub struct MultiProfileResolver<R: DomainResource> {
    name: String,
    profiles: Vec<Arc<dyn ProfileDescriptor<R>>>,
}

impl<R: DomainResource> MultiProfileResolver<R> {
    pub fn new(name: impl Into<String>, profiles: Vec<Arc<dyn ProfileDescriptor<R>>>) -> Self {
        Self {
            name: name.into(),
            profiles,
        }
    }

    pub fn profiles(&self) -> &[Arc<dyn ProfileDescriptor<R>>] {
        &self.profiles
    }

    /// The single qualifying profile, or the issue explaining why there is
    /// none.
    pub fn resolve(&self, resource: &R) -> Result<&Arc<dyn ProfileDescriptor<R>>, ValidationIssue> {
        let qualifying: Vec<_> = self
            .profiles
            .iter()
            .filter(|profile| profile.qualifies(resource))
            .collect();

        match qualifying.as_slice() {
            [only] => Ok(*only),
            [] => Err(ValidationIssue::error(
                codes::PROFILE_NONE_QUALIFIED,
                format!(
                    "No {} profile qualified for {}",
                    self.name,
                    R::RESOURCE_TYPE
                ),
            )
            .with_location(R::RESOURCE_TYPE)),
            many => {
                let names = many
                    .iter()
                    .map(|profile| profile.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ValidationIssue::error(
                    codes::PROFILE_MULTIPLE_QUALIFIED,
                    format!(
                        "Multiple {} profiles qualified for {}: {names}",
                        self.name,
                        R::RESOURCE_TYPE
                    ),
                )
                .with_location(R::RESOURCE_TYPE))
            }
        }
    }
}

#[async_trait]
impl<R: DomainResource> ProfileDescriptor<R> for MultiProfileResolver<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn qualifies(&self, resource: &R) -> bool {
        self.profiles.iter().any(|profile| profile.qualifies(resource))
    }

    fn validate(&self, resource: &R) -> Validation {
        match self.resolve(resource) {
            Ok(profile) => profile.validate(resource),
            Err(issue) => Validation::from_issues(vec![issue]),
        }
    }

    async fn transform(
        &self,
        resource: &R,
        tenant: &str,
        force_reload_after: Option<DateTime<Utc>>,
    ) -> ProfileOutcome<R> {
        match self.resolve(resource) {
            Ok(profile) => {
                tracing::debug!(tenant, resolver = %self.name, profile = profile.name(), "resolved profile");
                profile.transform(resource, tenant, force_reload_after).await
            }
            Err(issue) => {
                tracing::info!(tenant, resolver = %self.name, code = %issue.code, "no single profile qualified");
                ProfileOutcome::rejected(Validation::from_issues(vec![issue]))
            }
        }
    }
}

impl<R: DomainResource> std::fmt::Debug for MultiProfileResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiProfileResolver")
            .field("name", &self.name)
            .field(
                "profiles",
                &self.profiles.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Id, Patient};

    /// Qualifies on a fixed answer and accepts everything it transforms.
    struct FixedProfile {
        name: &'static str,
        qualifies: bool,
    }

    #[async_trait]
    impl ProfileDescriptor<Patient> for FixedProfile {
        fn name(&self) -> &str {
            self.name
        }

        fn qualifies(&self, _resource: &Patient) -> bool {
            self.qualifies
        }

        fn validate(&self, _resource: &Patient) -> Validation {
            Validation::new()
        }

        async fn transform(
            &self,
            resource: &Patient,
            _tenant: &str,
            _force_reload_after: Option<DateTime<Utc>>,
        ) -> ProfileOutcome<Patient> {
            let mut transformed = resource.clone();
            transformed.id = Some(Id::new(self.name));
            ProfileOutcome::accepted(transformed, Validation::new())
        }
    }

    fn resolver(p1: bool, p2: bool) -> MultiProfileResolver<Patient> {
        MultiProfileResolver::new(
            "Patient",
            vec![
                Arc::new(FixedProfile {
                    name: "P1",
                    qualifies: p1,
                }),
                Arc::new(FixedProfile {
                    name: "P2",
                    qualifies: p2,
                }),
            ],
        )
    }

    #[tokio::test]
    async fn test_single_qualifying_profile_is_used() {
        let outcome = resolver(true, false)
            .transform(&Patient::default(), "abc", None)
            .await;
        assert_eq!(outcome.resource.unwrap().id, Some(Id::new("P1")));

        let outcome = resolver(false, true)
            .transform(&Patient::default(), "abc", None)
            .await;
        assert_eq!(outcome.resource.unwrap().id, Some(Id::new("P2")));
    }

    #[tokio::test]
    async fn test_no_or_many_qualifying_profiles_rejected() {
        let outcome = resolver(false, false)
            .transform(&Patient::default(), "abc", None)
            .await;
        assert!(outcome.resource.is_none());
        assert_eq!(outcome.validation.issues().len(), 1);
        assert_eq!(
            outcome.validation.issues()[0].code,
            codes::PROFILE_NONE_QUALIFIED
        );

        let outcome = resolver(true, true)
            .transform(&Patient::default(), "abc", None)
            .await;
        assert!(outcome.resource.is_none());
        assert_eq!(outcome.validation.issues().len(), 1);
        let issue = &outcome.validation.issues()[0];
        assert_eq!(issue.code, codes::PROFILE_MULTIPLE_QUALIFIED);
        assert!(issue.description.contains("P1, P2"));
    }
}
