use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::{Change, Transform, TransformContext, Visitor, transform};
use crate::core::config::DEFAULT_LOCALIZATION_IGNORED_FIELDS;
use crate::types::{Id, Reference};

/// `[base-url/]Type/id[/_history/version]`
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://(?:[A-Za-z0-9\-\\.:%$]*/)+)?([A-Z][A-Za-z]+)/([A-Za-z0-9\-.]{1,64})(/_history/[A-Za-z0-9\-.]{1,64})?$",
    )
    .expect("reference pattern is valid")
});

/// Scopes resource ids and references to a tenant so that ids coming from
/// different tenants can never collide downstream.
///
/// Fields named in the ignore list (contained resources and version markers by
/// default) are not descended into.
#[derive(Debug, Clone)]
pub struct Localizer {
    ignored_fields: Vec<String>,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::with_ignored_fields(DEFAULT_LOCALIZATION_IGNORED_FIELDS.iter().copied())
    }
}

impl Localizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ignored_fields(&self) -> &[String] {
        &self.ignored_fields
    }

    pub fn localize<'a, T: Transform>(&self, value: &'a T, tenant: &str) -> Cow<'a, T> {
        transform(value, self, Some(tenant)).unwrap_or(Cow::Borrowed(value))
    }
}

/// `<tenant>-<id>`, leaving already localized ids alone.
pub fn localize_id(id: &str, tenant: &str) -> Option<String> {
    let prefix = format!("{tenant}-");
    if id.starts_with(&prefix) {
        None
    } else {
        Some(format!("{prefix}{id}"))
    }
}

/// Rewrite a reference string into its tenant-scoped relative form.
///
/// Returns `None` when the string is not shaped like a resource reference or
/// is already localized and relative.
pub fn localize_reference(reference: &str, tenant: &str) -> Option<String> {
    let captures = REFERENCE_PATTERN.captures(reference)?;
    let resource_type = &captures[1];
    let id = &captures[2];
    let history = captures.get(3).map_or("", |m| m.as_str());

    let localized_id = localize_id(id, tenant).unwrap_or_else(|| id.to_string());
    let localized = format!("{resource_type}/{localized_id}{history}");

    if localized == reference {
        None
    } else {
        Some(localized)
    }
}

impl Visitor for Localizer {
    fn skips_field(&self, name: &str) -> bool {
        self.ignored_fields.iter().any(|field| field == name)
    }

    fn visit_id(&self, id: &Id, cx: &TransformContext<'_>) -> Change<Id> {
        let Some(tenant) = cx.tenant() else {
            return Change::Unchanged;
        };
        match localize_id(id.as_str(), tenant) {
            Some(localized) => Change::Replaced(Id(localized)),
            None => Change::Unchanged,
        }
    }

    fn visit_reference(&self, reference: &Reference, cx: &TransformContext<'_>) -> Change<Reference> {
        let Some(tenant) = cx.tenant() else {
            return Change::Unchanged;
        };
        let Some(value) = reference.reference.as_deref() else {
            return Change::Unchanged;
        };
        match localize_reference(value, tenant) {
            Some(localized) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(path = %cx.path(), from = value, to = %localized, "localized reference");
                Change::Replaced(Reference {
                    reference: Some(localized),
                    ..reference.clone()
                })
            }
            None => Change::Unchanged,
        }
    }
}
