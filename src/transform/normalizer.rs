use std::borrow::Cow;

use super::systems::canonical_system;
use super::{Change, Transform, TransformContext, Visitor, transform};
use crate::types::{CodeableConcept, Coding, Identifier};

/// Canonicalizes code system identifiers and fills in missing concept text.
///
/// - `Coding.system` and `Identifier.system` are rewritten through the legacy
///   identifier table in [`super::systems`].
/// - `CodeableConcept.text`, when unset, is taken from the display of the only
///   coding, or of the only user-selected coding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize `value`, borrowing it back when nothing needed rewriting.
    pub fn normalize<'a, T: Transform>(&self, value: &'a T) -> Cow<'a, T> {
        transform(value, self, None).unwrap_or(Cow::Borrowed(value))
    }
}

impl Visitor for Normalizer {
    fn visit_coding(&self, coding: &Coding, _cx: &TransformContext<'_>) -> Change<Coding> {
        match coding.system.as_deref().and_then(canonical_system) {
            Some(canonical) => Change::Replaced(Coding {
                system: Some(canonical.to_string()),
                ..coding.clone()
            }),
            None => Change::Unchanged,
        }
    }

    fn visit_identifier(
        &self,
        identifier: &Identifier,
        _cx: &TransformContext<'_>,
    ) -> Change<Identifier> {
        match identifier.system.as_deref().and_then(canonical_system) {
            Some(canonical) => Change::Replaced(Identifier {
                system: Some(canonical.to_string()),
                ..identifier.clone()
            }),
            None => Change::Unchanged,
        }
    }

    fn visit_codeable_concept(
        &self,
        concept: &CodeableConcept,
        _cx: &TransformContext<'_>,
    ) -> Change<CodeableConcept> {
        if concept.text.is_some() {
            return Change::Unchanged;
        }

        let source = match concept.coding.as_slice() {
            [only] => Some(only),
            [] => None,
            codings => {
                let mut selected = codings
                    .iter()
                    .filter(|coding| coding.user_selected == Some(true));
                match (selected.next(), selected.next()) {
                    (Some(winner), None) => Some(winner),
                    _ => None,
                }
            }
        };

        match source.and_then(|coding| coding.display.clone()) {
            Some(display) => Change::Replaced(CodeableConcept {
                text: Some(display),
                ..concept.clone()
            }),
            None => Change::Unchanged,
        }
    }
}
