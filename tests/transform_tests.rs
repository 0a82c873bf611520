mod common;

use std::borrow::Cow;

use common::*;
use octofhir_interop::transform::transform;
use octofhir_interop::*;

/// Drops references to one resource type.
struct DropReferencesTo(&'static str);

impl Visitor for DropReferencesTo {
    fn visit_reference(&self, reference: &Reference, _cx: &TransformContext<'_>) -> Change<Reference> {
        if reference.target_type() == Some(self.0) {
            Change::Removed
        } else {
            Change::Unchanged
        }
    }
}

#[test]
fn test_noop_returns_same_reference() {
    let input = appointment("booked");
    let normalized = Normalizer::new().normalize(&input).into_owned();

    let again = Normalizer::new().normalize(&normalized);
    match again {
        Cow::Borrowed(borrowed) => assert!(std::ptr::eq(borrowed, &normalized)),
        Cow::Owned(_) => panic!("already normalized resource was rebuilt"),
    }
}

#[test]
fn test_normalize_then_localize_is_idempotent() {
    let normalizer = Normalizer::new();
    let localizer = Localizer::new();
    let input = condition("problem-list-item");

    let normalized = normalizer.normalize(&input);
    let once = localizer.localize(normalized.as_ref(), TENANT).into_owned();

    let renormalized = normalizer.normalize(&once);
    assert!(matches!(renormalized, Cow::Borrowed(_)));
    let twice = localizer.localize(renormalized.as_ref(), TENANT);
    assert_eq!(twice.as_ref(), &once);
    assert!(matches!(twice, Cow::Borrowed(_)));

    assert_eq!(once.id, Some(Id::new("abc-c1")));
    assert_eq!(
        once.code.as_ref().unwrap().coding[0].system.as_deref(),
        Some("http://hl7.org/fhir/sid/icd-10-cm")
    );
}

#[test]
fn test_removed_sequence_elements_are_dropped() {
    let mut input = appointment("booked");
    input.slot = vec![
        Reference::to("Slot/s1"),
        Reference::to("Patient/p9"),
        Reference::to("Slot/s2"),
    ];

    let output = transform(&input, &DropReferencesTo("Slot"), None).unwrap();
    assert_eq!(output.slot.len(), 1);
    assert_eq!(output.slot[0].reference.as_deref(), Some("Patient/p9"));
    assert!(output.participant.iter().all(|p| p.actor.is_some()));

    let output = transform(&input, &DropReferencesTo("Patient"), None).unwrap();
    assert_eq!(output.slot.len(), 2);
    // optional references become unset
    assert!(output.participant[1].actor.is_none());
    assert!(output.participant[0].actor.is_some());
}

#[test]
fn test_unrelated_visitor_leaves_resource_borrowed() {
    let input = patient();
    let output = transform(&input, &DropReferencesTo("Slot"), Some(TENANT)).unwrap();
    assert!(matches!(output, Cow::Borrowed(_)));
}

#[test]
fn test_custom_ignore_list() {
    let mut input = patient();
    input.general_practitioner = vec![Reference::to("Practitioner/pr1")];

    let localizer = Localizer::with_ignored_fields(["general_practitioner"]);
    let output = localizer.localize(&input, TENANT);
    assert_eq!(
        output.general_practitioner[0].reference.as_deref(),
        Some("Practitioner/pr1")
    );
    assert_eq!(
        output.managing_organization.as_ref().unwrap().reference.as_deref(),
        Some("Organization/abc-o1")
    );
}
