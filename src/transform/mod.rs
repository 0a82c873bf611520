//! Type-directed, copy-on-write traversal over resource graphs.
//!
//! Every node type in the resource model implements [`Transform`], exposing its
//! child slots to a generic walker. A [`Visitor`] supplies per-type hooks; types
//! whose hook is not overridden pass through untouched. The walker never mutates
//! its input: a node is cloned and rebuilt only when one of its children
//! changed, so a traversal that changes nothing hands back the original
//! reference ([`Cow::Borrowed`]).
//!
//! Record, union and leaf impls are generated by the [`transform_record!`],
//! [`transform_union!`] and [`transform_leaf!`] macros.

pub mod localizer;
pub mod normalizer;
pub mod systems;

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::types::{CodeableConcept, Coding, Id, Identifier, Reference};

pub use localizer::Localizer;
pub use normalizer::Normalizer;

/// Result of visiting a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// The node is kept as-is
    Unchanged,
    /// The node is replaced by a new value
    Replaced(T),
    /// The node is dropped from its parent
    Removed,
}

impl<T> Change<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Change::Unchanged)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Change<U> {
        match self {
            Change::Unchanged => Change::Unchanged,
            Change::Replaced(value) => Change::Replaced(f(value)),
            Change::Removed => Change::Removed,
        }
    }

    /// Run a post-order hook against the current value of a node: the rebuilt
    /// copy if the children changed, the original otherwise.
    pub fn then_visit(self, original: &T, hook: impl FnOnce(&T) -> Change<T>) -> Change<T> {
        match self {
            Change::Removed => Change::Removed,
            Change::Unchanged => hook(original),
            Change::Replaced(rebuilt) => match hook(&rebuilt) {
                Change::Unchanged => Change::Replaced(rebuilt),
                other => other,
            },
        }
    }

    pub fn from_rebuilt(rebuilt: Option<T>) -> Self {
        match rebuilt {
            Some(value) => Change::Replaced(value),
            None => Change::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Root,
    Field(&'static str),
    Index(usize),
}

/// Position of the node being visited plus the tenant the traversal runs for.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    tenant: Option<&'a str>,
    segment: Segment,
    parent: Option<&'a TransformContext<'a>>,
}

impl<'a> TransformContext<'a> {
    pub fn root(tenant: Option<&'a str>) -> Self {
        Self {
            tenant,
            segment: Segment::Root,
            parent: None,
        }
    }

    pub fn tenant(&self) -> Option<&'a str> {
        self.tenant
    }

    pub fn field<'b>(&'b self, name: &'static str) -> TransformContext<'b> {
        TransformContext {
            tenant: self.tenant,
            segment: Segment::Field(name),
            parent: Some(self),
        }
    }

    pub fn index<'b>(&'b self, index: usize) -> TransformContext<'b> {
        TransformContext {
            tenant: self.tenant,
            segment: Segment::Index(index),
            parent: Some(self),
        }
    }

    /// Dotted path from the root, e.g. `participant[0].actor`.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(cx) = current {
            segments.push(cx.segment);
            current = cx.parent;
        }

        let mut path = String::new();
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Root => {}
                Segment::Field(name) => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(name);
                }
                Segment::Index(index) => {
                    let _ = write!(path, "[{index}]");
                }
            }
        }
        path
    }
}

/// Per-type hooks applied by the walker. Every hook defaults to leaving the
/// node unchanged. Hooks on composite types run after the node's children were
/// visited and see the rebuilt value.
pub trait Visitor {
    /// Fields with these names are not traversed at all.
    fn skips_field(&self, _name: &str) -> bool {
        false
    }

    fn visit_id(&self, _id: &Id, _cx: &TransformContext<'_>) -> Change<Id> {
        Change::Unchanged
    }

    fn visit_coding(&self, _coding: &Coding, _cx: &TransformContext<'_>) -> Change<Coding> {
        Change::Unchanged
    }

    fn visit_codeable_concept(
        &self,
        _concept: &CodeableConcept,
        _cx: &TransformContext<'_>,
    ) -> Change<CodeableConcept> {
        Change::Unchanged
    }

    fn visit_identifier(
        &self,
        _identifier: &Identifier,
        _cx: &TransformContext<'_>,
    ) -> Change<Identifier> {
        Change::Unchanged
    }

    fn visit_reference(
        &self,
        _reference: &Reference,
        _cx: &TransformContext<'_>,
    ) -> Change<Reference> {
        Change::Unchanged
    }
}

/// A node of the resource graph that exposes its children to the walker.
pub trait Transform: Clone {
    fn transform<V: Visitor + ?Sized>(&self, visitor: &V, cx: &TransformContext<'_>)
    -> Change<Self>;
}

/// Walk `value` with `visitor`.
///
/// Returns `Cow::Borrowed(value)` when nothing changed, an owned rebuilt copy
/// otherwise, and `None` if the visitor removed the root itself.
pub fn transform<'a, T, V>(value: &'a T, visitor: &V, tenant: Option<&str>) -> Option<Cow<'a, T>>
where
    T: Transform,
    V: Visitor + ?Sized,
{
    let cx = TransformContext::root(tenant);
    match value.transform(visitor, &cx) {
        Change::Unchanged => Some(Cow::Borrowed(value)),
        Change::Replaced(rebuilt) => Some(Cow::Owned(rebuilt)),
        Change::Removed => None,
    }
}

impl<T: Transform> Transform for Option<T> {
    fn transform<V: Visitor + ?Sized>(
        &self,
        visitor: &V,
        cx: &TransformContext<'_>,
    ) -> Change<Self> {
        match self {
            None => Change::Unchanged,
            Some(inner) => match inner.transform(visitor, cx) {
                Change::Unchanged => Change::Unchanged,
                Change::Replaced(value) => Change::Replaced(Some(value)),
                Change::Removed => Change::Replaced(None),
            },
        }
    }
}

impl<T: Transform> Transform for Vec<T> {
    fn transform<V: Visitor + ?Sized>(
        &self,
        visitor: &V,
        cx: &TransformContext<'_>,
    ) -> Change<Self> {
        // Stays None until the first element changes or disappears.
        let mut rebuilt: Option<Vec<T>> = None;

        for (index, item) in self.iter().enumerate() {
            match item.transform(visitor, &cx.index(index)) {
                Change::Unchanged => {
                    if let Some(items) = rebuilt.as_mut() {
                        items.push(item.clone());
                    }
                }
                Change::Replaced(value) => {
                    rebuilt
                        .get_or_insert_with(|| self[..index].to_vec())
                        .push(value);
                }
                Change::Removed => {
                    rebuilt.get_or_insert_with(|| self[..index].to_vec());
                }
            }
        }

        Change::from_rebuilt(rebuilt)
    }
}

impl<T: Transform> Transform for Box<T> {
    fn transform<V: Visitor + ?Sized>(
        &self,
        visitor: &V,
        cx: &TransformContext<'_>,
    ) -> Change<Self> {
        self.as_ref().transform(visitor, cx).map(Box::new)
    }
}

/// Implement [`Transform`] for types without children.
macro_rules! transform_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::transform::Transform for $ty {
                fn transform<V: $crate::transform::Visitor + ?Sized>(
                    &self,
                    _visitor: &V,
                    _cx: &$crate::transform::TransformContext<'_>,
                ) -> $crate::transform::Change<Self> {
                    $crate::transform::Change::Unchanged
                }
            }
        )*
    };
}

/// Implement [`Transform`] for a struct by listing its traversable fields and,
/// optionally, the [`Visitor`] hook that runs on the struct itself.
macro_rules! transform_record {
    ($ty:ty { $($field:ident),* $(,)? } $(, hook = $hook:ident)?) => {
        impl $crate::transform::Transform for $ty {
            fn transform<V: $crate::transform::Visitor + ?Sized>(
                &self,
                visitor: &V,
                cx: &$crate::transform::TransformContext<'_>,
            ) -> $crate::transform::Change<Self> {
                #[allow(unused_mut)]
                let mut rebuilt: Option<Self> = None;
                $(
                    if !$crate::transform::Visitor::skips_field(visitor, stringify!($field)) {
                        let field_cx = cx.field(stringify!($field));
                        match $crate::transform::Transform::transform(&self.$field, visitor, &field_cx) {
                            $crate::transform::Change::Unchanged => {}
                            $crate::transform::Change::Replaced(value) => {
                                rebuilt.get_or_insert_with(|| self.clone()).$field = value;
                            }
                            $crate::transform::Change::Removed => {
                                return $crate::transform::Change::Removed;
                            }
                        }
                    }
                )*
                let change = $crate::transform::Change::from_rebuilt(rebuilt);
                $(
                    let change = change.then_visit(self, |current| {
                        $crate::transform::Visitor::$hook(visitor, current, cx)
                    });
                )?
                change
            }
        }
    };
}

/// Implement [`Transform`] for a tagged union whose variants each wrap one
/// traversable value.
macro_rules! transform_union {
    ($ty:ident { $($variant:ident),* $(,)? }) => {
        impl $crate::transform::Transform for $ty {
            fn transform<V: $crate::transform::Visitor + ?Sized>(
                &self,
                visitor: &V,
                cx: &$crate::transform::TransformContext<'_>,
            ) -> $crate::transform::Change<Self> {
                match self {
                    $(
                        $ty::$variant(inner) => {
                            $crate::transform::Transform::transform(inner, visitor, cx)
                                .map($ty::$variant)
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use transform_leaf;
pub(crate) use transform_record;
pub(crate) use transform_union;

transform_leaf!(String, bool, u32, i64);
