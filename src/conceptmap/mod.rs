//! Concept map registry, cache and translation client.
//!
//! The registry manifest lists which mapping document serves which
//! `(tenant, resource type, element)`; documents are compiled lazily into
//! lookup tables keyed by `(code, tenant-agnostic system)`.

pub mod cache;
pub mod client;
pub mod registry;

pub use cache::ConceptMapCache;
pub use client::{ConceptMapClient, ConceptMapping, ConceptTranslation};
pub use registry::{
    CompiledMap, ManifestEntry, MappingDocument, MappingElement, MappingGroup, MappingTarget,
    RegistryEntry, SourceKey, TargetCoding,
};
