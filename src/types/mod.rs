//! Statically typed FHIR resource model.
//!
//! - [`datatypes`] - shared datatypes (`Coding`, `Reference`, `Extension`, ...)
//! - [`resources`] - resources and the [`DomainResource`] capability

pub mod datatypes;
pub mod resources;

pub use datatypes::*;
pub use resources::*;
