//! Entity contracts shared by every repository instantiation.
//!
//! # Responsibility
//! - Define the binding seam between host entity types and storage.
//! - Define the lifecycle state attached to tracked entity instances.
//! - Define the declarative field validation contract.
//!
//! # Invariants
//! - Entity identity is resolved through `Entity::key_value()` only.
//! - Validation is a pure function of the entity's current field values.

pub mod entity;
pub mod validation;
