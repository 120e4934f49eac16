//! Repository layer: the public contract over store handles.
//!
//! # Responsibility
//! - Provide validated, transactional CRUD for any bound entity type.
//! - Keep SQL and change-queue details behind the store handle boundary.
//!
//! # Invariants
//! - Writes must pass validation before any transaction boundary opens.
//! - Every mutating call ends with the entity instance in `Detached` state.

pub mod entity_repo;
