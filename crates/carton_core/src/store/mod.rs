//! Store handle layer: the session through which repositories talk to SQLite.
//!
//! # Responsibility
//! - Track pending entity changes as explicit tagged operations.
//! - Flush pending changes atomically inside one transaction boundary.
//! - Serve untracked snapshot reads for the bound entity type.
//!
//! # Invariants
//! - A handle serves one logical unit of work; it is not shared across
//!   threads.
//! - Reads never open a transaction and never attach lifecycle state.

pub mod handle;
