//! Versioned schema migrations.
//!
//! Applied versions are recorded in the `schema_migrations` collection, so
//! running the migrator twice is a no-op. Each step is also written to be
//! idempotent on its own.

#[cfg(feature = "mongodb")]
mod builtin;
#[cfg(feature = "mongodb")]
mod remap;
#[cfg(feature = "mongodb")]
mod runner;

#[cfg(feature = "mongodb")]
pub use builtin::builtin_migrations;
#[cfg(feature = "mongodb")]
pub use remap::{remap_ad_group_id, RemapReport};
#[cfg(feature = "mongodb")]
pub use runner::{Migration, MigrationRunner, SCHEMA_MIGRATIONS};

use crate::error::{PersistError, Result};
use std::collections::HashSet;

/// Versions from `known` that are not in `applied`, ascending
pub fn pending_versions(known: &[u32], applied: &[u32]) -> Vec<u32> {
    let applied: HashSet<u32> = applied.iter().copied().collect();
    let mut pending: Vec<u32> = known.iter().copied().filter(|v| !applied.contains(v)).collect();
    pending.sort_unstable();
    pending
}

/// Registered versions must be unique and listed in ascending order
pub fn check_ordering(known: &[u32]) -> Result<()> {
    for pair in known.windows(2) {
        if pair[0] >= pair[1] {
            return Err(PersistError::Migration {
                version: pair[1],
                message: format!("registered after version {}", pair[0]),
            });
        }
    }
    Ok(())
}

/// Given default configs ordered most recently updated first, as
/// `(id, scope)` pairs, return the ids whose default flag must be cleared so
/// that each scope keeps exactly one.
pub fn duplicate_defaults(defaults: &[(String, Option<String>)]) -> Vec<String> {
    let mut seen: HashSet<Option<&str>> = HashSet::new();
    let mut duplicates = Vec::new();
    for (id, scope) in defaults {
        if !seen.insert(scope.as_deref()) {
            duplicates.push(id.clone());
        }
    }
    duplicates
}
