//! Lead domain model shared by the filter, query and export layers.
//!
//! # Responsibility
//! - Define the canonical lead record rendered by the console.
//! - Define the closed enumerations that back the status, lead quality and
//!   intent facets.
//!
//! # Invariants
//! - Every lead is identified by a stable `LeadId`.
//! - Enumerated facet values round-trip through their kebab-case wire names.

pub mod lead;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
