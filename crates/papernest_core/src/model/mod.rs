//! Entity model for a research project.
//!
//! # Responsibility
//! - Define the entity kinds held by the project store.
//! - Keep relationships as explicit foreign-key fields, never back-pointers.
//!
//! # Invariants
//! - Every entity is identified by a stable `Uuid` that never changes.
//! - `created_at` is epoch milliseconds and only set on creation.
//! - Group nesting depth is at most 2 (root groups and their subgroups).

pub mod agenda;
pub mod paper;
pub mod paper_group;
pub mod workspace;

/// Current wall clock as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
