//! Opaque sortable unique identifiers.
//!
//! UUIDv7 embeds a millisecond timestamp in its most significant bits, so
//! canonical string-form IDs generated in creation order sort
//! lexicographically in that same order — exactly what the store's
//! ready-queue and list indexes rely on (§3, §4.3 of the design).

use uuid::Uuid;

/// Generates a fresh, time-ordered, sortable ID.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
