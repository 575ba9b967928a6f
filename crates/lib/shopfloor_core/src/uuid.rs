// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// All document ids (users, job orders, devices, tasks) are UUIDv7 strings so
// that ordering a collection by id is ordering by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new UUIDv7 document id.
pub fn new_id() -> String {
    uuidv7().to_string()
}
