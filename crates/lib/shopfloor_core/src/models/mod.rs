//! Domain models.
//!
//! These are the persisted document shapes. API-specific request/response
//! types live in `shopfloor_api::models`.

pub mod auth;
pub mod job;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Department / team classification shared by users and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Production,
    Quality,
    Testing,
}

impl Department {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Production => "production",
            Department::Quality => "quality",
            Department::Testing => "testing",
        }
    }

    /// Parse the wire representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "production" => Some(Department::Production),
            "quality" => Some(Department::Quality),
            "testing" => Some(Department::Testing),
            _ => None,
        }
    }
}

/// A validation failure pinned to a field path (e.g. `devices[0].tasks[1].taskType`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`,
/// value → `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
