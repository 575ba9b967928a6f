//! # shopfloor_core
//!
//! Core domain logic for Shopfloor: job orders, users, authorization and
//! sessions. No HTTP here.

pub mod auth;
pub mod authz;
pub mod jobs;
pub mod migrate;
pub mod models;
pub mod roster;
pub mod store;
pub mod users;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
