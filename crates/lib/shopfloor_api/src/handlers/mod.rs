//! Request handlers.

pub mod auth;
pub mod jobs;
pub mod users;
