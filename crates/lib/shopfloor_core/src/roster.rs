//! Id → user summary lookup.
//!
//! Loaded once per request from the user collection and used to resolve
//! technician references and technician → supervisor relationships.

use std::collections::HashMap;

use crate::models::user::{Role, User, UserSummary};

#[derive(Debug, Clone, Default)]
pub struct Roster {
    users: HashMap<String, UserSummary>,
}

impl Roster {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.id.clone(), u.summary()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&UserSummary> {
        self.users.get(id)
    }

    /// Supervisor of `technician_id`, if it is a known technician.
    pub fn supervisor_of(&self, technician_id: &str) -> Option<&str> {
        self.users
            .get(technician_id)
            .filter(|u| u.role == Role::Technician)
            .and_then(|u| u.supervisor_ref.as_deref())
    }

    pub fn is_technician(&self, id: &str) -> bool {
        self.users.get(id).is_some_and(|u| u.role == Role::Technician)
    }
}
