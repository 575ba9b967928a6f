//! User documents and the role hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Department, FieldError};

/// User role. Closed set; every authorization rule matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Planner,
    Supervisor,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::Supervisor => "supervisor",
            Role::Technician => "technician",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planner" => Some(Role::Planner),
            "supervisor" => Some(Role::Supervisor),
            "technician" => Some(Role::Technician),
            _ => None,
        }
    }

    /// Whether users of this role must carry a team.
    pub fn requires_team(&self) -> bool {
        !matches!(self, Role::Planner)
    }

    /// Whether users of this role must report to a supervisor.
    pub fn requires_supervisor(&self) -> bool {
        matches!(self, Role::Technician)
    }
}

/// Persisted user document (credential store entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub team_type: Option<Department>,
    pub supervisor_ref: Option<String>,
    /// SHA-256 of the single live refresh token, if any.
    pub refresh_token_hash: Option<String>,
    #[serde(default)]
    pub token_epoch: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check that `teamType` and `supervisorRef` presence match the role.
    pub fn check_role_shape(&self) -> Result<(), FieldError> {
        match (self.role.requires_team(), self.team_type.is_some()) {
            (true, false) => {
                return Err(FieldError::new(
                    "teamType",
                    format!("{} must have a team type", self.role.as_str()),
                ));
            }
            (false, true) => {
                return Err(FieldError::new("teamType", "planner should not have a team"));
            }
            _ => {}
        }
        match (self.role.requires_supervisor(), self.supervisor_ref.is_some()) {
            (true, false) => Err(FieldError::new(
                "supervisorRef",
                "technician must have a supervisor",
            )),
            (false, true) => Err(FieldError::new(
                "supervisorRef",
                format!("{} should not have a supervisor", self.role.as_str()),
            )),
            _ => Ok(()),
        }
    }

    /// Public view without secrets.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            team_type: self.team_type,
            supervisor_ref: self.supervisor_ref.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            team_type: self.team_type,
            supervisor_ref: self.supervisor_ref.clone(),
        }
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub team_type: Option<Department>,
    pub supervisor_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reduced user view used when resolving technician references inside tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub team_type: Option<Department>,
    pub supervisor_ref: Option<String>,
}
