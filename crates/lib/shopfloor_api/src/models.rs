//! Request and response bodies.

use serde::{Deserialize, Serialize};
use shopfloor_core::models::job::{JobOrder, Task};
use shopfloor_core::models::user::{UserProfile, UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub planner_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignSupervisorResponse {
    pub message: String,
    pub technician: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponseRequest {
    pub task_response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateResponse {
    pub message: String,
    pub task: Task,
}

/// `?populate=` on job order reads. Defaults to resolving technicians.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulateQuery {
    #[serde(default = "default_populate")]
    pub populate: bool,
}

fn default_populate() -> bool {
    true
}

/// A job order with technician ids either raw or resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobOrderBody {
    Raw(JobOrder),
    Populated(JobOrder<UserSummary>),
}
