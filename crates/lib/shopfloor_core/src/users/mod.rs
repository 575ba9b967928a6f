//! User administration and the supervisor/technician hierarchy.
//!
//! Passwords are hashed before anything is persisted. Role shape
//! (`teamType`, `supervisorRef`) is checked on the complete document before
//! every write.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::auth::AuthError;
use crate::auth::password::PasswordHasher;
use crate::authz::{Denied, Operation, Principal, require};
use crate::models::job::JobOrder;
use crate::models::user::{Role, User};
use crate::models::{Department, FieldError, double_option};
use crate::store::{Collection, Filter, StoreError, Stores};
use crate::uuid::new_id;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@([\w-]+\.)+[\w-]{2,}$").expect("email regex is valid")
});

/// User administration errors.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(#[from] FieldError),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Bootstrap is closed: users already exist")]
    BootstrapClosed,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { .. } => {
                UserError::Validation(FieldError::new("email", "is already registered"))
            }
            other => UserError::Store(other),
        }
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(alias = "hashedPassword")]
    pub password: String,
    /// Ignored by [`UserService::bootstrap_planner`].
    #[serde(default, alias = "userType")]
    pub role: String,
    pub team_type: Option<String>,
    #[serde(alias = "supervisor")]
    pub supervisor_ref: Option<String>,
}

/// Partial user update. `null` on `teamType` / `supervisorRef` clears them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "hashedPassword")]
    pub password: Option<String>,
    #[serde(alias = "userType")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub team_type: Option<Option<String>>,
    #[serde(default, alias = "supervisor", deserialize_with = "double_option")]
    pub supervisor_ref: Option<Option<String>>,
}

fn parse_role(value: &str) -> Result<Role, FieldError> {
    Role::parse(value).ok_or_else(|| {
        FieldError::new(
            "role",
            format!("'{value}' is not one of planner, supervisor, technician"),
        )
    })
}

fn parse_team(value: &str) -> Result<Department, FieldError> {
    Department::parse(value).ok_or_else(|| {
        FieldError::new(
            "teamType",
            format!("'{value}' is not one of production, quality, testing"),
        )
    })
}

fn check_username(username: &str) -> Result<(), FieldError> {
    if username.trim().is_empty() {
        return Err(FieldError::new("username", "is required"));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), FieldError> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(FieldError::new("email", "is not a valid email address"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), FieldError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::new(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub struct UserService {
    users: Arc<dyn Collection<User>>,
    jobs: Arc<dyn Collection<JobOrder>>,
    hasher: Arc<dyn PasswordHasher>,
    /// Serializes the count-then-insert of [`UserService::bootstrap_planner`].
    bootstrap: Mutex<()>,
}

impl UserService {
    pub fn new(stores: &Stores, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: stores.users.clone(),
            jobs: stores.jobs.clone(),
            hasher,
            bootstrap: Mutex::new(()),
        }
    }

    async fn load(&self, id: &str) -> Result<User, UserError> {
        self.users.find_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// `supervisorRef` must name an existing supervisor.
    async fn check_supervisor_ref(&self, user: &User) -> Result<(), UserError> {
        let Some(supervisor_id) = user.supervisor_ref.as_deref() else {
            return Ok(());
        };
        match self.users.find_by_id(supervisor_id).await? {
            Some(s) if s.role == Role::Supervisor => Ok(()),
            Some(_) => Err(FieldError::new("supervisorRef", "must reference a supervisor").into()),
            None => Err(FieldError::new("supervisorRef", "unknown supervisor").into()),
        }
    }

    async fn technicians_reporting_to(&self, supervisor_id: &str) -> Result<Vec<User>, UserError> {
        let filter = Filter::all()
            .eq("role", Role::Technician.as_str())
            .eq("supervisorRef", supervisor_id);
        Ok(self.users.find(&filter).await?)
    }

    async fn assigned_to_tasks(&self, technician_id: &str) -> Result<bool, UserError> {
        let jobs = self.jobs.find(&Filter::all()).await?;
        Ok(jobs
            .iter()
            .flat_map(|job| job.tasks())
            .any(|(_, task)| task.technicians.iter().any(|t| t == technician_id)))
    }

    fn build(&self, draft: NewUser) -> Result<User, UserError> {
        check_username(&draft.username)?;
        check_email(&draft.email)?;
        check_password(&draft.password)?;
        let role = parse_role(&draft.role)?;
        let team_type = draft.team_type.as_deref().map(parse_team).transpose()?;

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username: draft.username,
            email: draft.email,
            password_hash: self.hasher.hash(&draft.password)?,
            role,
            team_type,
            supervisor_ref: draft.supervisor_ref,
            refresh_token_hash: None,
            token_epoch: 0,
            created_at: now,
            updated_at: now,
        };
        user.check_role_shape()?;
        Ok(user)
    }

    pub async fn create(&self, principal: &Principal, draft: NewUser) -> Result<User, UserError> {
        require(principal, &Operation::ManageUsers, "create users")?;
        let user = self.build(draft)?;
        self.check_supervisor_ref(&user).await?;
        self.users.insert(&user).await?;
        info!(user_id = %user.id, role = user.role.as_str(), "user created");
        Ok(user)
    }

    /// Create the first planner. Only allowed while no user exists.
    ///
    /// Concurrent calls within one process are serialized. Separate server
    /// processes sharing a database are not; bootstrap before scaling out.
    pub async fn bootstrap_planner(&self, mut draft: NewUser) -> Result<User, UserError> {
        let _guard = self.bootstrap.lock().await;
        if self.users.count().await? > 0 {
            return Err(UserError::BootstrapClosed);
        }
        draft.role = Role::Planner.as_str().to_string();
        let user = self.build(draft)?;
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "initial planner created");
        Ok(user)
    }

    /// Whether at least one planner exists.
    pub async fn planner_exists(&self) -> Result<bool, UserError> {
        let planners = self
            .users
            .find(&Filter::all().eq("role", Role::Planner.as_str()))
            .await?;
        Ok(!planners.is_empty())
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<User>, UserError> {
        require(principal, &Operation::ManageUsers, "list users")?;
        Ok(self.users.find(&Filter::all()).await?)
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<User, UserError> {
        require(principal, &Operation::ManageUsers, "read users")?;
        self.load(id).await
    }

    pub async fn list_by_role(
        &self,
        principal: &Principal,
        role: &str,
    ) -> Result<Vec<User>, UserError> {
        require(principal, &Operation::ManageUsers, "list users")?;
        let role = parse_role(role)?;
        Ok(self
            .users
            .find(&Filter::all().eq("role", role.as_str()))
            .await?)
    }

    /// Merge `patch` into the stored user and re-check every invariant.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: UserPatch,
    ) -> Result<User, UserError> {
        require(principal, &Operation::ManageUsers, "update users")?;
        let mut user = self.load(id).await?;
        let previous_role = user.role;

        if let Some(username) = patch.username {
            check_username(&username)?;
            user.username = username;
        }
        if let Some(email) = patch.email {
            check_email(&email)?;
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = parse_role(&role)?;
        }
        if let Some(team) = patch.team_type {
            user.team_type = team.as_deref().map(parse_team).transpose()?;
        }
        if let Some(supervisor) = patch.supervisor_ref {
            user.supervisor_ref = supervisor;
        }
        user.check_role_shape()?;
        self.check_supervisor_ref(&user).await?;

        if previous_role == Role::Supervisor
            && user.role != Role::Supervisor
            && !self.technicians_reporting_to(&user.id).await?.is_empty()
        {
            return Err(FieldError::new("role", "user still supervises technicians").into());
        }
        if previous_role == Role::Technician
            && user.role != Role::Technician
            && self.assigned_to_tasks(&user.id).await?
        {
            return Err(FieldError::new("role", "user is still assigned to tasks").into());
        }

        if let Some(password) = patch.password {
            check_password(&password)?;
            user.password_hash = self.hasher.hash(&password)?;
        }

        user.updated_at = Utc::now();
        if !self.users.replace(&user).await? {
            return Err(UserError::NotFound);
        }
        Ok(user)
    }

    /// Delete a user that nothing references any more.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), UserError> {
        require(principal, &Operation::ManageUsers, "delete users")?;
        let user = self.load(id).await?;

        if user.role == Role::Supervisor && !self.technicians_reporting_to(id).await?.is_empty() {
            return Err(FieldError::new("id", "user still supervises technicians").into());
        }
        if user.role == Role::Technician && self.assigned_to_tasks(id).await? {
            return Err(FieldError::new("id", "user is still assigned to tasks").into());
        }

        if !self.users.delete_by_id(id).await? {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Point a technician at a supervisor.
    pub async fn assign_supervisor(
        &self,
        principal: &Principal,
        technician_id: &str,
        supervisor_id: &str,
    ) -> Result<User, UserError> {
        require(principal, &Operation::ManageUsers, "assign supervisors")?;
        let mut technician = self.load(technician_id).await?;
        let supervisor = self.load(supervisor_id).await?;
        if technician.role != Role::Technician || supervisor.role != Role::Supervisor {
            return Err(FieldError::new("role", "Invalid role combination").into());
        }

        technician.supervisor_ref = Some(supervisor.id);
        technician.updated_at = Utc::now();
        if !self.users.replace(&technician).await? {
            return Err(UserError::NotFound);
        }
        Ok(technician)
    }

    /// Technicians reporting to `supervisor_id`. Empty for unknown ids.
    pub async fn technicians_of(
        &self,
        principal: &Principal,
        supervisor_id: &str,
    ) -> Result<Vec<User>, UserError> {
        require(
            principal,
            &Operation::ViewSupervisorRoster { supervisor_id },
            "view this supervisor's technicians",
        )?;
        self.technicians_reporting_to(supervisor_id).await
    }
}
