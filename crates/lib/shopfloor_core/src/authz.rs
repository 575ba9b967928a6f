//! Authorization engine.
//!
//! Each role is a [`Principal`] variant with its own predicate, so adding an
//! operation forces every role to state whether it may perform it. Decisions
//! are recomputed on every request from freshly loaded documents.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::models::auth::AccessClaims;
use crate::models::job::Task;
use crate::models::user::Role;
use crate::roster::Roster;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Planner { id: String },
    Supervisor { id: String },
    Technician { id: String },
}

impl Principal {
    pub fn from_claims(claims: &AccessClaims) -> Self {
        let id = claims.sub.clone();
        match claims.role {
            Role::Planner => Principal::Planner { id },
            Role::Supervisor => Principal::Supervisor { id },
            Role::Technician => Principal::Technician { id },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Principal::Planner { id } | Principal::Supervisor { id } | Principal::Technician { id } => {
                id
            }
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Planner { .. } => Role::Planner,
            Principal::Supervisor { .. } => Role::Supervisor,
            Principal::Technician { .. } => Role::Technician,
        }
    }
}

/// Who is assigned to a task, and who supervises them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskAssignment {
    technicians: HashSet<String>,
    supervisors: HashSet<String>,
}

impl TaskAssignment {
    pub fn resolve(task: &Task, roster: &Roster) -> Self {
        let technicians: HashSet<String> = task.technicians.iter().cloned().collect();
        let supervisors = technicians
            .iter()
            .filter_map(|t| roster.supervisor_of(t))
            .map(str::to_string)
            .collect();
        Self {
            technicians,
            supervisors,
        }
    }

    pub fn has_technician(&self, id: &str) -> bool {
        self.technicians.contains(id)
    }

    pub fn supervised_by(&self, supervisor_id: &str) -> bool {
        self.supervisors.contains(supervisor_id)
    }
}

/// Operation being requested, with whatever target context it needs.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Create, read, update or delete whole job orders.
    ManageJobOrders,
    /// Create, read, update or delete users.
    ManageUsers,
    /// Accept or deny a task.
    RespondToTask(&'a TaskAssignment),
    /// Update a task's output, times or completion status.
    UpdateTaskProgress(&'a TaskAssignment),
    /// Read the flattened task list of a supervisor's team.
    ViewSupervisorTasks { supervisor_id: &'a str },
    /// Read the flattened task list of a technician.
    ViewTechnicianTasks { technician_id: &'a str },
    /// List the technicians reporting to a supervisor.
    ViewSupervisorRoster { supervisor_id: &'a str },
}

/// Decide whether `principal` may perform `operation`.
pub fn authorize(principal: &Principal, operation: &Operation<'_>) -> bool {
    match principal {
        Principal::Planner { .. } => planner_may(operation),
        Principal::Supervisor { id } => supervisor_may(id, operation),
        Principal::Technician { id } => technician_may(id, operation),
    }
}

/// An authorization refusal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not allowed to {action}")]
pub struct Denied {
    pub action: &'static str,
}

/// [`authorize`], logging and returning [`Denied`] on refusal.
pub fn require(
    principal: &Principal,
    operation: &Operation<'_>,
    action: &'static str,
) -> Result<(), Denied> {
    if authorize(principal, operation) {
        return Ok(());
    }
    warn!(
        user_id = %principal.id(),
        role = principal.role().as_str(),
        action,
        "authorization denied"
    );
    Err(Denied { action })
}

fn planner_may(operation: &Operation<'_>) -> bool {
    match operation {
        Operation::ManageJobOrders
        | Operation::ManageUsers
        | Operation::ViewSupervisorTasks { .. }
        | Operation::ViewTechnicianTasks { .. }
        | Operation::ViewSupervisorRoster { .. } => true,
        Operation::RespondToTask(_) | Operation::UpdateTaskProgress(_) => false,
    }
}

fn supervisor_may(id: &str, operation: &Operation<'_>) -> bool {
    match operation {
        Operation::RespondToTask(assignment) => assignment.supervised_by(id),
        Operation::ViewSupervisorTasks { supervisor_id }
        | Operation::ViewSupervisorRoster { supervisor_id } => *supervisor_id == id,
        Operation::ManageJobOrders
        | Operation::ManageUsers
        | Operation::UpdateTaskProgress(_)
        | Operation::ViewTechnicianTasks { .. } => false,
    }
}

fn technician_may(id: &str, operation: &Operation<'_>) -> bool {
    match operation {
        Operation::UpdateTaskProgress(assignment) => assignment.has_technician(id),
        Operation::ViewTechnicianTasks { technician_id } => *technician_id == id,
        Operation::ManageJobOrders
        | Operation::ManageUsers
        | Operation::RespondToTask(_)
        | Operation::ViewSupervisorTasks { .. }
        | Operation::ViewSupervisorRoster { .. } => false,
    }
}
