//! Job order workflow: CRUD, per-task transitions and per-actor task lists.
//!
//! Every operation loads the affected job order, mutates it in memory and
//! writes the whole document back. Concurrent writers to the same job order
//! are last-write-wins.

pub mod draft;
pub mod flatten;
pub mod progress;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::authz::{Denied, Operation, Principal, TaskAssignment, require};
use crate::models::FieldError;
use crate::models::job::{JobOrder, PathSegment, Task, TaskPath};
use crate::models::user::{User, UserSummary};
use crate::roster::Roster;
use crate::store::{Collection, Filter, StoreError, Stores};

pub use draft::{DeviceDraft, JobOrderDraft, TaskDraft};
pub use flatten::{TaskView, flatten_for_supervisor, flatten_for_technician};
pub use progress::{ProgressUpdate, apply_response};

/// Job workflow errors.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0} not found")]
    NotFound(PathSegment),

    #[error("Validation error: {0}")]
    Validation(#[from] FieldError),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct JobService {
    jobs: Arc<dyn Collection<JobOrder>>,
    users: Arc<dyn Collection<User>>,
}

impl JobService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            jobs: stores.jobs.clone(),
            users: stores.users.clone(),
        }
    }

    async fn roster(&self) -> Result<Roster, JobError> {
        let users = self.users.find(&Filter::all()).await?;
        Ok(Roster::from_users(&users))
    }

    async fn load(&self, id: &str) -> Result<JobOrder, JobError> {
        self.jobs
            .find_by_id(id)
            .await?
            .ok_or(JobError::NotFound(PathSegment::Job))
    }

    async fn save(&self, job: &JobOrder) -> Result<(), JobError> {
        if !self.jobs.replace(job).await? {
            return Err(JobError::NotFound(PathSegment::Job));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        principal: &Principal,
        draft: JobOrderDraft,
    ) -> Result<JobOrder, JobError> {
        require(principal, &Operation::ManageJobOrders, "create job orders")?;
        let job = draft.into_new(Utc::now())?;
        draft::validate(&job, &self.roster().await?)?;
        self.jobs.insert(&job).await?;
        info!(job_id = %job.id, devices = job.devices.len(), "job order created");
        Ok(job)
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<JobOrder, JobError> {
        require(principal, &Operation::ManageJobOrders, "read job orders")?;
        self.load(id).await
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<JobOrder>, JobError> {
        require(principal, &Operation::ManageJobOrders, "read job orders")?;
        Ok(self.jobs.find(&Filter::all()).await?)
    }

    /// Resolve technician ids to user summaries. Dangling ids are dropped.
    pub async fn populate(
        &self,
        jobs: Vec<JobOrder>,
    ) -> Result<Vec<JobOrder<UserSummary>>, JobError> {
        let roster = self.roster().await?;
        Ok(jobs
            .into_iter()
            .map(|job| job.resolve_technicians(|id| roster.get(&id).cloned()))
            .collect())
    }

    /// Patch a job order. The merged document is validated as a whole.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        draft: JobOrderDraft,
    ) -> Result<JobOrder, JobError> {
        require(principal, &Operation::ManageJobOrders, "update job orders")?;
        let existing = self.load(id).await?;
        let job = draft.apply_to(&existing, Utc::now())?;
        draft::validate(&job, &self.roster().await?)?;
        self.save(&job).await?;
        Ok(job)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), JobError> {
        require(principal, &Operation::ManageJobOrders, "delete job orders")?;
        if !self.jobs.delete_by_id(id).await? {
            return Err(JobError::NotFound(PathSegment::Job));
        }
        info!(job_id = %id, "job order deleted");
        Ok(())
    }

    /// Supervisor accepts or denies a task.
    pub async fn respond_to_task(
        &self,
        principal: &Principal,
        path: &TaskPath,
        response: &str,
    ) -> Result<Task, JobError> {
        let mut job = self.load(&path.job_id).await?;
        let roster = self.roster().await?;
        let task = job
            .task_mut(&path.device_id, &path.task_id)
            .map_err(JobError::NotFound)?;

        let assignment = TaskAssignment::resolve(task, &roster);
        require(principal, &Operation::RespondToTask(&assignment), "respond to this task")?;

        progress::apply_response(task, response, Utc::now())?;
        let task = task.clone();
        job.updated_at = Utc::now();
        self.save(&job).await?;
        info!(
            job_id = %path.job_id,
            task_id = %path.task_id,
            response,
            "task response recorded"
        );
        Ok(task)
    }

    /// Technician reports progress on a task.
    pub async fn update_task_progress(
        &self,
        principal: &Principal,
        path: &TaskPath,
        update: ProgressUpdate,
    ) -> Result<Task, JobError> {
        let mut job = self.load(&path.job_id).await?;
        let roster = self.roster().await?;
        let task = job
            .task_mut(&path.device_id, &path.task_id)
            .map_err(JobError::NotFound)?;

        let assignment = TaskAssignment::resolve(task, &roster);
        require(principal, &Operation::UpdateTaskProgress(&assignment), "update this task")?;

        update.apply(task)?;
        let task = task.clone();
        job.updated_at = Utc::now();
        self.save(&job).await?;
        Ok(task)
    }

    /// Flat list of tasks assigned to `supervisor_id`'s technicians.
    ///
    /// An unknown supervisor simply has no tasks.
    pub async fn tasks_for_supervisor(
        &self,
        principal: &Principal,
        supervisor_id: &str,
    ) -> Result<Vec<TaskView>, JobError> {
        require(
            principal,
            &Operation::ViewSupervisorTasks { supervisor_id },
            "view this supervisor's tasks",
        )?;
        let jobs = self.jobs.find(&Filter::all()).await?;
        let roster = self.roster().await?;
        Ok(flatten_for_supervisor(&jobs, &roster, supervisor_id))
    }

    /// Flat list of tasks assigned to `technician_id`.
    pub async fn tasks_for_technician(
        &self,
        principal: &Principal,
        technician_id: &str,
    ) -> Result<Vec<TaskView>, JobError> {
        require(
            principal,
            &Operation::ViewTechnicianTasks { technician_id },
            "view this technician's tasks",
        )?;
        let jobs = self.jobs.find(&Filter::all()).await?;
        Ok(flatten_for_technician(&jobs, technician_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{TaskResponse, TaskStatus};
    use crate::models::user::Role;
    use crate::models::user::fixtures::user;
    use serde_json::json;

    struct Fixture {
        service: JobService,
        job: JobOrder,
    }

    fn planner() -> Principal {
        Principal::Planner { id: "planner".into() }
    }

    async fn fixture() -> Fixture {
        let stores = Stores::memory();
        for u in [
            user("planner", Role::Planner, None),
            user("sup-a", Role::Supervisor, None),
            user("sup-b", Role::Supervisor, None),
            user("tech-a", Role::Technician, Some("sup-a")),
            user("tech-b", Role::Technician, Some("sup-b")),
        ] {
            stores.users.insert(&u).await.unwrap();
        }
        let service = JobService::new(&stores);
        let draft: JobOrderDraft = serde_json::from_value(json!({
            "jobOrderName": "Batch-1",
            "devices": [{
                "deviceName": "Pump",
                "serialNumber": "SN-1",
                "tasks": [
                    {
                        "taskType": "production",
                        "taskName": "Assemble",
                        "department": "production",
                        "minOutput": 10,
                        "technicians": ["tech-a"]
                    },
                    {
                        "taskType": "quality",
                        "taskName": "Inspect",
                        "department": "quality",
                        "technicians": ["tech-b"]
                    }
                ]
            }]
        }))
        .unwrap();
        let job = service.create(&planner(), draft).await.unwrap();
        Fixture { service, job }
    }

    fn path(job: &JobOrder, task: usize) -> TaskPath {
        TaskPath {
            job_id: job.id.clone(),
            device_id: job.devices[0].id.clone(),
            task_id: job.devices[0].tasks[task].id.clone(),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_initial_states() {
        let Fixture { service, job } = fixture().await;
        assert!(!job.id.is_empty());
        assert!(!job.devices[0].id.is_empty());
        let task = &job.devices[0].tasks[0];
        assert_eq!(task.status, TaskStatus::Undone);
        assert_eq!(task.task_response, TaskResponse::Pending);

        let stored = service.get(&planner(), &job.id).await.unwrap();
        assert_eq!(stored, job);
    }

    #[tokio::test]
    async fn only_planner_manages_job_orders() {
        let Fixture { service, job } = fixture().await;
        let sup = Principal::Supervisor { id: "sup-a".into() };
        assert!(matches!(
            service.get(&sup, &job.id).await,
            Err(JobError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&sup, &job.id).await,
            Err(JobError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn supervisor_of_assigned_technician_responds() {
        let Fixture { service, job } = fixture().await;
        let sup_a = Principal::Supervisor { id: "sup-a".into() };
        let sup_b = Principal::Supervisor { id: "sup-b".into() };

        let task = service
            .respond_to_task(&sup_a, &path(&job, 0), "accepted")
            .await
            .unwrap();
        assert_eq!(task.task_response, TaskResponse::Accepted);
        assert!(task.task_response_time.is_some());

        let denied = service
            .respond_to_task(&sup_b, &path(&job, 0), "denied")
            .await;
        assert!(matches!(denied, Err(JobError::Forbidden(_))));

        let stored = service.get(&planner(), &job.id).await.unwrap();
        assert_eq!(stored.devices[0].tasks[0].task_response, TaskResponse::Accepted);
    }

    #[tokio::test]
    async fn invalid_response_value_is_validation_error() {
        let Fixture { service, job } = fixture().await;
        let sup_a = Principal::Supervisor { id: "sup-a".into() };
        let err = service
            .respond_to_task(&sup_a, &path(&job, 0), "maybe")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(e) if e.field == "taskResponse"));
    }

    #[tokio::test]
    async fn missing_segment_is_named() {
        let Fixture { service, job } = fixture().await;
        let tech = Principal::Technician { id: "tech-a".into() };
        let mut bad = path(&job, 0);
        bad.task_id = "nope".into();
        let err = service
            .update_task_progress(&tech, &bad, ProgressUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task not found");

        bad.device_id = "nope".into();
        let err = service
            .update_task_progress(&tech, &bad, ProgressUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Device not found");

        bad.job_id = "nope".into();
        let err = service
            .update_task_progress(&tech, &bad, ProgressUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "JobOrder not found");
    }

    #[tokio::test]
    async fn assigned_technician_updates_progress_only() {
        let Fixture { service, job } = fixture().await;
        let tech_a = Principal::Technician { id: "tech-a".into() };
        let tech_b = Principal::Technician { id: "tech-b".into() };
        let update = ProgressUpdate {
            status: Some("done".into()),
            ..Default::default()
        };

        let task = service
            .update_task_progress(&tech_a, &path(&job, 0), update.clone())
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.min_output, 10);
        assert_eq!(task.task_response, TaskResponse::Pending);

        let err = service
            .update_task_progress(&tech_b, &path(&job, 0), update)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Forbidden(_)));
    }

    #[tokio::test]
    async fn task_lists_are_flattened_per_actor() {
        let Fixture { service, job } = fixture().await;
        let sup_a = Principal::Supervisor { id: "sup-a".into() };
        let views = service.tasks_for_supervisor(&sup_a, "sup-a").await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].task_id, job.devices[0].tasks[0].id);
        assert_eq!(views[0].job_order_name, "Batch-1");

        let tech_b = Principal::Technician { id: "tech-b".into() };
        let views = service.tasks_for_technician(&tech_b, "tech-b").await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].task.task_name, "Inspect");

        assert!(matches!(
            service.tasks_for_supervisor(&sup_a, "sup-b").await,
            Err(JobError::Forbidden(_))
        ));
        let unknown = service.tasks_for_supervisor(&planner(), "ghost").await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn populate_resolves_summaries() {
        let Fixture { service, job } = fixture().await;
        let populated = service.populate(vec![job]).await.unwrap();
        let tech = &populated[0].devices[0].tasks[0].technicians[0];
        assert_eq!(tech.id, "tech-a");
        assert_eq!(tech.role, Role::Technician);
        assert_eq!(tech.supervisor_ref.as_deref(), Some("sup-a"));
    }

    #[tokio::test]
    async fn update_renames_and_keeps_tasks() {
        let Fixture { service, job } = fixture().await;
        let draft = JobOrderDraft {
            job_order_name: Some("Batch-1b".into()),
            devices: None,
        };
        let updated = service.update(&planner(), &job.id, draft).await.unwrap();
        assert_eq!(updated.job_order_name, "Batch-1b");
        assert_eq!(updated.devices, job.devices);
        assert_eq!(updated.created_at, job.created_at);

        service.delete(&planner(), &job.id).await.unwrap();
        assert!(matches!(
            service.get(&planner(), &job.id).await,
            Err(JobError::NotFound(PathSegment::Job))
        ));
    }
}
