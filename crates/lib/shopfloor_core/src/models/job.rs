//! Job order documents: JobOrder → Device → Task.
//!
//! A job order is the only persisted root. Devices and tasks live inside it
//! and are addressed by their generated ids within the loaded document.
//!
//! The technician reference type is generic so the same shape can carry raw
//! user ids (`String`, the stored form) or resolved [`UserSummary`] values.
//!
//! [`UserSummary`]: super::user::UserSummary

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Department;

/// Technician-controlled completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Undone,
    Done,
}

impl TaskStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "undone" => Some(TaskStatus::Undone),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Supervisor-controlled approval state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskResponse {
    #[default]
    Pending,
    Accepted,
    Denied,
}

impl TaskResponse {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskResponse::Pending),
            "accepted" => Some(TaskResponse::Accepted),
            "denied" => Some(TaskResponse::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task<T = String> {
    pub id: String,
    pub task_type: Department,
    pub task_name: String,
    pub department: Department,
    #[serde(default)]
    pub min_output: u64,
    #[serde(default)]
    pub actual_output: u64,
    #[serde(default)]
    pub current_time: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: DateTime<Utc>,
    pub technicians: Vec<T>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub task_response: TaskResponse,
    pub task_response_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device<T = String> {
    pub id: String,
    pub device_name: String,
    pub serial_number: String,
    pub tasks: Vec<Task<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOrder<T = String> {
    pub id: String,
    pub job_order_name: String,
    pub devices: Vec<Device<T>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which segment of a `(job, device, task)` path failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    Job,
    Device,
    Task,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathSegment::Job => "JobOrder",
            PathSegment::Device => "Device",
            PathSegment::Task => "Task",
        })
    }
}

/// Compound address of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPath {
    pub job_id: String,
    pub device_id: String,
    pub task_id: String,
}

impl JobOrder<String> {
    /// Resolve a device/task pair inside this job order.
    pub fn task_mut(&mut self, device_id: &str, task_id: &str) -> Result<&mut Task, PathSegment> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .ok_or(PathSegment::Device)?;
        device
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(PathSegment::Task)
    }

    /// Iterate every `(device, task)` pair in document order.
    pub fn tasks(&self) -> impl Iterator<Item = (&Device, &Task)> {
        self.devices
            .iter()
            .flat_map(|d| d.tasks.iter().map(move |t| (d, t)))
    }
}

impl<T> JobOrder<T> {
    /// Replace technician references, dropping those `f` cannot resolve.
    pub fn resolve_technicians<U>(self, mut f: impl FnMut(T) -> Option<U>) -> JobOrder<U> {
        JobOrder {
            id: self.id,
            job_order_name: self.job_order_name,
            devices: self
                .devices
                .into_iter()
                .map(|d| d.resolve_technicians(&mut f))
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl<T> Device<T> {
    fn resolve_technicians<U>(self, f: &mut impl FnMut(T) -> Option<U>) -> Device<U> {
        Device {
            id: self.id,
            device_name: self.device_name,
            serial_number: self.serial_number,
            tasks: self
                .tasks
                .into_iter()
                .map(|t| t.resolve_technicians(&mut *f))
                .collect(),
        }
    }
}

impl<T> Task<T> {
    fn resolve_technicians<U>(self, f: &mut impl FnMut(T) -> Option<U>) -> Task<U> {
        Task {
            id: self.id,
            task_type: self.task_type,
            task_name: self.task_name,
            department: self.department,
            min_output: self.min_output,
            actual_output: self.actual_output,
            current_time: self.current_time,
            start_time: self.start_time,
            end_time: self.end_time,
            date: self.date,
            technicians: self.technicians.into_iter().filter_map(&mut *f).collect(),
            status: self.status,
            task_response: self.task_response,
            task_response_time: self.task_response_time,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn task_mut_reports_missing_segment() {
        let mut job = job("j1", vec![device("d1", vec![task("t1", &[])])]);
        assert!(job.task_mut("d1", "t1").is_ok());
        assert_eq!(job.task_mut("d2", "t1").unwrap_err(), PathSegment::Device);
        assert_eq!(job.task_mut("d1", "t2").unwrap_err(), PathSegment::Task);
    }

    #[test]
    fn resolve_technicians_drops_unknown_references() {
        let job = job("j1", vec![device("d1", vec![task("t1", &["a", "ghost", "b"])])]);
        let resolved = job.resolve_technicians(|id| (id != "ghost").then(|| id.to_uppercase()));
        assert_eq!(resolved.devices[0].tasks[0].technicians, vec!["A", "B"]);
    }

    #[test]
    fn task_defaults_when_state_fields_absent() {
        let json = serde_json::json!({
            "id": "t1",
            "taskType": "quality",
            "taskName": "Inspect",
            "department": "quality",
            "startTime": null,
            "endTime": null,
            "date": "2026-01-01T00:00:00Z",
            "technicians": [],
            "taskResponseTime": null
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.status, TaskStatus::Undone);
        assert_eq!(task.task_response, TaskResponse::Pending);
        assert_eq!(task.actual_output, 0);
    }
}
