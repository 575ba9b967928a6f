//! Per-actor flat task lists.
//!
//! Pure projections of the nested JobOrder → Device → Task structure.

use serde::{Deserialize, Serialize};

use crate::models::job::{Device, JobOrder, Task};
use crate::roster::Roster;

/// A task together with the coordinates of its parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub job_id: String,
    pub job_order_name: String,
    pub device_id: String,
    pub device_name: String,
    pub task_id: String,
    #[serde(flatten)]
    pub task: Task,
}

impl TaskView {
    fn new(job: &JobOrder, device: &Device, task: &Task) -> Self {
        Self {
            job_id: job.id.clone(),
            job_order_name: job.job_order_name.clone(),
            device_id: device.id.clone(),
            device_name: device.device_name.clone(),
            task_id: task.id.clone(),
            task: task.clone(),
        }
    }
}

fn flatten_where(jobs: &[JobOrder], mut keep: impl FnMut(&Task) -> bool) -> Vec<TaskView> {
    jobs.iter()
        .flat_map(|job| job.tasks().map(move |(device, task)| (job, device, task)))
        .filter(|(_, _, task)| keep(task))
        .map(|(job, device, task)| TaskView::new(job, device, task))
        .collect()
}

/// Tasks with at least one technician reporting to `supervisor_id`, once each.
pub fn flatten_for_supervisor(
    jobs: &[JobOrder],
    roster: &Roster,
    supervisor_id: &str,
) -> Vec<TaskView> {
    flatten_where(jobs, |task| {
        task.technicians
            .iter()
            .any(|tech| roster.supervisor_of(tech) == Some(supervisor_id))
    })
}

/// Tasks whose technician set contains `technician_id`.
pub fn flatten_for_technician(jobs: &[JobOrder], technician_id: &str) -> Vec<TaskView> {
    flatten_where(jobs, |task| task.technicians.iter().any(|t| t == technician_id))
}
