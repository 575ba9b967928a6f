//! Job order payloads and their validation.
//!
//! Drafts are deliberately loose (strings for enums, signed numbers) so that
//! every problem is reported as a [`FieldError`] naming the exact field path
//! instead of a generic deserialization failure.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::job::{Device, JobOrder, Task, TaskResponse, TaskStatus};
use crate::models::{Department, FieldError};
use crate::roster::Roster;
use crate::uuid::new_id;

/// Payload for creating a job order, or patching one.
///
/// On update, an absent field keeps the stored value; a present `devices`
/// array replaces the stored one wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOrderDraft {
    #[serde(alias = "name")]
    pub job_order_name: Option<String>,
    pub devices: Option<Vec<DeviceDraft>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDraft {
    /// Id of a stored device to keep. Absent or unknown ids get a generated one.
    pub id: Option<String>,
    pub device_name: Option<String>,
    /// Accepts a string or a number.
    pub serial_number: Option<Value>,
    /// Absent on a kept device: its stored tasks are kept too.
    pub tasks: Option<Vec<TaskDraft>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Id of a stored task to keep. Omitted fields then default to that task's
    /// values. Absent or unknown ids get a generated one.
    pub id: Option<String>,
    pub task_type: Option<String>,
    pub task_name: Option<String>,
    pub department: Option<String>,
    pub min_output: Option<i64>,
    pub actual_output: Option<i64>,
    pub current_time: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: Option<DateTime<Utc>>,
    pub technicians: Option<Vec<String>>,
    pub status: Option<String>,
    pub task_response: Option<String>,
    pub task_response_time: Option<DateTime<Utc>>,
}

fn required(path: &str) -> FieldError {
    FieldError::new(path, "is required")
}

fn parse_department(value: &str, path: &str) -> Result<Department, FieldError> {
    Department::parse(value).ok_or_else(|| {
        FieldError::new(
            path,
            format!("'{value}' is not one of production, quality, testing"),
        )
    })
}

fn non_negative(value: i64, path: &str) -> Result<u64, FieldError> {
    u64::try_from(value).map_err(|_| FieldError::new(path, "must be non-negative"))
}

fn serial_to_string(value: Value, path: &str) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FieldError::new(path, "must be a string or a number")),
    }
}

impl JobOrderDraft {
    /// Build a new job order. Every id is generated; ids in the draft are ignored.
    pub fn into_new(self, now: DateTime<Utc>) -> Result<JobOrder, FieldError> {
        let job_order_name = self.job_order_name.ok_or_else(|| required("jobOrderName"))?;
        let devices = build_devices(self.devices.unwrap_or_default(), &[], now)?;
        Ok(JobOrder {
            id: new_id(),
            job_order_name,
            devices,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply this draft as a patch over `existing`.
    pub fn apply_to(self, existing: &JobOrder, now: DateTime<Utc>) -> Result<JobOrder, FieldError> {
        let devices = match self.devices {
            Some(drafts) => build_devices(drafts, &existing.devices, now)?,
            None => existing.devices.clone(),
        };
        Ok(JobOrder {
            id: existing.id.clone(),
            job_order_name: self
                .job_order_name
                .unwrap_or_else(|| existing.job_order_name.clone()),
            devices,
            created_at: existing.created_at,
            updated_at: now,
        })
    }
}

fn build_devices(
    drafts: Vec<DeviceDraft>,
    existing: &[Device],
    now: DateTime<Utc>,
) -> Result<Vec<Device>, FieldError> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| {
            let path = format!("devices[{i}]");
            let base = draft
                .id
                .as_deref()
                .and_then(|id| existing.iter().find(|d| d.id == id));
            draft.build(&path, base, now)
        })
        .collect()
}

impl DeviceDraft {
    fn build(self, path: &str, base: Option<&Device>, now: DateTime<Utc>) -> Result<Device, FieldError> {
        let device_name = match (self.device_name, base) {
            (Some(name), _) => name,
            (None, Some(b)) => b.device_name.clone(),
            (None, None) => return Err(required(&format!("{path}.deviceName"))),
        };
        let serial_number = match (self.serial_number, base) {
            (Some(v), _) => serial_to_string(v, &format!("{path}.serialNumber"))?,
            (None, Some(b)) => b.serial_number.clone(),
            (None, None) => return Err(required(&format!("{path}.serialNumber"))),
        };
        let existing_tasks = base.map(|b| b.tasks.as_slice()).unwrap_or_default();
        let tasks = match self.tasks {
            Some(drafts) => drafts
                .into_iter()
                .enumerate()
                .map(|(j, draft)| {
                    let task_base = draft
                        .id
                        .as_deref()
                        .and_then(|id| existing_tasks.iter().find(|t| t.id == id));
                    draft.build(&format!("{path}.tasks[{j}]"), task_base, now)
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => existing_tasks.to_vec(),
        };
        Ok(Device {
            id: base.map_or_else(new_id, |b| b.id.clone()),
            device_name,
            serial_number,
            tasks,
        })
    }
}

impl TaskDraft {
    fn build(self, path: &str, base: Option<&Task>, now: DateTime<Utc>) -> Result<Task, FieldError> {
        let field = |name: &str| format!("{path}.{name}");

        let task_type = match (self.task_type, base) {
            (Some(v), _) => parse_department(&v, &field("taskType"))?,
            (None, Some(b)) => b.task_type,
            (None, None) => return Err(required(&field("taskType"))),
        };
        let department = match (self.department, base) {
            (Some(v), _) => parse_department(&v, &field("department"))?,
            (None, Some(b)) => b.department,
            (None, None) => return Err(required(&field("department"))),
        };
        let task_name = match (self.task_name, base) {
            (Some(v), _) => v,
            (None, Some(b)) => b.task_name.clone(),
            (None, None) => return Err(required(&field("taskName"))),
        };
        let number = |value: Option<i64>, name: &str, fallback: u64| -> Result<u64, FieldError> {
            value.map_or(Ok(fallback), |v| non_negative(v, &field(name)))
        };
        let status = match (self.status, base) {
            (Some(v), _) => TaskStatus::parse(&v).ok_or_else(|| {
                FieldError::new(field("status"), format!("'{v}' is not one of undone, done"))
            })?,
            (None, Some(b)) => b.status,
            (None, None) => TaskStatus::default(),
        };
        let task_response = match (self.task_response, base) {
            (Some(v), _) => TaskResponse::parse(&v).ok_or_else(|| {
                FieldError::new(
                    field("taskResponse"),
                    format!("'{v}' is not one of pending, accepted, denied"),
                )
            })?,
            (None, Some(b)) => b.task_response,
            (None, None) => TaskResponse::default(),
        };

        Ok(Task {
            id: base.map_or_else(new_id, |b| b.id.clone()),
            task_type,
            task_name,
            department,
            min_output: number(self.min_output, "minOutput", base.map_or(0, |b| b.min_output))?,
            actual_output: number(
                self.actual_output,
                "actualOutput",
                base.map_or(0, |b| b.actual_output),
            )?,
            current_time: number(
                self.current_time,
                "currentTime",
                base.map_or(0, |b| b.current_time),
            )?,
            start_time: self.start_time.or(base.and_then(|b| b.start_time)),
            end_time: self.end_time.or(base.and_then(|b| b.end_time)),
            date: self.date.or(base.map(|b| b.date)).unwrap_or(now),
            technicians: match (self.technicians, base) {
                (Some(v), _) => v,
                (None, Some(b)) => b.technicians.clone(),
                (None, None) => Vec::new(),
            },
            status,
            task_response,
            task_response_time: self
                .task_response_time
                .or(base.and_then(|b| b.task_response_time)),
        })
    }
}

/// Check the structural invariants of a complete job order.
pub fn validate(job: &JobOrder, roster: &Roster) -> Result<(), FieldError> {
    if job.job_order_name.trim().is_empty() {
        return Err(required("jobOrderName"));
    }

    let mut device_ids = HashSet::new();
    for (i, device) in job.devices.iter().enumerate() {
        let path = format!("devices[{i}]");
        if !device_ids.insert(device.id.as_str()) {
            return Err(FieldError::new(format!("{path}.id"), "duplicate device id"));
        }
        if device.device_name.trim().is_empty() {
            return Err(required(&format!("{path}.deviceName")));
        }
        if device.serial_number.trim().is_empty() {
            return Err(required(&format!("{path}.serialNumber")));
        }

        let mut task_ids = HashSet::new();
        for (j, task) in device.tasks.iter().enumerate() {
            let path = format!("{path}.tasks[{j}]");
            if !task_ids.insert(task.id.as_str()) {
                return Err(FieldError::new(format!("{path}.id"), "duplicate task id"));
            }
            if task.task_name.trim().is_empty() {
                return Err(required(&format!("{path}.taskName")));
            }
            validate_technicians(&task.technicians, roster, &path)?;
        }
    }
    Ok(())
}

fn validate_technicians(technicians: &[String], roster: &Roster, path: &str) -> Result<(), FieldError> {
    let mut seen = HashSet::new();
    for (k, tech) in technicians.iter().enumerate() {
        let field = format!("{path}.technicians[{k}]");
        if !seen.insert(tech.as_str()) {
            return Err(FieldError::new(field, format!("duplicate technician '{tech}'")));
        }
        match roster.get(tech) {
            None => return Err(FieldError::new(field, format!("unknown user '{tech}'"))),
            Some(_) if !roster.is_technician(tech) => {
                return Err(FieldError::new(field, format!("user '{tech}' is not a technician")));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::models::user::fixtures::user;
    use serde_json::json;

    fn roster() -> Roster {
        Roster::from_users(&[
            user("sup-a", Role::Supervisor, None),
            user("tech-a", Role::Technician, Some("sup-a")),
        ])
    }

    fn batch_one() -> JobOrderDraft {
        serde_json::from_value(json!({
            "name": "Batch-1",
            "devices": [{
                "deviceName": "D1",
                "serialNumber": "S1",
                "tasks": [{
                    "taskType": "production",
                    "taskName": "Assemble",
                    "department": "production",
                    "technicians": ["tech-a"]
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn new_job_gets_ids_and_default_states() {
        let job = batch_one().into_new(Utc::now()).unwrap();
        validate(&job, &roster()).unwrap();
        assert_eq!(job.job_order_name, "Batch-1");
        let task = &job.devices[0].tasks[0];
        assert!(!job.id.is_empty());
        assert!(!job.devices[0].id.is_empty());
        assert!(!task.id.is_empty());
        assert_eq!(task.status, TaskStatus::Undone);
        assert_eq!(task.task_response, TaskResponse::Pending);
        assert_eq!(task.min_output, 0);
    }

    #[test]
    fn invalid_enum_names_field_path() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap()[0].task_type = Some("assembly".into());
        let err = draft.into_new(Utc::now()).unwrap_err();
        assert_eq!(err.field, "devices[0].tasks[0].taskType");
    }

    #[test]
    fn missing_job_name_is_rejected() {
        let mut draft = batch_one();
        draft.job_order_name = None;
        assert_eq!(draft.into_new(Utc::now()).unwrap_err().field, "jobOrderName");
    }

    #[test]
    fn negative_output_is_rejected() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap()[0].min_output = Some(-1);
        let err = draft.into_new(Utc::now()).unwrap_err();
        assert_eq!(err.field, "devices[0].tasks[0].minOutput");
    }

    #[test]
    fn numeric_serial_is_accepted() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].serial_number = Some(json!(4711));
        let job = draft.into_new(Utc::now()).unwrap();
        assert_eq!(job.devices[0].serial_number, "4711");
    }

    #[test]
    fn unknown_or_non_technician_reference_is_rejected() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap()[0].technicians =
            Some(vec!["tech-a".into(), "ghost".into()]);
        let job = draft.into_new(Utc::now()).unwrap();
        let err = validate(&job, &roster()).unwrap_err();
        assert_eq!(err.field, "devices[0].tasks[0].technicians[1]");

        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap()[0].technicians = Some(vec!["sup-a".into()]);
        let job = draft.into_new(Utc::now()).unwrap();
        assert!(validate(&job, &roster()).unwrap_err().message.contains("not a technician"));
    }

    #[test]
    fn duplicate_technician_is_rejected() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap()[0].technicians =
            Some(vec!["tech-a".into(), "tech-a".into()]);
        let job = draft.into_new(Utc::now()).unwrap();
        assert!(validate(&job, &roster()).is_err());
    }

    #[test]
    fn patch_keeps_identity_and_state_of_referenced_task() {
        let mut job = batch_one().into_new(Utc::now()).unwrap();
        job.devices[0].tasks[0].task_response = TaskResponse::Accepted;
        let device_id = job.devices[0].id.clone();
        let task_id = job.devices[0].tasks[0].id.clone();

        let patch: JobOrderDraft = serde_json::from_value(json!({
            "devices": [{
                "id": device_id,
                "tasks": [
                    { "id": task_id, "taskName": "Assemble v2" },
                    { "taskType": "quality", "taskName": "Inspect", "department": "quality" }
                ]
            }]
        }))
        .unwrap();

        let updated = patch.apply_to(&job, Utc::now()).unwrap();
        validate(&updated, &roster()).unwrap();
        assert_eq!(updated.job_order_name, "Batch-1");
        assert_eq!(updated.devices[0].id, device_id);
        let kept = &updated.devices[0].tasks[0];
        assert_eq!(kept.id, task_id);
        assert_eq!(kept.task_name, "Assemble v2");
        assert_eq!(kept.task_response, TaskResponse::Accepted);
        assert_eq!(kept.technicians, vec!["tech-a"]);
        assert_eq!(updated.devices[0].tasks[1].task_response, TaskResponse::Pending);
    }

    #[test]
    fn patch_removing_devices_is_allowed() {
        let job = batch_one().into_new(Utc::now()).unwrap();
        let patch: JobOrderDraft = serde_json::from_value(json!({ "devices": [] })).unwrap();
        let updated = patch.apply_to(&job, Utc::now()).unwrap();
        assert!(updated.devices.is_empty());
        validate(&updated, &roster()).unwrap();
    }

    #[test]
    fn create_ignores_client_ids() {
        let draft: JobOrderDraft = serde_json::from_value(json!({
            "jobOrderName": "J",
            "devices": [{
                "id": "",
                "deviceName": "D",
                "serialNumber": "S",
                "tasks": [
                    { "id": "my-task", "taskType": "testing", "taskName": "A", "department": "testing" },
                    { "id": "my-task", "taskType": "testing", "taskName": "B", "department": "testing" }
                ]
            }]
        }))
        .unwrap();
        let job = draft.into_new(Utc::now()).unwrap();
        validate(&job, &roster()).unwrap();
        let device = &job.devices[0];
        assert!(!device.id.is_empty());
        assert!(device.tasks.iter().all(|t| t.id != "my-task" && !t.id.is_empty()));
        assert_ne!(device.tasks[0].id, device.tasks[1].id);
    }

    #[test]
    fn patch_regenerates_unknown_ids() {
        let job = batch_one().into_new(Utc::now()).unwrap();
        let device_id = job.devices[0].id.clone();
        let patch: JobOrderDraft = serde_json::from_value(json!({
            "devices": [
                { "id": device_id, "tasks": [
                    { "id": "ghost", "taskType": "testing", "taskName": "New", "department": "testing" }
                ]},
                { "id": "", "deviceName": "D2", "serialNumber": "S2" }
            ]
        }))
        .unwrap();
        let updated = patch.apply_to(&job, Utc::now()).unwrap();
        validate(&updated, &roster()).unwrap();
        assert_eq!(updated.devices[0].id, device_id);
        let task_id = &updated.devices[0].tasks[0].id;
        assert!(task_id != "ghost" && !task_id.is_empty());
        assert!(!updated.devices[1].id.is_empty());
    }

    #[test]
    fn patch_reorders_and_drops_by_id() {
        let mut draft = batch_one();
        draft.devices.as_mut().unwrap()[0].tasks.as_mut().unwrap().extend([
            serde_json::from_value(json!({
                "taskType": "quality", "taskName": "Inspect", "department": "quality"
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "taskType": "testing", "taskName": "Test", "department": "testing"
            }))
            .unwrap(),
        ]);
        let job = draft.into_new(Utc::now()).unwrap();
        let device_id = job.devices[0].id.clone();
        let ids: Vec<String> = job.devices[0].tasks.iter().map(|t| t.id.clone()).collect();

        let patch: JobOrderDraft = serde_json::from_value(json!({
            "devices": [{ "id": device_id, "tasks": [{ "id": ids[2] }, { "id": ids[0] }] }]
        }))
        .unwrap();
        let updated = patch.apply_to(&job, Utc::now()).unwrap();
        let tasks = &updated.devices[0].tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, ids[2]);
        assert_eq!(tasks[0].task_name, "Test");
        assert_eq!(tasks[1].id, ids[0]);
        assert_eq!(tasks[1].task_name, "Assemble");
        assert!(tasks.iter().all(|t| t.id != ids[1]));
    }

    #[test]
    fn patch_repeating_a_stored_task_id_is_rejected() {
        let job = batch_one().into_new(Utc::now()).unwrap();
        let device_id = job.devices[0].id.clone();
        let task_id = job.devices[0].tasks[0].id.clone();
        let patch: JobOrderDraft = serde_json::from_value(json!({
            "devices": [{ "id": device_id, "tasks": [{ "id": task_id }, { "id": task_id }] }]
        }))
        .unwrap();
        let updated = patch.apply_to(&job, Utc::now()).unwrap();
        assert_eq!(validate(&updated, &roster()).unwrap_err().field, "devices[0].tasks[1].id");
    }
}
