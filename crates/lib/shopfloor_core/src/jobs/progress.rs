//! Task state transitions.
//!
//! Two independent machines live on a task: the supervisor's response
//! (`pending → accepted | denied`) and the technician's completion state
//! (`undone ⇄ done`). Neither guards the other.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::job::{Task, TaskResponse, TaskStatus};
use crate::models::{FieldError, double_option};

/// Technician progress report. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub actual_output: Option<i64>,
    /// `null` clears the stored time.
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
}

impl ProgressUpdate {
    /// Apply to `task`. Nothing is written unless every field is valid.
    pub fn apply(self, task: &mut Task) -> Result<(), FieldError> {
        let actual_output = self
            .actual_output
            .map(|v| {
                u64::try_from(v).map_err(|_| FieldError::new("actualOutput", "must be non-negative"))
            })
            .transpose()?;
        let status = self
            .status
            .map(|s| {
                TaskStatus::parse(&s).ok_or_else(|| {
                    FieldError::new("status", format!("'{s}' is not one of undone, done"))
                })
            })
            .transpose()?;

        if let Some(v) = actual_output {
            task.actual_output = v;
        }
        if let Some(v) = self.start_time {
            task.start_time = v;
        }
        if let Some(v) = self.end_time {
            task.end_time = v;
        }
        if let Some(v) = status {
            task.status = v;
        }
        Ok(())
    }
}

/// Record a supervisor's decision on `task`.
///
/// Only `accepted` and `denied` may be submitted; an earlier decision is
/// overwritten.
pub fn apply_response(task: &mut Task, value: &str, now: DateTime<Utc>) -> Result<(), FieldError> {
    let response = match TaskResponse::parse(value) {
        Some(r @ (TaskResponse::Accepted | TaskResponse::Denied)) => r,
        _ => {
            return Err(FieldError::new(
                "taskResponse",
                "Invalid taskResponse value",
            ));
        }
    };
    task.task_response = response;
    task.task_response_time = Some(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::fixtures::task;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn status_only_update_leaves_other_fields() {
        let mut t = task("t1", &["tech"]);
        t.actual_output = 5;
        t.start_time = Some(at(8));
        let before = t.clone();

        let update: ProgressUpdate = serde_json::from_str(r#"{"status":"done"}"#).unwrap();
        update.apply(&mut t).unwrap();

        assert_eq!(t.status, TaskStatus::Done);
        assert_eq!(t.actual_output, before.actual_output);
        assert_eq!(t.start_time, before.start_time);
        assert_eq!(t.end_time, before.end_time);
        assert_eq!(t.task_response, before.task_response);
    }

    #[test]
    fn explicit_null_clears_time() {
        let mut t = task("t1", &["tech"]);
        t.start_time = Some(at(8));
        t.end_time = Some(at(9));

        let update: ProgressUpdate = serde_json::from_str(r#"{"endTime":null}"#).unwrap();
        update.apply(&mut t).unwrap();

        assert_eq!(t.start_time, Some(at(8)));
        assert_eq!(t.end_time, None);
    }

    #[test]
    fn completion_can_be_reverted() {
        let mut t = task("t1", &["tech"]);
        t.status = TaskStatus::Done;
        let update = ProgressUpdate {
            status: Some("undone".into()),
            ..Default::default()
        };
        update.apply(&mut t).unwrap();
        assert_eq!(t.status, TaskStatus::Undone);
    }

    #[test]
    fn invalid_update_writes_nothing() {
        let mut t = task("t1", &["tech"]);
        let before = t.clone();
        let update = ProgressUpdate {
            actual_output: Some(12),
            status: Some("finished".into()),
            ..Default::default()
        };
        let err = update.apply(&mut t).unwrap_err();
        assert_eq!(err.field, "status");
        assert_eq!(t, before);

        let update = ProgressUpdate {
            actual_output: Some(-1),
            ..Default::default()
        };
        assert_eq!(update.apply(&mut t).unwrap_err().field, "actualOutput");
    }

    #[test]
    fn response_sets_value_and_time() {
        let mut t = task("t1", &["tech"]);
        apply_response(&mut t, "accepted", at(10)).unwrap();
        assert_eq!(t.task_response, TaskResponse::Accepted);
        assert_eq!(t.task_response_time, Some(at(10)));

        apply_response(&mut t, "denied", at(11)).unwrap();
        assert_eq!(t.task_response, TaskResponse::Denied);
        assert_eq!(t.task_response_time, Some(at(11)));
    }

    #[test]
    fn response_rejects_pending_and_unknown_values() {
        let mut t = task("t1", &["tech"]);
        for value in ["pending", "maybe", ""] {
            let err = apply_response(&mut t, value, at(10)).unwrap_err();
            assert_eq!(err.field, "taskResponse");
        }
        assert_eq!(t.task_response, TaskResponse::Pending);
        assert_eq!(t.task_response_time, None);
    }

    #[test]
    fn response_does_not_touch_completion() {
        let mut t = task("t1", &["tech"]);
        t.status = TaskStatus::Done;
        apply_response(&mut t, "denied", at(10)).unwrap();
        assert_eq!(t.status, TaskStatus::Done);
    }
}
