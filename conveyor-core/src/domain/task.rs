//! Task domain type
//!
//! A `Task` is one unit of work handed out by the queue service. It is
//! deserialized from the poll response and owned by exactly one worker until
//! that worker produces a [`TaskResult`](crate::TaskResult) for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::task_result::TaskStatus;

/// One unit of work fetched from the queue for a given task type.
///
/// The queue service speaks camelCase JSON; fields the worker does not depend
/// on may be absent and unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Named queue/category this task was polled from
    pub task_type: String,
    /// Unique task identifier
    pub task_id: String,
    /// Workflow instance this task belongs to
    #[serde(default)]
    pub workflow_instance_id: String,
    /// Open input payload
    #[serde(default)]
    pub input_data: HashMap<String, serde_json::Value>,
    /// Status as reported by the queue at poll time
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// How many times this task has been handed out. Informational only.
    #[serde(default)]
    pub poll_count: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub scheduled_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub update_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Delay before the queue hands this task out again after an
    /// `InProgress` update
    #[serde(default)]
    pub callback_after_seconds: i64,
    /// Worker the queue assigned this task to, if any
    #[serde(default)]
    pub worker_id: Option<String>,
}

impl Task {
    /// Creates a task with the given type and id; everything else empty.
    pub fn new(task_type: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            task_id: task_id.into(),
            workflow_instance_id: String::new(),
            input_data: HashMap::new(),
            status: None,
            poll_count: 0,
            retry_count: 0,
            scheduled_time: None,
            start_time: None,
            end_time: None,
            update_time: None,
            callback_after_seconds: 0,
            worker_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_minimal_payload() {
        let task: Task =
            serde_json::from_str(r#"{"taskType":"email","taskId":"t1"}"#).unwrap();
        assert_eq!(task.task_type, "email");
        assert_eq!(task.task_id, "t1");
        assert_eq!(task.poll_count, 0);
        assert!(task.input_data.is_empty());
        assert!(task.status.is_none());
    }

    #[test]
    fn test_ignores_unknown_fields() {
        let task: Task = serde_json::from_str(
            r#"{"taskType":"email","taskId":"t1","somethingNew":{"a":1}}"#,
        )
        .unwrap();
        assert_eq!(task.task_id, "t1");
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let mut task = Task::new("email", "t1");
        task.workflow_instance_id = "wf1".to_string();
        task.callback_after_seconds = 30;

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["taskType"], "email");
        assert_eq!(json["workflowInstanceId"], "wf1");
        assert_eq!(json["callbackAfterSeconds"], 30);
    }
}
