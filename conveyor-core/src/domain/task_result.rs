//! Task result domain types
//!
//! A `TaskResult` is the outcome record a worker submits back to the queue
//! after executing a [`Task`](crate::Task). It is constructed from the task
//! (copying the identity fields), mutated by the task logic and the executor
//! adapter, and submitted exactly once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::task::Task;

/// Execution status of a task, as understood by the queue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
    Canceled,
    TimedOut,
    Skipped,
}

impl TaskStatus {
    /// Whether the queue treats this status as final for the task.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Scheduled | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::TimedOut => "TIMED_OUT",
            TaskStatus::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// One log line produced while executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
    pub log: String,
    pub task_id: String,
    pub created_time: chrono::DateTime<chrono::Utc>,
}

/// Outcome of executing a task, submitted back to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub status: TaskStatus,
    pub task_id: String,
    #[serde(default)]
    pub workflow_instance_id: String,
    /// Open output payload
    #[serde(default)]
    pub output_data: HashMap<String, serde_json::Value>,
    /// Human-readable failure reason; populated only on failure
    #[serde(default)]
    pub reason_for_incompletion: Option<String>,
    #[serde(default)]
    pub callback_after_seconds: i64,
    /// Which worker produced this result
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Ordered, append-only execution log lines
    #[serde(default)]
    pub logs: Vec<TaskLog>,
}

impl TaskResult {
    /// Creates an `InProgress` result for the given task, copying its
    /// identity fields.
    pub fn for_task(task: &Task) -> Self {
        Self {
            status: TaskStatus::InProgress,
            task_id: task.task_id.clone(),
            workflow_instance_id: task.workflow_instance_id.clone(),
            output_data: HashMap::new(),
            reason_for_incompletion: None,
            callback_after_seconds: task.callback_after_seconds,
            worker_id: task.worker_id.clone(),
            logs: Vec::new(),
        }
    }

    /// Creates a `Completed` result for the given task.
    pub fn complete(task: &Task) -> Self {
        let mut result = Self::for_task(task);
        result.status = TaskStatus::Completed;
        result
    }

    /// Creates a `Failed` result for the given task.
    pub fn failed(task: &Task, reason: impl Into<String>) -> Self {
        let mut result = Self::for_task(task);
        result.mark_failed(reason);
        result
    }

    /// Forces this result into `Failed` with the given reason.
    ///
    /// Overwrites any status the task logic may have set.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.reason_for_incompletion = Some(reason.into());
    }

    /// Appends a timestamped log line.
    pub fn add_log(&mut self, line: impl Into<String>) {
        self.logs.push(TaskLog {
            log: line.into(),
            task_id: self.task_id.clone(),
            created_time: chrono::Utc::now(),
        });
    }

    /// Inserts a value into the output payload.
    pub fn add_output(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.output_data.insert(key.into(), value);
    }
}
