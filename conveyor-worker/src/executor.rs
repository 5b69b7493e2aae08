//! Executor adapter
//!
//! The boundary between the worker loop and user-supplied task logic. The
//! adapter gives the loop a uniform contract: either there is a result to
//! submit, or there is nothing valid to submit, and an execution error
//! always dominates whatever status the task logic set. Panics in task logic
//! are intercepted here so one failing task body cannot terminate a worker.

use async_trait::async_trait;
use conveyor_core::{Task, TaskResult};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Error reported by task execution logic.
///
/// May carry the partial result the logic had produced before failing; the
/// adapter forces that result to `Failed` before it is submitted.
#[derive(Debug)]
pub struct ExecutionError {
    message: String,
    result: Option<TaskResult>,
}

impl ExecutionError {
    /// Creates an error with no partial result.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            result: None,
        }
    }

    /// Creates an error carrying the partial result produced so far.
    pub fn with_result(message: impl Into<String>, result: TaskResult) -> Self {
        Self {
            message: message.into(),
            result: Some(result),
        }
    }

    /// The failure message, used as the result's incompletion reason.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn into_parts(self) -> (String, Option<TaskResult>) {
        (self.message, self.result)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionError {}

impl From<String> for ExecutionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ExecutionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// User-supplied execution logic for one task type.
///
/// Returning `Ok(None)` means the logic produced nothing to submit; the
/// worker drops the cycle and the queue's own timeout eventually reassigns
/// the task. Returning `Err` marks the task failed; carrying a partial
/// result in the error preserves its output and logs on the wire.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    async fn execute(&self, task: Task) -> Result<Option<TaskResult>, ExecutionError>;
}

/// Adapts a plain async function or closure into a [`TaskExecutor`].
///
/// # Example
///
/// ```
/// use conveyor_core::{Task, TaskResult};
/// use conveyor_worker::{ExecutionError, TaskFn};
///
/// let executor = TaskFn::new(|task: Task| async move {
///     Ok::<_, ExecutionError>(Some(TaskResult::complete(&task)))
/// });
/// # let _ = executor;
/// ```
pub struct TaskFn<F>(F);

impl<F> TaskFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> TaskExecutor for TaskFn<F>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<TaskResult>, ExecutionError>> + Send + 'static,
{
    async fn execute(&self, task: Task) -> Result<Option<TaskResult>, ExecutionError> {
        (self.0)(task).await
    }
}

/// What one execution produced, from the worker's point of view.
#[derive(Debug)]
pub(crate) enum ExecutionOutcome {
    /// Task logic produced a result; submit it as-is.
    Produced(TaskResult),
    /// Task logic reported an error; the result has been forced to `Failed`.
    Errored(TaskResult),
    /// Nothing valid to submit.
    NoResult { error: Option<String> },
}

/// Runs the user logic for one task and normalizes the outcome.
///
/// The user future runs on its own spawned task so a panic inside it is
/// contained at this boundary: the panicked execution is converted into a
/// synthesized `Failed` result and the worker loop carries on.
pub(crate) async fn execute_task(executor: Arc<dyn TaskExecutor>, task: &Task) -> ExecutionOutcome {
    let owned = task.clone();
    let handle = tokio::spawn(async move { executor.execute(owned).await });

    match handle.await {
        Ok(Ok(Some(result))) => ExecutionOutcome::Produced(result),
        Ok(Ok(None)) => ExecutionOutcome::NoResult { error: None },
        Ok(Err(err)) => {
            let (message, result) = err.into_parts();
            match result {
                Some(mut result) => {
                    // execution errors dominate whatever status the logic set
                    result.mark_failed(message);
                    ExecutionOutcome::Errored(result)
                }
                None => ExecutionOutcome::NoResult {
                    error: Some(message),
                },
            }
        }
        Err(join_err) => ExecutionOutcome::Errored(TaskResult::failed(
            task,
            format!("task execution panicked: {}", join_failure_message(join_err)),
        )),
    }
}

fn join_failure_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    } else {
        err.to_string()
    }
}
