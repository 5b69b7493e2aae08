//! Queue boundary trait
//!
//! The worker loop only needs two queue operations; putting them behind a
//! trait keeps the loop independent of the HTTP transport and lets tests
//! substitute in-memory fixtures.

use async_trait::async_trait;
use conveyor_client::{ClientError, QueueClient};
use conveyor_core::{Task, TaskResult};

/// The queue operations a worker performs each cycle.
///
/// Implementations must be safe for concurrent use: every worker in the pool
/// shares one instance.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Polls for one task of the given type. `Ok(None)` means the queue is
    /// idle for this task type.
    async fn poll_task(
        &self,
        task_type: &str,
        worker_id: &str,
        domain: Option<&str>,
    ) -> Result<Option<Task>, ClientError>;

    /// Submits the result of an executed task.
    async fn update_task(&self, result: &TaskResult) -> Result<(), ClientError>;
}

#[async_trait]
impl TaskQueue for QueueClient {
    async fn poll_task(
        &self,
        task_type: &str,
        worker_id: &str,
        domain: Option<&str>,
    ) -> Result<Option<Task>, ClientError> {
        QueueClient::poll_task(self, task_type, worker_id, domain).await
    }

    async fn update_task(&self, result: &TaskResult) -> Result<(), ClientError> {
        QueueClient::update_task(self, result).await
    }
}
