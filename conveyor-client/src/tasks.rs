//! Task-related API endpoints

use crate::QueueClient;
use crate::error::Result;
use conveyor_core::{Task, TaskResult};
use std::collections::HashMap;

impl QueueClient {
    // =============================================================================
    // Polling & Result Submission
    // =============================================================================

    /// Poll the queue for one task of the given type
    ///
    /// Returns `Ok(None)` when the queue has nothing for this task type.
    /// That is the expected idle case, not an error.
    ///
    /// # Arguments
    /// * `task_type` - The named queue to poll
    /// * `worker_id` - Identifier of the polling worker, for traceability
    /// * `domain` - Optional routing hint passed through to the service
    pub async fn poll_task(
        &self,
        task_type: &str,
        worker_id: &str,
        domain: Option<&str>,
    ) -> Result<Option<Task>> {
        let url = format!("{}/api/tasks/poll/{}", self.base_url, task_type);

        let mut request = self.client.get(&url).query(&[("workerid", worker_id)]);
        if let Some(domain) = domain {
            request = request.query(&[("domain", domain)]);
        }

        let response = request.send().await?;

        self.handle_optional_response(response).await
    }

    /// Submit the result of an executed task
    ///
    /// The queue acknowledges with a success status; there is no useful
    /// response body. Submission is not retried here; the queue's own task
    /// timeout is the recovery path if the update is lost.
    ///
    /// # Arguments
    /// * `result` - The task result to report
    pub async fn update_task(&self, result: &TaskResult) -> Result<()> {
        let url = format!("{}/api/tasks", self.base_url);
        let response = self.client.post(&url).json(result).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Task Query
    // =============================================================================

    /// Get a task by ID
    ///
    /// # Arguments
    /// * `task_id` - The task identifier
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let url = format!("{}/api/tasks/{}", self.base_url, task_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get the pending-task depth for each of the given task types
    ///
    /// # Arguments
    /// * `task_types` - Task types to query
    ///
    /// # Returns
    /// A map from task type to the number of tasks waiting in its queue
    pub async fn queue_sizes(&self, task_types: &[&str]) -> Result<HashMap<String, i64>> {
        let url = format!("{}/api/tasks/queue/sizes", self.base_url);

        let query: Vec<(&str, &str)> = task_types.iter().map(|t| ("taskType", *t)).collect();
        let response = self.client.get(&url).query(&query).send().await?;

        self.handle_response(response).await
    }
}
