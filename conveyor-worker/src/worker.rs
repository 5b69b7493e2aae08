//! Worker polling loop
//!
//! One worker is one long-lived task bound to one task type: poll, execute,
//! submit, sleep, repeat. Every failure inside a cycle is absorbed locally
//! (logged and metered, never propagated), so a bad task or a transient
//! network error costs one cycle, not the worker. The loop exits only when
//! its cancellation token fires, checked at the top of each cycle and during
//! the sleep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::executor::{self, ExecutionOutcome, TaskExecutor};
use crate::metrics::{self, MetricsRegistry};
use crate::queue::TaskQueue;

pub(crate) struct Worker {
    pub(crate) task_type: String,
    pub(crate) worker_id: String,
    pub(crate) domain: Option<String>,
    pub(crate) poll_interval: Duration,
    pub(crate) queue: Arc<dyn TaskQueue>,
    pub(crate) metrics: Arc<MetricsRegistry>,
    pub(crate) executor: Arc<dyn TaskExecutor>,
    pub(crate) shutdown: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(self) {
        info!(
            task_type = %self.task_type,
            worker_id = %self.worker_id,
            interval_ms = self.poll_interval.as_millis() as u64,
            "worker started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        info!(
            task_type = %self.task_type,
            worker_id = %self.worker_id,
            "worker stopped"
        );
    }

    /// One poll-execute-submit cycle. Failures end the cycle, never the loop.
    async fn run_cycle(&self) {
        // Poll
        let started = Instant::now();
        let polled = self
            .queue
            .poll_task(&self.task_type, &self.worker_id, self.domain.as_deref())
            .await;
        self.metrics.increment(metrics::TASK_POLL, &self.task_type);
        self.metrics
            .observe_duration(metrics::TASK_POLL_TIME, &self.task_type, started.elapsed());

        let task = match polled {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_type = %self.task_type, "queue empty");
                return;
            }
            Err(e) => {
                self.metrics
                    .increment(metrics::TASK_POLL_ERROR, &self.task_type);
                error!(task_type = %self.task_type, error = %e, "failed to poll for task");
                return;
            }
        };

        debug!(
            task_type = %self.task_type,
            task_id = %task.task_id,
            poll_count = task.poll_count,
            "polled task"
        );

        // Execute
        let started = Instant::now();
        let outcome = executor::execute_task(Arc::clone(&self.executor), &task).await;
        self.metrics.observe_duration(
            metrics::TASK_EXECUTE_TIME,
            &self.task_type,
            started.elapsed(),
        );

        let mut result = match outcome {
            ExecutionOutcome::Produced(result) => result,
            ExecutionOutcome::Errored(result) => {
                self.metrics
                    .increment(metrics::TASK_EXECUTE_ERROR, &self.task_type);
                warn!(
                    task_type = %self.task_type,
                    task_id = %task.task_id,
                    reason = result.reason_for_incompletion.as_deref().unwrap_or(""),
                    "task execution failed"
                );
                result
            }
            ExecutionOutcome::NoResult { error } => {
                self.metrics
                    .increment(metrics::TASK_EXECUTE_NO_RESULT, &self.task_type);
                // nothing goes on the wire; the queue's own timeout must
                // reassign this task
                error!(
                    task_type = %self.task_type,
                    task_id = %task.task_id,
                    error = error.as_deref().unwrap_or(""),
                    "task logic produced no result, nothing will be submitted"
                );
                return;
            }
        };

        if result.worker_id.is_none() {
            result.worker_id = Some(self.worker_id.clone());
        }

        // Submit
        let payload = match serde_json::to_vec(&result) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics
                    .increment(metrics::TASK_UPDATE_ERROR, &self.task_type);
                error!(
                    task_type = %self.task_type,
                    task_id = %task.task_id,
                    error = %e,
                    "failed to serialize task result"
                );
                return;
            }
        };
        self.metrics.observe(
            metrics::TASK_RESULT_PAYLOAD_SIZE,
            &self.task_type,
            payload.len() as f64,
        );

        let started = Instant::now();
        let submitted = self.queue.update_task(&result).await;
        self.metrics.observe_duration(
            metrics::TASK_UPDATE_TIME,
            &self.task_type,
            started.elapsed(),
        );

        // no resubmission; the queue's task timeout is the recovery path
        if let Err(e) = submitted {
            self.metrics
                .increment(metrics::TASK_UPDATE_ERROR, &self.task_type);
            error!(
                task_type = %self.task_type,
                task_id = %task.task_id,
                error = %e,
                "failed to submit task result"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutionError, TaskFn};
    use async_trait::async_trait;
    use conveyor_client::ClientError;
    use conveyor_core::{Task, TaskResult, TaskStatus};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// FIFO fixture: each poll consumes one distinct task; submissions are
    /// recorded for assertions.
    struct FifoQueue {
        tasks: Mutex<VecDeque<Task>>,
        submitted: Mutex<Vec<TaskResult>>,
        fail_polls: bool,
        fail_updates: bool,
    }

    impl FifoQueue {
        fn new(tasks: Vec<Task>) -> Self {
            Self {
                tasks: Mutex::new(tasks.into()),
                submitted: Mutex::new(Vec::new()),
                fail_polls: false,
                fail_updates: false,
            }
        }

        fn submitted(&self) -> Vec<TaskResult> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskQueue for FifoQueue {
        async fn poll_task(
            &self,
            _task_type: &str,
            _worker_id: &str,
            _domain: Option<&str>,
        ) -> Result<Option<Task>, ClientError> {
            if self.fail_polls {
                return Err(ClientError::api_error(503, "unavailable"));
            }
            Ok(self.tasks.lock().unwrap().pop_front())
        }

        async fn update_task(&self, result: &TaskResult) -> Result<(), ClientError> {
            if self.fail_updates {
                return Err(ClientError::api_error(500, "write failed"));
            }
            self.submitted.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    fn worker(
        queue: Arc<FifoQueue>,
        metrics: Arc<MetricsRegistry>,
        executor: Arc<dyn TaskExecutor>,
        shutdown: CancellationToken,
    ) -> Worker {
        Worker {
            task_type: "email".to_string(),
            worker_id: "test-worker".to_string(),
            domain: None,
            poll_interval: Duration::from_millis(10),
            queue,
            metrics,
            executor,
            shutdown,
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    fn task(id: &str) -> Task {
        let mut task = Task::new("email", id);
        task.workflow_instance_id = "wf1".to_string();
        task
    }

    #[tokio::test]
    async fn test_completed_result_reaches_the_wire_unchanged() {
        let queue = Arc::new(FifoQueue::new(vec![task("t1")]));
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|task: Task| async move {
            let mut result = TaskResult::complete(&task);
            result.add_output("x", serde_json::json!(1));
            Ok(Some(result))
        }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        wait_for(|| !queue.submitted().is_empty()).await;
        shutdown.cancel();
        handle.await.unwrap();

        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].task_id, "t1");
        assert_eq!(submitted[0].status, TaskStatus::Completed);
        assert_eq!(submitted[0].output_data["x"], serde_json::json!(1));
        assert_eq!(submitted[0].worker_id.as_deref(), Some("test-worker"));

        assert!(metrics.counter(metrics::TASK_POLL, "email") >= 1);
        assert_eq!(metrics.counter(metrics::TASK_EXECUTE_ERROR, "email"), 0);
        assert!(metrics.timer(metrics::TASK_RESULT_PAYLOAD_SIZE, "email").is_some());
    }

    #[tokio::test]
    async fn test_execution_error_dominates_user_status() {
        let queue = Arc::new(FifoQueue::new(vec![task("t2")]));
        let metrics = Arc::new(MetricsRegistry::new());
        // the logic reports IN_PROGRESS but also errors out
        let executor = Arc::new(TaskFn::new(|task: Task| async move {
            let result = TaskResult::for_task(&task);
            Err(ExecutionError::with_result("boom", result))
        }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        wait_for(|| !queue.submitted().is_empty()).await;
        shutdown.cancel();
        handle.await.unwrap();

        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].task_id, "t2");
        assert_eq!(submitted[0].status, TaskStatus::Failed);
        assert_eq!(submitted[0].reason_for_incompletion.as_deref(), Some("boom"));
        assert_eq!(metrics.counter(metrics::TASK_EXECUTE_ERROR, "email"), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_polls_without_executing() {
        let queue = Arc::new(FifoQueue::new(vec![]));
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|_task: Task| async move {
            panic!("executor must not run on an empty queue")
        }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        wait_for(|| metrics.counter(metrics::TASK_POLL, "email") >= 3).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(queue.submitted().is_empty());
        assert_eq!(metrics.counter(metrics::TASK_POLL_ERROR, "email"), 0);
        assert!(metrics.timer(metrics::TASK_EXECUTE_TIME, "email").is_none());
    }

    #[tokio::test]
    async fn test_no_result_skips_submit_and_loop_survives() {
        // first task yields nothing, second completes; the worker must
        // submit only the second
        let queue = Arc::new(FifoQueue::new(vec![task("t1"), task("t2")]));
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|task: Task| async move {
            if task.task_id == "t1" {
                Ok(None)
            } else {
                Ok(Some(TaskResult::complete(&task)))
            }
        }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        wait_for(|| !queue.submitted().is_empty()).await;
        shutdown.cancel();
        handle.await.unwrap();

        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].task_id, "t2");
        assert_eq!(metrics.counter(metrics::TASK_EXECUTE_NO_RESULT, "email"), 1);
    }

    #[tokio::test]
    async fn test_poll_errors_are_absorbed() {
        let mut fifo = FifoQueue::new(vec![]);
        fifo.fail_polls = true;
        let queue = Arc::new(fifo);
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|_task: Task| async move { Ok(None) }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        wait_for(|| metrics.counter(metrics::TASK_POLL_ERROR, "email") >= 3).await;
        shutdown.cancel();
        handle.await.unwrap();

        // every attempt failed, none executed, none submitted
        assert_eq!(
            metrics.counter(metrics::TASK_POLL, "email"),
            metrics.counter(metrics::TASK_POLL_ERROR, "email")
        );
        assert!(queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submit_errors_are_absorbed() {
        let mut fifo = FifoQueue::new(vec![task("t1"), task("t2")]);
        fifo.fail_updates = true;
        let queue = Arc::new(fifo);
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|task: Task| async move {
            Ok(Some(TaskResult::complete(&task)))
        }));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&metrics), executor, shutdown.clone()).run(),
        );

        // both tasks get attempted despite every submission failing
        wait_for(|| metrics.counter(metrics::TASK_UPDATE_ERROR, "email") >= 2).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_polling_interval_is_honored() {
        let queue = Arc::new(FifoQueue::new(vec![task("t1"), task("t2"), task("t3")]));
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|task: Task| async move {
            Ok(Some(TaskResult::complete(&task)))
        }));

        let shutdown = CancellationToken::new();
        let mut w = worker(Arc::clone(&queue), metrics, executor, shutdown.clone());
        w.poll_interval = Duration::from_millis(50);

        let started = Instant::now();
        let handle = tokio::spawn(w.run());

        wait_for(|| queue.submitted().len() == 3).await;
        let elapsed = started.elapsed();
        shutdown.cancel();
        handle.await.unwrap();

        // three cycles are separated by two full sleeps
        assert!(
            elapsed >= Duration::from_millis(100),
            "3 cycles at 50ms took only {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let queue = Arc::new(FifoQueue::new(vec![]));
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = Arc::new(TaskFn::new(|_task: Task| async move { Ok(None) }));

        let shutdown = CancellationToken::new();
        let mut w = worker(queue, Arc::clone(&metrics), executor, shutdown.clone());
        w.poll_interval = Duration::from_secs(3600);

        let handle = tokio::spawn(w.run());
        wait_for(|| metrics.counter(metrics::TASK_POLL, "email") >= 1).await;

        let started = Instant::now();
        shutdown.cancel();
        handle.await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
