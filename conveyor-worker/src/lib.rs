//! Conveyor Worker
//!
//! The orchestration core of the Conveyor SDK: a pool of long-running
//! polling loops that fetch tasks from the queue service, run them through
//! user-supplied execution logic, and report the outcomes back.
//!
//! Architecture:
//! - Configuration: pool-wide settings plus per-registration options
//! - Queue boundary: the `TaskQueue` trait over the HTTP client
//! - Executor adapter: uniform failure handling around user task logic
//! - Metrics: thread-safe per-task-type counters and timers
//! - Worker/Pool: the polling loops and their joint lifecycle
//!
//! Every failure inside a polling cycle is absorbed locally (logged and
//! metered); one bad task or one transient network blip never takes a worker
//! down. Shutdown is coordinated through a cancellation token so that
//! `WorkerPool::wait_workers` returns deterministically.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use conveyor_client::QueueClient;
//! use conveyor_core::{Task, TaskResult};
//! use conveyor_worker::{Config, TaskFn, WorkerOptions, WorkerPool};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("http://localhost:8080");
//!     let client = Arc::new(QueueClient::new(config.queue_url.clone()));
//!     let pool = WorkerPool::new(client, config);
//!
//!     pool.start_worker(
//!         WorkerOptions::new("email_send").with_concurrency(4),
//!         Arc::new(TaskFn::new(|task: Task| async move {
//!             Ok(Some(TaskResult::complete(&task)))
//!         })),
//!     );
//!
//!     pool.wait_workers().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod executor;
pub mod metrics;
pub mod pool;
pub mod queue;
mod worker;

pub use config::{Config, WorkerOptions};
pub use executor::{ExecutionError, TaskExecutor, TaskFn};
pub use metrics::{MetricsRegistry, TimerStats};
pub use pool::WorkerPool;
pub use queue::TaskQueue;
