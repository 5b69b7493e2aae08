//! Minimal worker process
//!
//! Polls the `echo` task type and completes each task by echoing its input
//! back as output. Ctrl-C triggers a coordinated shutdown.
//!
//! Run with: QUEUE_URL=http://localhost:8080 cargo run --example echo_worker

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conveyor_client::QueueClient;
use conveyor_core::{Task, TaskResult};
use conveyor_worker::{Config, TaskFn, WorkerOptions, WorkerPool};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(_) => {
            info!("no environment configuration, using defaults");
            Config::default()
        }
    };
    config.validate()?;

    info!(
        queue_url = %config.queue_url,
        worker_id = %config.worker_id,
        "starting worker pool"
    );

    let client = Arc::new(QueueClient::new(config.queue_url.clone()));
    let pool = WorkerPool::new(client, config);

    let executor = Arc::new(TaskFn::new(|task: Task| async move {
        let mut result = TaskResult::complete(&task);
        result.add_log(format!("echoing task {}", task.task_id));
        for (key, value) in &task.input_data {
            result.add_output(key.clone(), value.clone());
        }
        Ok(Some(result))
    }));

    pool.start_worker(WorkerOptions::new("echo").with_concurrency(4), executor);

    let token = pool.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    pool.wait_workers().await;
    info!("all workers stopped");
    Ok(())
}
