//! Worker pool
//!
//! Spawns and tracks the polling loops for every registered task type and
//! provides the single blocking join point, `wait_workers`. Shutdown is a
//! cooperative broadcast: cancelling the pool token stops every worker at
//! its next cancellation check or mid-sleep.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, WorkerOptions};
use crate::executor::TaskExecutor;
use crate::metrics::MetricsRegistry;
use crate::queue::TaskQueue;
use crate::worker::Worker;

/// Manages a set of concurrently running workers and their joint lifecycle.
///
/// All workers share the queue handle and the metrics registry; nothing
/// else. A pool may host workers for many task types at once and places no
/// upper bound on how many are registered.
pub struct WorkerPool {
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<MetricsRegistry>,
    config: Config,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a pool over the given queue.
    pub fn new(queue: Arc<dyn TaskQueue>, config: Config) -> Self {
        Self {
            queue,
            metrics: Arc::new(MetricsRegistry::new()),
            config,
            shutdown: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// The pool's shared metrics registry.
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// A handle on the pool's shutdown signal.
    ///
    /// Cancelling it is equivalent to calling [`shutdown`](Self::shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of workers registered so far and not yet joined.
    pub fn worker_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Spawns `opts.concurrency` independent workers polling
    /// `opts.task_type`.
    ///
    /// Every spawned worker is registered with the pool before this call
    /// returns, so a `wait_workers` issued afterwards cannot miss a
    /// slow-starting worker. May be called repeatedly and concurrently for
    /// different task types.
    pub fn start_worker(&self, opts: WorkerOptions, executor: Arc<dyn TaskExecutor>) {
        let concurrency = opts.concurrency.max(1);
        let poll_interval = opts.poll_interval.unwrap_or(self.config.poll_interval);
        let worker_id = opts
            .worker_id
            .unwrap_or_else(|| self.config.worker_id.clone());
        let domain = opts.domain.or_else(|| self.config.domain.clone());

        info!(
            task_type = %opts.task_type,
            concurrency,
            interval_ms = poll_interval.as_millis() as u64,
            "starting workers"
        );

        let mut handles = self.handles.lock().unwrap();
        for _ in 0..concurrency {
            let worker = Worker {
                task_type: opts.task_type.clone(),
                worker_id: worker_id.clone(),
                domain: domain.clone(),
                poll_interval,
                queue: Arc::clone(&self.queue),
                metrics: Arc::clone(&self.metrics),
                executor: Arc::clone(&executor),
                shutdown: self.shutdown.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }
    }

    /// Blocks until every registered worker has terminated.
    ///
    /// Workers only terminate on shutdown, so without a
    /// [`shutdown`](Self::shutdown) call this waits for the rest of the
    /// process lifetime. Workers registered while the wait is in progress
    /// are awaited too.
    pub async fn wait_workers(&self) {
        loop {
            let handle = { self.handles.lock().unwrap().pop() };
            let Some(handle) = handle else { break };
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task terminated abnormally");
            }
        }
    }

    /// Signals every worker to stop.
    ///
    /// Each worker observes the signal at its next cycle boundary or
    /// mid-sleep, after which [`wait_workers`](Self::wait_workers) returns.
    pub fn shutdown(&self) {
        info!("shutting down worker pool");
        self.shutdown.cancel();
    }
}
