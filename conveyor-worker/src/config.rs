//! Worker pool configuration
//!
//! Pool-wide settings (queue URL, worker identity, default polling cadence)
//! plus the per-registration `WorkerOptions` passed to
//! [`WorkerPool::start_worker`](crate::WorkerPool::start_worker).

use std::time::Duration;

/// Pool-wide configuration
///
/// The worker identity is resolved once, eagerly, when the configuration is
/// built and carried as a plain field; workers never consult process-global
/// state for it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue service base URL (e.g., "http://localhost:8080")
    pub queue_url: String,

    /// Identifier stamped on submitted results when no per-registration
    /// override is given
    pub worker_id: String,

    /// Default sleep between polling cycles. Zero means busy-polling, which
    /// is legal but rarely what you want.
    pub poll_interval: Duration,

    /// Optional routing hint passed through to every poll
    pub domain: Option<String>,
}

impl Config {
    /// Creates a configuration with defaults for the given queue URL
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            worker_id: default_worker_id(),
            poll_interval: Duration::from_millis(1000),
            domain: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - QUEUE_URL (required)
    /// - WORKER_ID (optional, default: hostname or a generated id)
    /// - POLL_INTERVAL_MS (optional, milliseconds, default: 1000)
    /// - TASK_DOMAIN (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let queue_url = std::env::var("QUEUE_URL")
            .map_err(|_| anyhow::anyhow!("QUEUE_URL environment variable not set"))?;

        let worker_id = std::env::var("WORKER_ID")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(default_worker_id);

        let poll_interval = std::env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1000));

        let domain = std::env::var("TASK_DOMAIN").ok().filter(|d| !d.is_empty());

        Ok(Self {
            queue_url,
            worker_id,
            poll_interval,
            domain,
        })
    }

    /// Overrides the worker identity
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// Overrides the default polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the routing domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.is_empty() {
            anyhow::bail!("worker_id cannot be empty");
        }

        if self.queue_url.is_empty() {
            anyhow::bail!("queue_url cannot be empty");
        }

        if !self.queue_url.starts_with("http://") && !self.queue_url.starts_with("https://") {
            anyhow::bail!("queue_url must start with http:// or https://");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Resolves the default worker identity once, at configuration time.
///
/// Prefers the machine hostname; falls back to a generated id so two
/// anonymous processes never collide.
fn default_worker_id() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()))
}

/// Options for one `start_worker` registration
///
/// `worker_id` and `domain` fall back to the pool [`Config`] when unset;
/// `poll_interval` falls back to the pool default.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// The named queue to poll
    pub task_type: String,

    /// How many independent polling loops to run for this task type
    pub concurrency: usize,

    /// Sleep between polling cycles, if different from the pool default
    pub poll_interval: Option<Duration>,

    /// Routing hint override for this registration
    pub domain: Option<String>,

    /// Worker identity override for this registration
    pub worker_id: Option<String>,
}

impl WorkerOptions {
    /// Creates options for the given task type with a single worker
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            concurrency: 1,
            poll_interval: None,
            domain: None,
            worker_id: None,
        }
    }

    /// Sets the number of concurrent workers (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the polling interval for this registration
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the routing domain for this registration
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the worker identity for this registration
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }
}
