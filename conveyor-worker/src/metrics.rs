//! Worker metrics
//!
//! An in-memory registry of per-task-type counters and timers, shared by
//! every worker in the pool. Synchronization lives entirely inside the
//! registry; workers record observations without any locking of their own.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Poll attempts, one per cycle, successful or not
pub const TASK_POLL: &str = "task_poll";
/// Poll calls that failed (transport error or undecodable payload)
pub const TASK_POLL_ERROR: &str = "task_poll_error";
/// Executions whose task logic reported an error
pub const TASK_EXECUTE_ERROR: &str = "task_execute_error";
/// Executions that produced nothing to submit
pub const TASK_EXECUTE_NO_RESULT: &str = "task_execute_no_result";
/// Result submissions that failed (serialization or transport)
pub const TASK_UPDATE_ERROR: &str = "task_update_error";
/// Poll round-trip latency, milliseconds
pub const TASK_POLL_TIME: &str = "task_poll_time";
/// Task execution latency, milliseconds
pub const TASK_EXECUTE_TIME: &str = "task_execute_time";
/// Result submission latency, milliseconds
pub const TASK_UPDATE_TIME: &str = "task_update_time";
/// Serialized result payload size, bytes
pub const TASK_RESULT_PAYLOAD_SIZE: &str = "task_result_payload_size";

type Key = (&'static str, String);

/// Aggregated observations for one timer/gauge series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerStats {
    pub count: u64,
    pub total: f64,
    pub max: f64,
    pub last: f64,
}

/// Thread-safe registry of counters and timers, keyed by metric name and
/// task type.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: Mutex<HashMap<Key, u64>>,
    timers: Mutex<HashMap<Key, TimerStats>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the named counter for the given task type.
    pub fn increment(&self, name: &'static str, task_type: &str) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry((name, task_type.to_string())).or_insert(0) += 1;
    }

    /// Records one observation (latency in milliseconds, payload bytes, ...)
    /// for the named timer series.
    pub fn observe(&self, name: &'static str, task_type: &str, value: f64) {
        let mut timers = self.timers.lock().unwrap();
        let stats = timers.entry((name, task_type.to_string())).or_default();
        stats.count += 1;
        stats.total += value;
        stats.last = value;
        if value > stats.max {
            stats.max = value;
        }
    }

    /// Records a duration observation in milliseconds.
    pub fn observe_duration(&self, name: &'static str, task_type: &str, elapsed: Duration) {
        self.observe(name, task_type, elapsed.as_secs_f64() * 1000.0);
    }

    /// Current value of a counter; zero if never incremented.
    pub fn counter(&self, name: &'static str, task_type: &str) -> u64 {
        let counters = self.counters.lock().unwrap();
        counters
            .get(&(name, task_type.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Aggregated stats for a timer series, if any observation was recorded.
    pub fn timer(&self, name: &'static str, task_type: &str) -> Option<TimerStats> {
        let timers = self.timers.lock().unwrap();
        timers.get(&(name, task_type.to_string())).copied()
    }

    /// Snapshot of every counter, for export or inspection.
    pub fn counters(&self) -> HashMap<(String, String), u64> {
        let counters = self.counters.lock().unwrap();
        counters
            .iter()
            .map(|((name, task_type), value)| ((name.to_string(), task_type.clone()), *value))
            .collect()
    }

    /// Snapshot of every timer series, for export or inspection.
    pub fn timers(&self) -> HashMap<(String, String), TimerStats> {
        let timers = self.timers.lock().unwrap();
        timers
            .iter()
            .map(|((name, task_type), stats)| ((name.to_string(), task_type.clone()), *stats))
            .collect()
    }
}
