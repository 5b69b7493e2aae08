//! Conveyor Core
//!
//! Core types for the Conveyor task-queue worker SDK.
//!
//! This crate contains:
//! - Domain types: `Task`, `TaskResult`, `TaskStatus`, `TaskLog`
//! - Their wire (de)serialization for the queue service API

pub mod domain;

pub use domain::task::Task;
pub use domain::task_result::{TaskLog, TaskResult, TaskStatus};
